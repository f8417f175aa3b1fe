//! Tier 1: Immutability and structural sharing
//!
//! Writes never change the state they start from, and tables a write does
//! not touch are carried over as the same object.

use crate::test_utils::*;
use strata_orm::*;

#[test]
fn test_write_leaves_prior_state_untouched() {
    let schema = library();
    let s0 = seeded(&schema, 2, 2);
    let snapshot = s0.clone();

    let s1 = mutate(&schema, &s0, |session| {
        let book = session.class("Book")?;
        book.with_id(session, Id::new(0))?.set(session, "title", "changed")
    });

    assert_eq!(s0, snapshot);
    assert_ne!(s0, s1);
    let title = |s: &StoreState| {
        s.table("Book").unwrap().get_by_id(Id::new(0)).unwrap().get("title").cloned()
    };
    assert_eq!(title(&s0), Some(serde_json::json!("book-0")));
    assert_eq!(title(&s1), Some(serde_json::json!("changed")));
}

#[test]
fn test_untouched_tables_keep_identity() {
    let schema = library();
    let s0 = seeded(&schema, 2, 2);
    let s1 = mutate(&schema, &s0, |session| {
        session.class("Tag")?.create(session, record! { "label" => "new" })?;
        Ok(())
    });

    assert!(!s0.same_table(&s1, "Tag"));
    for entity in ["Author", "Book", "BookTags"] {
        assert!(s0.same_table(&s1, entity), "{} was rebuilt", entity);
    }
}

#[test]
fn test_untouched_records_keep_identity() {
    let schema = library();
    let s0 = seeded(&schema, 3, 0);
    let s1 = mutate(&schema, &s0, |session| {
        let book = session.class("Book")?;
        book.with_id(session, Id::new(1))?.set(session, "title", "x")
    });

    let before = s0.table("Book").unwrap();
    let after = s1.table("Book").unwrap();
    assert!(std::sync::Arc::ptr_eq(
        before.get_by_id(Id::new(0)).unwrap(),
        after.get_by_id(Id::new(0)).unwrap()
    ));
    assert!(!std::sync::Arc::ptr_eq(
        before.get_by_id(Id::new(1)).unwrap(),
        after.get_by_id(Id::new(1)).unwrap()
    ));
}

#[test]
fn test_reads_never_write() {
    let schema = library();
    let s0 = seeded(&schema, 2, 2);
    let session = Session::new(schema.clone(), s0.clone());
    let book = session.class("Book").unwrap();
    for model in book.all(&session).unwrap() {
        let _ = model.related(&session, "authorId").unwrap();
        let _ = model.relation(&session, "tags").unwrap();
    }
    assert!(session.messages().is_empty());
    let after = session.into_state();
    for entity in ["Author", "Book", "BookTags", "Tag"] {
        assert!(s0.same_table(&after, entity));
    }
}
