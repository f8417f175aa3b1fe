//! Tier 4: Memoized selector soundness
//!
//! A memoized selector must always return what its derivation would return
//! against the current state, while recomputing only when a table it read
//! was replaced.

use std::sync::Arc;

use crate::test_utils::*;
use proptest::prelude::*;
use strata_orm::*;

fn titles_by_author(session: &Session, author: &Id) -> OrmResult<Vec<String>> {
    let author = session.class("Author")?.with_id(session, *author)?;
    Ok(author
        .referencing(session, "Book", "authorId")?
        .iter()
        .filter_map(|b| b.fields().get("title").and_then(|t| t.as_str()).map(str::to_string))
        .collect())
}

#[test]
fn test_compute_count_follows_read_tables() {
    init_tracing();
    let schema = library();
    let selector = create_selector(schema.clone(), titles_by_author);
    let s0 = seeded(&schema, 2, 1);

    let r0 = selector.select(&s0, &Id::new(0)).unwrap();
    assert_eq!(*r0, vec!["book-0".to_string()]);
    assert_eq!(selector.recomputations(), 1);

    // Unrelated entity
    let s1 = mutate(&schema, &s0, |session| {
        session.class("Tag")?.create(session, record! { "label" => "new" })?;
        Ok(())
    });
    let r1 = selector.select(&s1, &Id::new(0)).unwrap();
    assert_eq!(selector.recomputations(), 1);
    assert!(Arc::ptr_eq(&r0, &r1));

    // Entity the selector read
    let s2 = mutate(&schema, &s1, |session| {
        session
            .class("Book")?
            .create(session, record! { "title" => "book-extra", "authorId" => 0 })?;
        Ok(())
    });
    let r2 = selector.select(&s2, &Id::new(0)).unwrap();
    assert_eq!(selector.recomputations(), 2);
    assert_eq!(*r2, vec!["book-0".to_string(), "book-extra".to_string()]);
}

#[derive(Debug, Clone)]
enum Op {
    AddTag,
    AddBook(u8),
    RenameBook(u8),
    DeleteAuthor(u8),
    AddAuthor,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::AddTag),
        (0u8..4).prop_map(Op::AddBook),
        (0u8..6).prop_map(Op::RenameBook),
        (0u8..4).prop_map(Op::DeleteAuthor),
        Just(Op::AddAuthor),
    ]
}

fn try_apply(session: &mut Session, op: &Op) -> OrmResult<()> {
    match op {
        Op::AddTag => {
            session.class("Tag")?.create(session, record! { "label" => "t" })?;
        }
        Op::AddBook(author) => {
            session.class("Book")?.create(
                session,
                record! { "title" => (format!("by-{}", author)), "authorId" => (*author) },
            )?;
        }
        Op::RenameBook(id) => {
            let book = session.class("Book")?.with_id(session, Id::new(*id as u64))?;
            book.set(session, "title", format!("renamed-{}", id))?;
        }
        Op::DeleteAuthor(id) => {
            let author = session.class("Author")?.with_id(session, Id::new(*id as u64))?;
            author.delete(session)?;
        }
        Op::AddAuthor => {
            session.class("Author")?.create(session, record! { "name" => "a" })?;
        }
    }
    Ok(())
}

/// Apply one op. Ops on missing ids fail and leave the state as it was.
fn apply(schema: &Arc<Schema>, state: &StoreState, op: &Op) -> StoreState {
    let mut session = Session::new(schema.clone(), state.clone());
    let _ = try_apply(&mut session, op);
    session.into_state()
}

proptest! {
    #[test]
    fn memoized_result_always_matches_direct_computation(
        ops in proptest::collection::vec(op(), 1..30),
        author in 0u64..3,
    ) {
        let schema = library();
        let selector = create_selector(schema.clone(), titles_by_author);
        let mut state = seeded(&schema, 3, 1);

        for op in &ops {
            state = apply(&schema, &state, op);

            let memoized = selector.select(&state, &Id::new(author));
            let direct = titles_by_author(&Session::new(schema.clone(), state.clone()), &Id::new(author));
            match (memoized, direct) {
                (Ok(m), Ok(d)) => prop_assert_eq!(&*m, &d),
                (Err(m), Err(d)) => prop_assert_eq!(m, d),
                (m, d) => prop_assert!(false, "diverged: {:?} vs {:?}", m, d),
            }
        }
    }

    #[test]
    fn tag_writes_never_trigger_recomputation(tags in 1usize..10) {
        let schema = library();
        let selector = create_selector(schema.clone(), titles_by_author);
        let mut state = seeded(&schema, 2, 0);
        selector.select(&state, &Id::new(1)).unwrap();

        for _ in 0..tags {
            state = apply(&schema, &state, &Op::AddTag);
            selector.select(&state, &Id::new(1)).unwrap();
        }
        prop_assert_eq!(selector.recomputations(), 1);
    }
}
