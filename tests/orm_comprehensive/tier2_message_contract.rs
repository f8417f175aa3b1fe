//! Tier 2: Facade message contract
//!
//! Facade calls translate into a fixed set of messages on the wire.

use crate::test_utils::*;
use serde_json::json;
use strata_orm::*;

#[test]
fn test_delete_emits_single_delete_message() {
    let schema = library();
    let mut session = Session::with_default_state(schema);
    let author = session.class("Author").unwrap();
    let seven = author
        .create(&mut session, record! { "id" => 7, "name" => "x" })
        .unwrap();
    let from = session.messages().len();

    seven.delete(&mut session).unwrap();

    assert_eq!(
        wire(&session.messages()[from..]),
        vec![("Author".to_string(), json!({"type": "DELETE", "payload": [7]}))]
    );
}

#[test]
fn test_update_emits_single_update_message() {
    let schema = library();
    let mut session = Session::with_default_state(schema);
    let author = session.class("Author").unwrap();
    let a = author.create(&mut session, record! { "name" => "Tommi" }).unwrap();
    let from = session.messages().len();

    a.update(&mut session, record! { "name" => "Matt" }).unwrap();

    assert_eq!(
        wire(&session.messages()[from..]),
        vec![(
            "Author".to_string(),
            json!({"type": "UPDATE", "payload": {"idArr": [0], "mergeObj": {"name": "Matt"}}})
        )]
    );
}

#[test]
fn test_relation_diff_removes_then_adds() {
    let schema = library();
    let state = seeded(&schema, 0, 5);
    let mut session = Session::new(schema, state);
    let book = session.class("Book").unwrap();
    let dune = book
        .create(&mut session, record! { "title" => "Dune", "tags" => [1, 2, 3] })
        .unwrap();
    let from = session.messages().len();

    dune.update(&mut session, record! { "tags" => [3, 4] }).unwrap();

    let sent = wire(&session.messages()[from..]);
    assert_eq!(sent.len(), 2);
    let (entity, delete) = &sent[0];
    assert_eq!(entity, "BookTags");
    assert_eq!(delete["type"], json!("DELETE"));
    let removed_rows: Vec<Id> = serde_json::from_value(delete["payload"].clone()).unwrap();
    assert_eq!(removed_rows.len(), 2);

    let (entity, create) = &sent[1];
    assert_eq!(entity, "BookTags");
    assert_eq!(create["type"], json!("CREATE"));
    assert_eq!(create["payload"]["fromBookId"], json!(0));
    assert_eq!(create["payload"]["toTagId"], json!(4));

    // The relation key never reaches an UPDATE
    assert!(sent.iter().all(|(_, m)| m["type"] != json!("UPDATE")));
}

#[test]
fn test_empty_plain_update_sends_nothing() {
    let schema = library();
    let state = seeded(&schema, 0, 2);
    let mut session = Session::new(schema, state);
    let book = session.class("Book").unwrap();
    let dune = book
        .create(&mut session, record! { "title" => "Dune", "tags" => [0] })
        .unwrap();
    let from = session.messages().len();

    dune.update(&mut session, record! { "tags" => [0] }).unwrap();
    assert!(session.messages()[from..].is_empty());
}

#[test]
fn test_equality_is_class_and_id() {
    let schema = library();
    let state = seeded(&schema, 1, 1);
    let mut session = Session::new(schema, state);
    let author = session.class("Author").unwrap();
    let tag = session.class("Tag").unwrap();

    let before = author.with_id(&session, Id::new(0)).unwrap();
    before.set(&mut session, "name", "renamed").unwrap();
    let after = author.with_id(&session, Id::new(0)).unwrap();
    assert_eq!(before, after);
    assert_ne!(before.fields(), after.fields());

    let tag0 = tag.with_id(&session, Id::new(0)).unwrap();
    assert_ne!(before, tag0);
}

#[test]
fn test_display_lists_attributes_in_order() {
    let schema = library();
    let mut session = Session::with_default_state(schema);
    let author = session.class("Author").unwrap();
    let a = author
        .create(&mut session, record! { "name" => "Tommi", "born" => 1980 })
        .unwrap();
    assert_eq!(a.to_string(), "Author: {id: 0, name: Tommi, born: 1980}");
}

#[test]
fn test_class_from_another_schema_is_not_connected() {
    let schema = library();
    let session = Session::with_default_state(schema);
    let stranger = library().class("Book").unwrap();
    let err = stranger.access_list(&session).unwrap_err();
    assert!(err.is_not_connected());
}
