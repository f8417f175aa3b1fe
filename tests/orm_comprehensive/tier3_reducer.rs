//! Tier 3: Reducer behaviour

use crate::test_utils::*;
use serde_json::json;
use strata_orm::*;

fn crud_schema() -> std::sync::Arc<Schema> {
    Schema::builder()
        .register(EntityDef::new("Author"))
        .register(
            EntityDef::new("Book")
                .field("authorId", FieldDescriptor::required_foreign_key("Author"))
                .handler(handler_fn(
                    |_: &Table, message: &Message, class: &ModelClass, session: &mut Session| {
                        // Built-in messages dispatched at the top level target books
                        if message.is_builtin() {
                            class.add_update(session, message.clone())?;
                        }
                        Ok(())
                    },
                )),
        )
        .build()
        .expect("schema")
}

#[test]
fn test_create_then_delete_round_trips() {
    let reducer = make_reducer(crud_schema());
    let s0 = reducer.schema().default_state();

    let s1 = reducer
        .reduce(Some(&s0), &Message::create(record! { "title" => "Dune" }))
        .unwrap();
    assert_eq!(s1.table("Book").unwrap().len(), 1);

    let s2 = reducer
        .reduce(Some(&s1), &Message::delete(vec![Id::new(0)]))
        .unwrap();
    assert_eq!(s2, s0);
    assert_eq!(s2.table("Book"), s0.table("Book"));
}

#[test]
fn test_wire_messages_reduce() {
    let reducer = make_reducer(crud_schema());
    let create: Message =
        serde_json::from_value(json!({"type": "CREATE", "payload": {"title": "Dune"}})).unwrap();
    let update: Message = serde_json::from_value(json!({
        "type": "UPDATE",
        "payload": {"idArr": [0], "mergeObj": {"title": "Dune Messiah"}}
    }))
    .unwrap();

    let s1 = reducer.reduce(None, &create).unwrap();
    let s2 = reducer.reduce(Some(&s1), &update).unwrap();
    let book = s2.table("Book").unwrap().get_by_id(Id::new(0)).unwrap().clone();
    assert_eq!(book.get("title"), Some(&json!("Dune Messiah")));
}

#[test]
fn test_update_of_missing_id_fails() {
    let reducer = make_reducer(crud_schema());
    let err = reducer
        .reduce(None, &Message::update(vec![Id::new(3)], record! { "title" => "x" }))
        .unwrap_err();
    assert!(err.source.is_not_found());
    assert_eq!(err.state, reducer.schema().default_state());
}

#[test]
fn test_duplicate_create_fails() {
    let reducer = make_reducer(crud_schema());
    let s1 = reducer
        .reduce(None, &Message::create(record! { "id" => 1, "title" => "a" }))
        .unwrap();
    let err = reducer
        .reduce(Some(&s1), &Message::create(record! { "id" => 1, "title" => "b" }))
        .unwrap_err();
    assert!(err.source.is_duplicate_id());
}

#[test]
fn test_custom_message_is_ignored() {
    let reducer = make_reducer(crud_schema());
    let s0 = reducer.schema().default_state();
    let s1 = reducer
        .reduce(Some(&s0), &Message::custom("UNKNOWN", json!({"any": "thing"})))
        .unwrap();
    assert!(s0.same_table(&s1, "Book"));
    assert!(s0.same_table(&s1, "Author"));
}

#[test]
fn test_earlier_messages_survive_a_later_failure() {
    let schema = library();
    let reducer = Reducer::with_updater(schema, |session, _| {
        let tag = session.class("Tag")?;
        tag.create(session, record! { "label" => "kept" })?;
        tag.with_id(session, Id::new(42))?.delete(session)
    });
    let err = reducer.reduce(None, &Message::custom("GO", Value::Null)).unwrap_err();
    assert!(err.source.is_not_found());
    assert_eq!(err.state.table("Tag").unwrap().len(), 1);
}

#[test]
fn test_optional_fk_is_nulled_on_delete() {
    let schema = library();
    let s0 = seeded(&schema, 2, 0);
    let s1 = mutate(&schema, &s0, |session| {
        session.class("Author")?.with_id(session, Id::new(0))?.delete(session)
    });
    let book = s1.table("Book").unwrap().get_by_id(Id::new(0)).unwrap().clone();
    assert_eq!(book.get("authorId"), Some(&json!(null)));
    assert_eq!(s1.table("Book").unwrap().len(), 2);
}
