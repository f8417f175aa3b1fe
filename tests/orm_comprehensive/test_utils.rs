//! Shared fixtures for the comprehensive suite.

use std::sync::Arc;

use serde_json::Value as Json;
use strata_orm::*;

/// Library schema: authors, books (optional author, many-to-many tags), tags.
pub fn library() -> Arc<Schema> {
    Schema::builder()
        .register(EntityDef::new("Author"))
        .register(
            EntityDef::new("Book")
                .field("authorId", FieldDescriptor::foreign_key("Author"))
                .field("tags", FieldDescriptor::many_to_many("Tag")),
        )
        .register(EntityDef::new("Tag"))
        .build()
        .expect("library schema")
}

/// Run `f` in one session over `state` and return the resulting state.
pub fn mutate<F>(schema: &Arc<Schema>, state: &StoreState, f: F) -> StoreState
where
    F: FnOnce(&mut Session) -> OrmResult<()>,
{
    let mut session = Session::new(schema.clone(), state.clone());
    f(&mut session).expect("mutation");
    session.into_state()
}

/// State with `authors` authors, `tags` tags and one book per author.
pub fn seeded(schema: &Arc<Schema>, authors: u64, tags: u64) -> StoreState {
    mutate(schema, &schema.default_state(), |session| {
        let author = session.class("Author")?;
        let tag = session.class("Tag")?;
        let book = session.class("Book")?;
        for i in 0..tags {
            tag.create(session, record! { "label" => (format!("tag-{}", i)) })?;
        }
        for i in 0..authors {
            author.create(session, record! { "name" => (format!("author-{}", i)) })?;
            book.create(session, record! { "title" => (format!("book-{}", i)), "authorId" => i })?;
        }
        Ok(())
    })
}

/// Messages applied in a session, as wire JSON.
pub fn wire(messages: &[(String, Message)]) -> Vec<(String, Json)> {
    messages
        .iter()
        .map(|(entity, m)| (entity.clone(), serde_json::to_value(m).expect("encode")))
        .collect()
}

/// Install a test subscriber; output shows with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
