//! Entity registration and schema validation
//!
//! A [`Schema`] is the set of registered entities, built once and shared
//! (`Arc<Schema>`) by every session, reducer and selector. Building it
//! resolves everything that would otherwise be looked up per dispatch:
//! junction entities for many-to-many fields, the reverse foreign-key map
//! used by delete cascades, and each entity's update handler.
//!
//! # Junction entities
//!
//! Each many-to-many field `Book.tags → Tag` gets a hidden entity named
//! `BookTags` with two required foreign keys, `fromBookId` and `toTagId`,
//! one row per related pair. Both keys cascade, so deleting either side
//! prunes the junction rows through the ordinary cascade path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_orm_core::{OrmError, OrmResult, ID_FIELD};
use strata_orm_storage::{StoreState, Table};

use crate::handler::UpdateHandler;
use crate::model::ModelClass;

/// What happens to dependents when a referenced record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Delete the dependent records (and cascade further).
    Cascade,
    /// Null out the foreign key on the dependent records.
    SetNull,
    /// Refuse the delete with `CascadeRequired`.
    Restrict,
}

/// Relation field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    /// Attribute holding the id of one `to` record (or null).
    ForeignKey {
        /// Target entity.
        to: String,
        /// Whether the reference may be left null.
        required: bool,
        /// Explicit delete policy.
        on_delete: Option<OnDelete>,
    },
    /// Set of related `to` records, stored in a junction entity.
    ManyToMany {
        /// Target entity.
        to: String,
    },
}

impl FieldDescriptor {
    /// Optional foreign key (nulled out when the target is deleted).
    pub fn foreign_key(to: impl Into<String>) -> Self {
        FieldDescriptor::ForeignKey {
            to: to.into(),
            required: false,
            on_delete: None,
        }
    }

    /// Required foreign key (delete of the target needs a policy).
    pub fn required_foreign_key(to: impl Into<String>) -> Self {
        FieldDescriptor::ForeignKey {
            to: to.into(),
            required: true,
            on_delete: None,
        }
    }

    /// Many-to-many relation.
    pub fn many_to_many(to: impl Into<String>) -> Self {
        FieldDescriptor::ManyToMany { to: to.into() }
    }

    /// Set the delete policy of a foreign key. No effect on many-to-many.
    pub fn on_delete(self, policy: OnDelete) -> Self {
        match self {
            FieldDescriptor::ForeignKey { to, required, .. } => FieldDescriptor::ForeignKey {
                to,
                required,
                on_delete: Some(policy),
            },
            other => other,
        }
    }

    /// Target entity name.
    pub fn target(&self) -> &str {
        match self {
            FieldDescriptor::ForeignKey { to, .. } | FieldDescriptor::ManyToMany { to } => to,
        }
    }

    /// Check if this is a many-to-many field.
    pub fn is_many_to_many(&self) -> bool {
        matches!(self, FieldDescriptor::ManyToMany { .. })
    }

    /// Check if this is a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, FieldDescriptor::ForeignKey { .. })
    }
}

/// Declaration of one entity.
#[derive(Clone)]
pub struct EntityDef {
    name: String,
    fields: Vec<(String, FieldDescriptor)>,
    handler: Option<Arc<dyn UpdateHandler>>,
    junction: bool,
}

impl EntityDef {
    /// Declare an entity with no relation fields and no handler.
    pub fn new(name: impl Into<String>) -> Self {
        EntityDef {
            name: name.into(),
            fields: Vec::new(),
            handler: None,
            junction: false,
        }
    }

    /// Add a relation field.
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    /// Attach update logic, invoked by the default updater on every dispatch.
    pub fn handler<H: UpdateHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relation fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Descriptor of one relation field.
    pub fn descriptor(&self, field: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, d)| d)
    }

    /// Check if a field is a many-to-many relation.
    pub fn is_many_to_many(&self, field: &str) -> bool {
        self.descriptor(field)
            .map(FieldDescriptor::is_many_to_many)
            .unwrap_or(false)
    }

    /// Names of foreign-key fields (these are indexed).
    pub fn foreign_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, d)| d.is_foreign_key())
            .map(|(n, _)| n.as_str())
    }

    /// The entity's update handler, if it declared one.
    pub fn update_handler(&self) -> Option<&Arc<dyn UpdateHandler>> {
        self.handler.as_ref()
    }

    /// Check if this is a generated junction entity.
    pub fn is_junction(&self) -> bool {
        self.junction
    }
}

impl fmt::Debug for EntityDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("has_handler", &self.handler.is_some())
            .field("junction", &self.junction)
            .finish()
    }
}

/// Schema-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// First id handed out by auto-increment in every table.
    pub first_id: u64,
    /// Delete policy for required foreign keys that declare none.
    /// `None` makes such deletes fail with `CascadeRequired`.
    pub required_fk_policy: Option<OnDelete>,
}

impl SchemaOptions {
    /// Default options: ids start at 0, required foreign keys restrict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first auto-increment id.
    pub fn first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id;
        self
    }

    /// Set the fallback policy for required foreign keys.
    pub fn required_fk_policy(mut self, policy: OnDelete) -> Self {
        self.required_fk_policy = Some(policy);
        self
    }
}

/// A generated many-to-many junction entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Junction {
    /// Junction entity name, e.g. `BookTags`.
    pub name: String,
    /// Entity declaring the relation field.
    pub owner: String,
    /// Relation field name on the owner.
    pub field: String,
    /// Target entity.
    pub target: String,
    /// Junction column referencing the owner, e.g. `fromBookId`.
    pub from_field: String,
    /// Junction column referencing the target, e.g. `toTagId`.
    pub to_field: String,
}

/// A foreign key pointing at some entity, with its resolved delete policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dependent {
    pub(crate) entity: String,
    pub(crate) field: String,
    /// `None` means the delete must fail with `CascadeRequired`.
    pub(crate) policy: Option<OnDelete>,
}

/// The set of registered entities.
#[derive(Debug)]
pub struct Schema {
    entities: Vec<Arc<EntityDef>>,
    by_name: BTreeMap<String, usize>,
    junctions: BTreeMap<(String, String), Junction>,
    dependents: BTreeMap<String, Vec<Dependent>>,
    options: SchemaOptions,
}

impl Schema {
    /// Start registering entities.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// All entities (user entities in registration order, then junctions).
    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDef>> {
        self.entities.iter()
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&Arc<EntityDef>> {
        self.by_name.get(name).map(|i| &self.entities[*i])
    }

    /// Check if an entity is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The model class of a registered entity.
    pub fn class(&self, name: &str) -> OrmResult<ModelClass> {
        self.entity(name)
            .cloned()
            .map(ModelClass::from_def)
            .ok_or_else(|| OrmError::unknown_entity(name))
    }

    /// The junction behind `owner.field`.
    pub fn junction(&self, owner: &str, field: &str) -> Option<&Junction> {
        self.junctions.get(&(owner.to_string(), field.to_string()))
    }

    /// All junctions.
    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.values()
    }

    /// Schema options.
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Empty table for an entity, with its foreign keys indexed.
    ///
    /// Unregistered names get a plain empty table.
    pub fn empty_table(&self, name: &str) -> Table {
        let table = match self.entity(name) {
            Some(def) => Table::with_indices(name, def.foreign_keys()),
            None => Table::new(name),
        };
        table.starting_at(self.options.first_id)
    }

    /// Initial state: one empty table per registered entity.
    pub fn default_state(&self) -> StoreState {
        StoreState::from_tables(self.entities.iter().map(|def| self.empty_table(def.name())))
    }

    /// Foreign keys (on any entity) pointing at `target`.
    pub(crate) fn dependents(&self, target: &str) -> &[Dependent] {
        self.dependents
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Collects entity declarations and validates them into a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDef>,
    options: SchemaOptions,
}

impl SchemaBuilder {
    /// Register an entity.
    pub fn register(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Set schema options.
    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate declarations and build the schema.
    ///
    /// # Errors
    ///
    /// `OrmError::Schema` for empty or duplicate entity names, duplicate or
    /// reserved field names, relation targets that are not registered, and
    /// junction names that collide with another entity.
    pub fn build(self) -> OrmResult<Arc<Schema>> {
        let SchemaBuilder { entities, options } = self;

        let mut by_name = BTreeMap::new();
        for (i, def) in entities.iter().enumerate() {
            if def.name.is_empty() {
                return Err(OrmError::schema("entity name must not be empty"));
            }
            if by_name.insert(def.name.clone(), i).is_some() {
                return Err(OrmError::schema(format!(
                    "entity {} registered twice",
                    def.name
                )));
            }
        }

        let mut junctions = BTreeMap::new();
        let mut junction_defs = Vec::new();
        for def in &entities {
            for (i, (field, descriptor)) in def.fields.iter().enumerate() {
                if field == ID_FIELD {
                    return Err(OrmError::schema(format!(
                        "{}.{} is reserved for the record id",
                        def.name, field
                    )));
                }
                if def.fields[..i].iter().any(|(f, _)| f == field) {
                    return Err(OrmError::schema(format!(
                        "{}.{} declared twice",
                        def.name, field
                    )));
                }
                let target = descriptor.target();
                if !by_name.contains_key(target) {
                    return Err(OrmError::schema(format!(
                        "{}.{} references unknown entity {}",
                        def.name, field, target
                    )));
                }
                if descriptor.is_many_to_many() {
                    let junction = junction_for(&def.name, field, target);
                    if by_name.contains_key(&junction.name)
                        || junctions.values().any(|j: &Junction| j.name == junction.name)
                    {
                        return Err(OrmError::schema(format!(
                            "junction {} for {}.{} collides with another entity",
                            junction.name, def.name, field
                        )));
                    }
                    junction_defs.push(junction_entity(&junction));
                    junctions.insert((def.name.clone(), field.clone()), junction);
                }
            }
        }

        let mut all: Vec<Arc<EntityDef>> = entities.into_iter().map(Arc::new).collect();
        for def in junction_defs {
            by_name.insert(def.name.clone(), all.len());
            all.push(Arc::new(def));
        }

        let mut dependents: BTreeMap<String, Vec<Dependent>> = BTreeMap::new();
        for def in &all {
            for (field, descriptor) in &def.fields {
                if let FieldDescriptor::ForeignKey {
                    to,
                    required,
                    on_delete,
                } = descriptor
                {
                    let policy = if *required {
                        on_delete.or(options.required_fk_policy)
                    } else {
                        on_delete.or(Some(OnDelete::SetNull))
                    };
                    dependents.entry(to.clone()).or_default().push(Dependent {
                        entity: def.name.clone(),
                        field: field.clone(),
                        policy,
                    });
                }
            }
        }

        tracing::debug!(
            entities = all.len(),
            junctions = junctions.len(),
            "schema built"
        );

        Ok(Arc::new(Schema {
            entities: all,
            by_name,
            junctions,
            dependents,
            options,
        }))
    }
}

fn junction_for(owner: &str, field: &str, target: &str) -> Junction {
    Junction {
        name: format!("{}{}", owner, capitalize(field)),
        owner: owner.to_string(),
        field: field.to_string(),
        target: target.to_string(),
        from_field: format!("from{}Id", owner),
        to_field: format!("to{}Id", target),
    }
}

fn junction_entity(junction: &Junction) -> EntityDef {
    let mut def = EntityDef::new(junction.name.clone())
        .field(
            junction.from_field.clone(),
            FieldDescriptor::required_foreign_key(junction.owner.clone())
                .on_delete(OnDelete::Cascade),
        )
        .field(
            junction.to_field.clone(),
            FieldDescriptor::required_foreign_key(junction.target.clone())
                .on_delete(OnDelete::Cascade),
        );
    def.junction = true;
    def
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
