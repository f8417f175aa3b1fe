//! Entity facades
//!
//! [`ModelClass`] is the class-level handle of an entity: lookups, creation
//! and raw message dispatch. [`Model`] addresses one record: reads, merges,
//! relation traversal and deletion.
//!
//! Neither holds a session. Every operation takes the session explicitly
//! and first checks that the class belongs to the session's schema, failing
//! with `NotConnected` otherwise.
//!
//! # Access tracking
//!
//! Every read through a facade marks the entity accessed on the session,
//! even when nothing is found. Memoized selectors depend on this to know
//! which tables a derivation read.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use strata_orm_core::{Id, Message, OrmError, OrmResult, Record, Value, ID_FIELD};
use strata_orm_storage::Table;

use crate::relation::RelationAccessor;
use crate::schema::{EntityDef, FieldDescriptor};
use crate::session::Session;

/// Class-level handle of one registered entity.
///
/// Two classes are equal only if they come from the same schema
/// registration; equal names are not enough.
#[derive(Debug, Clone)]
pub struct ModelClass {
    def: Arc<EntityDef>,
}

impl ModelClass {
    pub(crate) fn from_def(def: Arc<EntityDef>) -> Self {
        ModelClass { def }
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Entity declaration.
    pub fn def(&self) -> &Arc<EntityDef> {
        &self.def
    }

    /// Check that this class can be used with `session`.
    ///
    /// Idempotent; every other operation performs the same check.
    pub fn connect(&self, session: &Session) -> OrmResult<()> {
        session.bind(self)
    }

    /// The entity's table in the session's current state.
    pub fn get_table(&self, session: &Session) -> OrmResult<Arc<Table>> {
        self.connect(session)?;
        Ok(session.get_table_state(self.name()))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Raw record by id.
    pub fn access_id(&self, session: &Session, id: Id) -> OrmResult<Option<Arc<Record>>> {
        let table = self.read(session)?;
        Ok(table.get_by_id(id).cloned())
    }

    /// Raw records for the ids that exist, in the order given.
    pub fn access_ids(&self, session: &Session, ids: &[Id]) -> OrmResult<Vec<Arc<Record>>> {
        let table = self.read(session)?;
        Ok(ids
            .iter()
            .filter_map(|id| table.get_by_id(*id).cloned())
            .collect())
    }

    /// All raw records, ascending by id.
    pub fn access_list(&self, session: &Session) -> OrmResult<Vec<Arc<Record>>> {
        let table = self.read(session)?;
        Ok(table.records().cloned().collect())
    }

    /// Check if a record exists.
    pub fn has_id(&self, session: &Session, id: Id) -> OrmResult<bool> {
        let table = self.read(session)?;
        Ok(table.contains(id))
    }

    /// Number of records.
    pub fn count(&self, session: &Session) -> OrmResult<usize> {
        let table = self.read(session)?;
        Ok(table.len())
    }

    /// Facade for an existing record.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record has this id.
    pub fn with_id(&self, session: &Session, id: Id) -> OrmResult<Model> {
        self.access_id(session, id)?
            .map(|record| self.instance(id, record))
            .ok_or_else(|| OrmError::not_found(self.name(), id))
    }

    /// Facades for every record, ascending by id.
    pub fn all(&self, session: &Session) -> OrmResult<Vec<Model>> {
        let table = self.read(session)?;
        Ok(table
            .records()
            .filter_map(|record| record.id().map(|id| self.instance(id, record.clone())))
            .collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Send a message to this entity's table.
    pub fn add_update(&self, session: &mut Session, message: Message) -> OrmResult<()> {
        self.connect(session)?;
        session.add_update(self.name(), message)
    }

    /// Create a record.
    ///
    /// Many-to-many fields in `props` take an array of target ids and are
    /// added as relations after the record itself is created. The record
    /// receives the table's next id unless `props` carries one.
    pub fn create(&self, session: &mut Session, props: Record) -> OrmResult<Model> {
        self.connect(session)?;

        let mut attrs = Record::new();
        let mut relations = Vec::new();
        for (key, value) in props {
            if self.def.is_many_to_many(&key) {
                let ids = Id::list_from_value(&value).ok_or_else(|| {
                    OrmError::invalid_record(
                        self.name(),
                        format!("{} must be an array of ids", key),
                    )
                })?;
                relations.push((key, ids));
            } else {
                attrs.insert(key, value);
            }
        }

        let id = match attrs.get(ID_FIELD) {
            Some(value) => Id::from_value(value).ok_or_else(|| {
                OrmError::invalid_record(
                    self.name(),
                    format!("id must be an unsigned integer, got {}", value),
                )
            })?,
            None => {
                let id = session.table(self.name()).allocate_id()?;
                attrs = attrs.with_id(id);
                id
            }
        };

        session.add_update(self.name(), Message::create(attrs))?;

        let model = self.stored(session, id)?;
        for (field, ids) in relations {
            model.relation(session, &field)?.add(session, &ids)?;
        }
        Ok(model)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Connect, mark accessed, and return the table.
    fn read(&self, session: &Session) -> OrmResult<Arc<Table>> {
        self.connect(session)?;
        session.mark_accessed(self.name());
        Ok(session.table(self.name()))
    }

    /// Facade for a record just written, without marking a read.
    fn stored(&self, session: &Session, id: Id) -> OrmResult<Model> {
        session
            .table(self.name())
            .get_by_id(id)
            .cloned()
            .map(|record| self.instance(id, record))
            .ok_or_else(|| OrmError::not_found(self.name(), id))
    }

    pub(crate) fn instance(&self, id: Id, record: Arc<Record>) -> Model {
        Model {
            id,
            class: self.clone(),
            fields: record,
        }
    }

    fn descriptor(&self, field: &str) -> OrmResult<&FieldDescriptor> {
        self.def
            .descriptor(field)
            .ok_or_else(|| OrmError::unknown_field(self.name(), field))
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

impl Eq for ModelClass {}

/// Facade for one record.
///
/// Carries the attributes as they were when the facade was produced. Use
/// [`Model::record`] for the record in a session's current state.
#[derive(Debug, Clone)]
pub struct Model {
    id: Id,
    class: ModelClass,
    fields: Arc<Record>,
}

impl Model {
    /// Record id.
    pub fn get_id(&self) -> Id {
        self.id
    }

    /// Class of this record.
    pub fn get_class(&self) -> &ModelClass {
        &self.class
    }

    /// Attributes captured when this facade was produced.
    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Current record in the session's state (`None` once deleted).
    pub fn record(&self, session: &Session) -> OrmResult<Option<Arc<Record>>> {
        self.class.access_id(session, self.id)
    }

    /// Merge attributes into this record.
    ///
    /// Many-to-many fields take the complete target id list: ids no longer
    /// present are removed from the relation, then new ones are added. The
    /// remaining attributes are sent as one UPDATE, or not at all if none
    /// remain.
    pub fn update(&self, session: &mut Session, merge: Record) -> OrmResult<()> {
        self.class.connect(session)?;

        let mut attrs = Record::new();
        for (key, value) in merge {
            if !self.class.def.is_many_to_many(&key) {
                attrs.insert(key, value);
                continue;
            }
            let target = Id::list_from_value(&value).ok_or_else(|| {
                OrmError::invalid_record(
                    self.class.name(),
                    format!("{} must be an array of ids", key),
                )
            })?;
            let accessor = self.relation(session, &key)?;
            let current: BTreeSet<Id> = accessor.ids().iter().copied().collect();
            let wanted: BTreeSet<Id> = target.iter().copied().collect();

            let to_remove: Vec<Id> = accessor
                .ids()
                .iter()
                .copied()
                .filter(|id| !wanted.contains(id))
                .collect();
            let mut seen = BTreeSet::new();
            let to_add: Vec<Id> = target
                .into_iter()
                .filter(|id| !current.contains(id) && seen.insert(*id))
                .collect();

            if !to_remove.is_empty() {
                accessor.remove(session, &to_remove)?;
            }
            if !to_add.is_empty() {
                accessor.add(session, &to_add)?;
            }
        }

        if attrs.is_empty() {
            return Ok(());
        }
        session.add_update(self.class.name(), Message::update(vec![self.id], attrs))
    }

    /// Set one attribute. Same as `update` with a single entry.
    pub fn set(
        &self,
        session: &mut Session,
        attr: impl Into<String>,
        value: impl Into<Value>,
    ) -> OrmResult<()> {
        let mut merge = Record::new();
        merge.insert(attr, value);
        self.update(session, merge)
    }

    /// Delete this record (with cascades).
    pub fn delete(&self, session: &mut Session) -> OrmResult<()> {
        self.class
            .add_update(session, Message::delete(vec![self.id]))
    }

    /// Follow a foreign key to the referenced record.
    ///
    /// Returns `None` for a null reference or a dangling one.
    pub fn related(&self, session: &Session, field: &str) -> OrmResult<Option<Model>> {
        let target = match self.class.descriptor(field)? {
            FieldDescriptor::ForeignKey { to, .. } => session.class(to)?,
            FieldDescriptor::ManyToMany { .. } => {
                return Err(OrmError::unknown_field(self.class.name(), field))
            }
        };
        let reference = self
            .record(session)?
            .and_then(|record| record.reference(field));
        match reference {
            Some(id) => Ok(target
                .access_id(session, id)?
                .map(|record| target.instance(id, record))),
            None => Ok(None),
        }
    }

    /// Accessor for a many-to-many field.
    pub fn relation(&self, session: &Session, field: &str) -> OrmResult<RelationAccessor> {
        self.class.connect(session)?;
        let junction = session
            .schema()
            .junction(self.class.name(), field)
            .cloned()
            .ok_or_else(|| OrmError::unknown_field(self.class.name(), field))?;
        Ok(RelationAccessor::load(session, junction, self.id))
    }

    /// Records of `entity` whose foreign key `field` points at this record.
    pub fn referencing(&self, session: &Session, entity: &str, field: &str) -> OrmResult<Vec<Model>> {
        self.class.connect(session)?;
        let source = session.class(entity)?;
        match source.descriptor(field)? {
            FieldDescriptor::ForeignKey { to, .. } if to == self.class.name() => {}
            _ => return Err(OrmError::unknown_field(entity, field)),
        }
        let table = source.read(session)?;
        Ok(table
            .ids_referencing(field, self.id)
            .into_iter()
            .filter_map(|id| {
                table
                    .get_by_id(id)
                    .map(|record| source.instance(id, record.clone()))
            })
            .collect())
    }
}

/// Same class and same id. Attribute snapshots are not compared.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.id == other.id
    }
}

impl Eq for Model {}

/// Renders as `Book: {id: 0, title: Dune}`.
impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class.name(), self.fields)
    }
}
