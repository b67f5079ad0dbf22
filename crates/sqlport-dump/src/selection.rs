//! What to dump and where it comes from

use std::fmt;
use uuid::Uuid;

use sqlport_core::{Connection, DialectId, DialectProvider, ObjectKind, ObjectRef};
use sqlport_dialects::get_dialect;

use crate::DumpError;

/// The connection and schema a dump reads from.
///
/// The dialect provider is resolved once, when the target is built.
#[derive(Clone)]
pub struct DumpTarget {
    connection_id: Uuid,
    schema: String,
    dialect: DialectId,
    provider: &'static dyn DialectProvider,
}

impl DumpTarget {
    pub fn new(connection_id: Uuid, schema: impl Into<String>, dialect: DialectId) -> Self {
        Self {
            connection_id,
            schema: schema.into(),
            dialect,
            provider: get_dialect(dialect),
        }
    }

    /// Target for a live connection, with the dialect taken from its driver name
    pub fn for_connection(
        connection: &dyn Connection,
        schema: impl Into<String>,
    ) -> Result<Self, DumpError> {
        let dialect = DialectId::from_driver_name(connection.driver_name()).ok_or_else(|| {
            DumpError::Configuration(format!(
                "no SQL dialect for driver '{}'",
                connection.driver_name()
            ))
        })?;
        Ok(Self::new(connection.connection_id(), schema, dialect))
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn dialect(&self) -> DialectId {
        self.dialect
    }

    pub fn provider(&self) -> &'static dyn DialectProvider {
        self.provider
    }
}

impl fmt::Debug for DumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumpTarget")
            .field("connection_id", &self.connection_id)
            .field("schema", &self.schema)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

/// Objects chosen for one dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSelection {
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub procedures: Vec<String>,
    pub functions: Vec<String>,
    pub triggers: Vec<String>,
    /// Dump every object of every enabled kind; the name lists are ignored
    pub whole_schema: bool,
    pub include_data: bool,
    /// Emit the dialect's schema preamble before any object
    pub create_schema: bool,
}

impl DumpSelection {
    pub fn whole_schema() -> Self {
        Self {
            whole_schema: true,
            create_schema: true,
            ..Default::default()
        }
    }

    /// A single object, dumped alone
    pub fn object(object: ObjectRef) -> Self {
        let mut selection = Self::default();
        selection.add(object);
        selection
    }

    pub fn from_objects(objects: impl IntoIterator<Item = ObjectRef>) -> Self {
        let mut selection = Self::default();
        for object in objects {
            selection.add(object);
        }
        selection
    }

    pub fn with_data(mut self, include_data: bool) -> Self {
        self.include_data = include_data;
        self
    }

    pub fn with_create_schema(mut self, create_schema: bool) -> Self {
        self.create_schema = create_schema;
        self
    }

    /// Add an object, ignoring names already selected for its kind
    pub fn add(&mut self, object: ObjectRef) {
        let names = self.names_mut(object.kind);
        if !names.contains(&object.name) {
            names.push(object.name);
        }
    }

    pub fn names(&self, kind: ObjectKind) -> &[String] {
        match kind {
            ObjectKind::Table => &self.tables,
            ObjectKind::View => &self.views,
            ObjectKind::Procedure => &self.procedures,
            ObjectKind::Function => &self.functions,
            ObjectKind::Trigger => &self.triggers,
        }
    }

    fn names_mut(&mut self, kind: ObjectKind) -> &mut Vec<String> {
        match kind {
            ObjectKind::Table => &mut self.tables,
            ObjectKind::View => &mut self.views,
            ObjectKind::Procedure => &mut self.procedures,
            ObjectKind::Function => &mut self.functions,
            ObjectKind::Trigger => &mut self.triggers,
        }
    }

    /// Number of explicitly named objects
    pub fn object_count(&self) -> usize {
        ObjectKind::ALL.iter().map(|kind| self.names(*kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        !self.whole_schema && self.object_count() == 0
    }
}
