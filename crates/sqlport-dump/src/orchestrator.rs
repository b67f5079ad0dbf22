//! Writes a replayable script for a dump selection

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use sqlport_core::{Connection, DialectProvider, DumpSettings, ObjectKind, ObjectRef};
use sqlport_schema::{SchemaCache, SchemaIntrospector, order_by_dependencies};

use crate::selector::{enabled_kinds, enumerate_objects};
use crate::{
    DataStreamWriter, DumpError, DumpOutcome, DumpReport, DumpSelection, DumpTarget, OutputSink,
};

const RULE: &str = "-- ----------------------------";

/// Drop line and `CREATE` text for one object, fetched before anything is written
struct PreparedObject {
    drop: Option<String>,
    source: String,
    /// Index statements replayed after a table's rows
    indexes: Vec<String>,
}

pub struct DumpOrchestrator {
    connection: Arc<dyn Connection>,
    settings: DumpSettings,
    cache: Option<Arc<SchemaCache>>,
}

impl DumpOrchestrator {
    pub fn new(connection: Arc<dyn Connection>, settings: DumpSettings) -> Self {
        Self {
            connection,
            settings,
            cache: None,
        }
    }

    /// Serve table metadata from a shared cache
    pub fn with_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Dump `selection` into `sink`.
    ///
    /// Sections are written as header, schema preamble, tables (each followed by
    /// its rows and any separately stored indexes), views in dependency order, procedures, functions, triggers and
    /// footer. Objects that fail are reported and skipped. Only output failures
    /// end the dump early with an error; cancellation ends it with
    /// [`DumpOutcome::Cancelled`] and no footer.
    #[tracing::instrument(skip_all, fields(schema = %target.schema(), dialect = %target.dialect()))]
    pub async fn dump(
        &self,
        target: &DumpTarget,
        selection: &DumpSelection,
        sink: &mut dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<DumpOutcome, DumpError> {
        let provider = target.provider();
        let introspector = SchemaIntrospector::new(self.connection.clone(), provider);
        let selection = self.expand(&introspector, target, selection).await?;
        let preamble = if selection.create_schema {
            provider
                .schema_preamble(target.schema())
                .map_err(|e| DumpError::from_core(target.schema(), e))?
        } else {
            Vec::new()
        };
        tracing::info!(
            objects = selection.object_count(),
            include_data = selection.include_data,
            "starting dump"
        );

        let mut script = ScriptWriter {
            introspector,
            provider,
            schema: target.schema(),
            script_schema: provider.script_schema(target.schema()),
            connection: self.connection.as_ref(),
            settings: &self.settings,
            cache: self.cache.as_deref(),
            include_data: selection.include_data,
            sink,
            cancel,
            report: DumpReport::default(),
        };

        script.header(&preamble).await?;
        for table in &selection.tables {
            if script.table(table).await? {
                return Ok(script.cancelled());
            }
        }
        if script.views(&selection.views).await? {
            return Ok(script.cancelled());
        }
        for (kind, names) in [
            (ObjectKind::Procedure, &selection.procedures),
            (ObjectKind::Function, &selection.functions),
            (ObjectKind::Trigger, &selection.triggers),
        ] {
            if script.routines(kind, names).await? {
                return Ok(script.cancelled());
            }
        }
        script.footer().await?;

        let report = script.report;
        tracing::info!(
            dumped = report.success_count(),
            failed = report.failures.len(),
            rows = report.rows_written,
            "dump finished"
        );
        Ok(DumpOutcome::Completed(report))
    }

    /// Replace a whole-schema selection with the objects it currently covers
    async fn expand(
        &self,
        introspector: &SchemaIntrospector,
        target: &DumpTarget,
        selection: &DumpSelection,
    ) -> Result<DumpSelection, DumpError> {
        if !selection.whole_schema {
            return Ok(selection.clone());
        }
        let kinds = enabled_kinds(&self.settings, &target.provider().capabilities());
        let objects = enumerate_objects(introspector, target.schema(), &kinds).await?;
        Ok(DumpSelection::from_objects(objects)
            .with_data(selection.include_data)
            .with_create_schema(selection.create_schema))
    }
}

struct ScriptWriter<'a> {
    introspector: SchemaIntrospector,
    provider: &'static dyn DialectProvider,
    schema: &'a str,
    /// Schema naming objects inside the script
    script_schema: &'a str,
    connection: &'a dyn Connection,
    settings: &'a DumpSettings,
    cache: Option<&'a SchemaCache>,
    include_data: bool,
    sink: &'a mut dyn OutputSink,
    cancel: &'a CancellationToken,
    report: DumpReport,
}

impl ScriptWriter<'_> {
    async fn write(&mut self, text: &str) -> Result<(), DumpError> {
        Ok(self.sink.write(text).await?)
    }

    async fn statements(&mut self, statements: &[String]) -> Result<(), DumpError> {
        if statements.is_empty() {
            return Ok(());
        }
        let mut text = String::new();
        for statement in statements {
            text.push_str(statement);
            text.push_str(";\n");
        }
        text.push('\n');
        self.write(&text).await
    }

    async fn header(&mut self, preamble: &[String]) -> Result<(), DumpError> {
        let comment = format!(
            "-- sqlport dump\n-- Dialect: {}\n-- Schema: {}\n\n",
            self.provider.id().name(),
            self.schema
        );
        self.write(&comment).await?;
        let header = self.provider.script_header();
        self.statements(&header).await?;
        self.statements(preamble).await
    }

    async fn footer(&mut self) -> Result<(), DumpError> {
        let footer = self.provider.script_footer();
        self.statements(&footer).await
    }

    fn cancelled(self) -> DumpOutcome {
        tracing::info!(dumped = self.report.success_count(), "dump cancelled");
        DumpOutcome::Cancelled(self.report)
    }

    async fn section(&mut self, title: &str, name: &str) -> Result<(), DumpError> {
        self.write(&format!("{RULE}\n-- {title} {name}\n{RULE}\n")).await
    }

    /// Leave a comment for a failed object and record it; fatal errors propagate
    async fn fail(&mut self, object: ObjectRef, error: DumpError) -> Result<(), DumpError> {
        if error.is_fatal() {
            return Err(error);
        }
        let reason = error.to_string().replace('\n', " ");
        self.write(&format!("-- {} {} failed: {reason}\n\n", title(object.kind), object.name))
            .await?;
        self.report.record_failure(object, error);
        Ok(())
    }

    fn drop_line(&self, kind: ObjectKind, name: &str) -> Result<Option<String>, DumpError> {
        if !self.settings.drop_before_create {
            return Ok(None);
        }
        match self.provider.drop_statement(kind, self.script_schema, name) {
            Ok(sql) => Ok(Some(sql)),
            Err(e) if e.is_unsupported() => {
                tracing::debug!(kind = %kind, name = %name, "no drop statement for this dialect");
                Ok(None)
            }
            Err(e) => Err(DumpError::from_core(name, e)),
        }
    }

    async fn prepare(&self, kind: ObjectKind, name: &str) -> Result<PreparedObject, DumpError> {
        let (source, indexes) = if kind == ObjectKind::Table {
            let source = self
                .introspector
                .table_source(self.schema, name, self.cache)
                .await
                .map_err(|e| DumpError::from_core(name, e))?;
            let indexes = self
                .introspector
                .index_sources(self.schema, name)
                .await
                .map_err(|e| DumpError::from_core(name, e))?;
            (source, indexes)
        } else {
            let source = self
                .introspector
                .object_source(kind, self.schema, name)
                .await
                .map_err(|e| DumpError::from_core(name, e))?;
            (source, Vec::new())
        };
        Ok(PreparedObject {
            drop: self.drop_line(kind, name)?,
            source,
            indexes,
        })
    }

    async fn object(
        &mut self,
        kind: ObjectKind,
        name: &str,
        prepared: &PreparedObject,
    ) -> Result<(), DumpError> {
        self.section(&format!("{} structure for", title(kind)), name)
            .await?;
        let mut text = String::new();
        if let Some(drop) = &prepared.drop {
            text.push_str(drop);
            text.push_str(";\n");
        }
        match self.provider.routine_delimiter() {
            Some(delimiter) if !matches!(kind, ObjectKind::Table | ObjectKind::View) => {
                text.push_str(&format!(
                    "DELIMITER {delimiter}\n{}\n{delimiter}\nDELIMITER ;\n\n",
                    prepared.source
                ));
            }
            _ => {
                text.push_str(&prepared.source);
                text.push_str(";\n\n");
            }
        }
        self.write(&text).await
    }

    /// Table DDL followed by its rows, then its stored indexes. Returns whether
    /// the dump was cancelled.
    async fn table(&mut self, name: &str) -> Result<bool, DumpError> {
        if self.cancel.is_cancelled() {
            return Ok(true);
        }
        let object = ObjectRef::table(name);
        let prepared = match self.prepare(ObjectKind::Table, name).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.fail(object, e).await?;
                return Ok(false);
            }
        };
        let snapshot = if self.include_data {
            match self
                .introspector
                .table_snapshot(self.schema, name, self.cache)
                .await
            {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    self.fail(object, DumpError::from_core(name, e)).await?;
                    return Ok(false);
                }
            }
        } else {
            None
        };

        self.object(ObjectKind::Table, name, &prepared).await?;

        if let Some(snapshot) = snapshot {
            let mut order_by: Vec<String> = snapshot
                .primary_key()
                .iter()
                .map(|c| c.name.clone())
                .collect();
            // Without a key or an implicit row id, pages follow whatever order the
            // engine returns; rows may repeat or go missing if it changes between reads.
            if order_by.is_empty() {
                order_by.extend(self.provider.implicit_row_order().map(str::to_string));
            }
            self.section("Records of", name).await?;
            let writer = DataStreamWriter::new(self.connection, self.provider, self.settings);
            let written = writer
                .write_table_data(
                    self.schema,
                    name,
                    &snapshot.columns,
                    &order_by,
                    &mut *self.sink,
                    self.cancel,
                )
                .await;
            match written {
                Ok(summary) => {
                    self.report.add_data(summary);
                    self.write("\n").await?;
                    if summary.cancelled {
                        return Ok(true);
                    }
                }
                Err(e) => {
                    self.fail(object, e).await?;
                    return Ok(false);
                }
            }
        }
        if !prepared.indexes.is_empty() {
            self.section("Indexes of", name).await?;
            self.statements(&prepared.indexes).await?;
        }
        self.report.record_success(object);
        Ok(false)
    }

    /// Views, each after the selected views it reads from
    async fn views(&mut self, names: &[String]) -> Result<bool, DumpError> {
        let mut prepared = HashMap::new();
        let mut definitions = Vec::new();
        for name in names {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }
            match self.prepare(ObjectKind::View, name).await {
                Ok(view) => {
                    definitions.push((name.clone(), view.source.clone()));
                    prepared.insert(name.clone(), view);
                }
                Err(e) => self.fail(ObjectRef::view(name.as_str()), e).await?,
            }
        }

        for name in order_by_dependencies(&definitions) {
            if let Some(view) = prepared.remove(&name) {
                self.object(ObjectKind::View, &name, &view).await?;
                self.report.record_success(ObjectRef::view(name));
            }
        }
        Ok(false)
    }

    async fn routines(&mut self, kind: ObjectKind, names: &[String]) -> Result<bool, DumpError> {
        for name in names {
            if self.cancel.is_cancelled() {
                return Ok(true);
            }
            let object = ObjectRef::new(kind, name.as_str());
            match self.prepare(kind, name).await {
                Ok(prepared) => {
                    self.object(kind, name, &prepared).await?;
                    self.report.record_success(object);
                }
                Err(e) => self.fail(object, e).await?,
            }
        }
        Ok(false)
    }
}

fn title(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Table => "Table",
        ObjectKind::View => "View",
        ObjectKind::Procedure => "Procedure",
        ObjectKind::Function => "Function",
        ObjectKind::Trigger => "Trigger",
    }
}
