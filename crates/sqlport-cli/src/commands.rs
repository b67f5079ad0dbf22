//! Subcommand handlers

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use sqlport_core::{Connection, DumpSettings, ObjectRef};
use sqlport_driver_sqlite::SqliteConnection;
use sqlport_dump::{
    CancellationToken, DirectoryTarget, DumpRequest, DumpService, PickCandidate, PickList,
};
use sqlport_services::TableService;

use crate::output;

pub fn open_database(path: &str) -> Result<Arc<dyn Connection>> {
    let connection =
        SqliteConnection::open(path).with_context(|| format!("Failed to open database {path}"))?;
    Ok(Arc::new(connection))
}

/// Keeps the candidates whose names were given on the command line
#[derive(Debug, Clone)]
pub struct NamePickList {
    names: Vec<String>,
}

impl NamePickList {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    fn wants(&self, object: &ObjectRef) -> bool {
        self.names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&object.name))
    }
}

#[async_trait]
impl PickList for NamePickList {
    async fn choose(&self, candidates: Vec<PickCandidate>) -> Option<Vec<PickCandidate>> {
        let chosen: Vec<PickCandidate> = candidates
            .into_iter()
            .filter(|candidate| self.wants(&candidate.object))
            .collect();
        for name in &self.names {
            if !chosen.iter().any(|c| c.object.name.eq_ignore_ascii_case(name)) {
                tracing::warn!(object = %name, "no such object in schema");
            }
        }
        Some(chosen)
    }
}

pub struct DumpArgs {
    pub db: String,
    pub schema: String,
    pub tables: Vec<String>,
    pub with_data: bool,
    pub out: PathBuf,
}

/// Turn `--table` flags into a request and an optional pick list
pub fn dump_request(tables: Vec<String>) -> (DumpRequest, Option<NamePickList>) {
    match tables.len() {
        0 => (DumpRequest::Schema, None),
        1 => {
            let name = tables.into_iter().next().unwrap_or_default();
            (DumpRequest::Object(ObjectRef::table(name)), None)
        }
        _ => (DumpRequest::Schema, Some(NamePickList::new(tables))),
    }
}

pub async fn dump(args: DumpArgs, settings: DumpSettings, cancel: CancellationToken) -> Result<()> {
    let connection = open_database(&args.db)?;
    let service = DumpService::new(connection, settings);
    let target = DirectoryTarget::new(&args.out);
    let (request, pick_list) = dump_request(args.tables);

    let outcome = service
        .dump(
            &args.schema,
            request,
            args.with_data,
            pick_list.as_ref().map(|p| p as &dyn PickList),
            &target,
            &cancel,
        )
        .await
        .context("Dump failed")?;

    match outcome {
        Some(outcome) => {
            println!("{}", output::render_dump_outcome(&outcome));
            if outcome.is_cancelled() {
                eprintln!("Dump cancelled; the file holds what was written so far");
            }
        }
        None => eprintln!("Nothing was dumped"),
    }
    Ok(())
}

pub async fn source(db: &str, schema: &str, table: &str) -> Result<()> {
    let connection = open_database(db)?;
    let source = TableService::default()
        .show_source(connection, schema, table)
        .await?;
    println!("{source}");
    Ok(())
}

pub async fn page(db: &str, schema: &str, table: &str, limit: u64) -> Result<()> {
    let connection = open_database(db)?;
    let page = TableService::new(limit)
        .open_table(connection, schema, table)
        .await?;
    tracing::debug!(sql = %page.sql, rows = page.result.row_count(), "page loaded");
    println!("{}", output::render_query_result(&page.result));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TemplateKind {
    Insert,
    Update,
    Delete,
}

pub async fn template(db: &str, schema: &str, table: &str, kind: TemplateKind) -> Result<()> {
    let connection = open_database(db)?;
    let service = TableService::default();
    let sql = match kind {
        TemplateKind::Insert => service.insert_template(connection, schema, table).await?,
        TemplateKind::Update => service.update_template(connection, schema, table).await?,
        TemplateKind::Delete => service.delete_template(connection, schema, table).await?,
    };
    println!("{sql}");
    Ok(())
}
