//! sqlport Services Layer
//!
//! Services sit between a front end (the CLI, an editor extension) and the
//! dialect, schema and dump crates. They resolve the dialect provider from the
//! connection's driver, run the rendered SQL, and keep the shared
//! [`SchemaCache`](sqlport_schema::SchemaCache) honest after schema changes.
//!
//! # Services
//!
//! - [`TableService`] - Opening tables, showing source, drop/truncate, DML templates
//! - [`TableDesignService`] - Table designer requests (columns, indexes, rename, comment)
//!
//! [`PrimaryKeyRegistry`] remembers the key column of tables that test-data
//! generation fills, so [`TableService::max_primary_key`] can continue after it.

mod error;
mod primary_key_registry;
mod table_design_service;
mod table_service;
mod view_models;

pub use error::{ServiceError, ServiceResult};
pub use primary_key_registry::PrimaryKeyRegistry;
pub use table_design_service::TableDesignService;
pub use table_service::TableService;
pub use view_models::{TableDesignData, TablePage};
