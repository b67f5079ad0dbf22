//! sqlport core - shared abstractions for dialect rendering and dumps
//!
//! This crate provides the fundamental traits and types that all other
//! sqlport crates depend on. It defines:
//!
//! - `Connection` - Trait for executing SQL against a database
//! - `DialectProvider` - Per-dialect rendering of `DialectOperation`s
//! - `QuoteStyle` / `LiteralStyle` - Identifier quoting and literal escaping
//! - Schema model types like `TableMeta`, `ColumnMeta`, `IndexMeta`
//! - `DumpSettings` - persisted user settings

mod connection;
mod dialect;
mod error;
mod escape;
mod operation;
mod schema;
pub mod settings;
mod types;

pub use connection::*;
pub use dialect::*;
pub use error::*;
pub use escape::*;
pub use operation::*;
pub use schema::*;
pub use settings::{DumpSettings, InsertStyle};
pub use types::*;
