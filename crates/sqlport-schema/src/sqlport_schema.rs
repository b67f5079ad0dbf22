//! Schema introspection and caching for sqlport
//!
//! [`SchemaIntrospector`] turns the catalog queries a dialect renders into the
//! metadata model of `sqlport-core`. [`SchemaCache`] holds snapshots between
//! calls until the caller invalidates them, and [`dependencies`] orders view
//! definitions for dumps.

mod cache;
pub mod dependencies;
mod introspector;

pub use cache::{CacheKey, SchemaCache};
pub use dependencies::{DependencyGraph, extract_table_references, order_by_dependencies};
pub use introspector::SchemaIntrospector;
