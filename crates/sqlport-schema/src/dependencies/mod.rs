//! Dependencies between schema objects
//!
//! Used to order view definitions so a view is created after the views it
//! selects from.

mod analyzer;

#[cfg(test)]
mod tests;

pub use analyzer::{DependencyGraph, extract_table_references, order_by_dependencies};
