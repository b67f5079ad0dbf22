//! Schema and data dumps for sqlport
//!
//! A dump resolves a [`DumpSelection`] through the [`ObjectSelector`], then the
//! [`DumpOrchestrator`] writes DDL and data for it into an [`OutputSink`] as one
//! script that can be replayed against the same dialect.

mod data_writer;
mod error;
mod naming;
mod orchestrator;
mod report;
mod selection;
mod selector;
mod service;
mod sink;

pub use data_writer::DataStreamWriter;
pub use error::DumpError;
pub use naming::{default_dump_file_name, dump_file_name_at};
pub use orchestrator::DumpOrchestrator;
pub use report::{DataWriteSummary, DumpOutcome, DumpReport, ObjectFailure};
pub use selection::{DumpSelection, DumpTarget};
pub use selector::{DumpRequest, ObjectSelector, PickCandidate, PickList};
pub use service::DumpService;
pub use sink::{DirectoryTarget, FileSink, MemorySink, MemoryTarget, OutputSink, SaveTarget};

pub use tokio_util::sync::CancellationToken;
