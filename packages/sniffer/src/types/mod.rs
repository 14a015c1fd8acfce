//! Core data types: records, use-case configuration, request shapes.

pub mod record;
pub mod request;
pub mod usecase;

pub use record::Record;
pub use request::{SniffOutcome, SniffRequest};
pub use usecase::{SchemaRef, UseCaseConfig, UseCaseStore, DEFAULT_USE_CASE};
