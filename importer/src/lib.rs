//! CSV to InfluxDB importer. Field types are sampled from the first rows
//! and frozen for the whole file.

pub mod backend;
pub mod batch;
pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod infer;
pub mod pipeline;
pub mod reader;
pub mod retry;
pub mod timestamp;

pub use backend::{BatchWriter, InfluxBackend};
pub use config::{ImportConfig, InfluxConfig, RetryPolicy};
pub use convert::{FieldValue, Point};
pub use error::{ImportError, Result};
pub use pipeline::{ImportSummary, Importer};
