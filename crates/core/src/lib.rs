//! Report dispatch domain logic.
//!
//! Everything the dispatcher needs that does not talk SMTP:
//!
//! - [`config`] — the explicit [`DispatchConfig`] built from the environment.
//! - [`report`] — runs the external report-generation script.
//! - [`archive`] — locates today's archive parts and applies the freshness
//!   and size guards.
//! - [`naming`] — part-label extraction from archive file names.
//! - [`outcome`] — per-archive terminal states and the run summary.

pub mod archive;
pub mod config;
pub mod error;
pub mod naming;
pub mod outcome;
pub mod report;

pub use archive::{ArchiveRef, LocateError};
pub use config::DispatchConfig;
pub use error::ConfigError;
pub use outcome::{ArchiveOutcome, RunSummary};
pub use report::{ReportError, ReportOutput, ReportScript};
