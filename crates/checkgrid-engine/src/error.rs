//! Engine error types.
//!
//! Errors are stored in catalog and per-check state so they can be shown
//! later, which is why they are `Clone` and carry rendered messages
//! rather than source errors.

use thiserror::Error;

use crate::catalog::CatalogPart;
use crate::cache::FetchKind;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A catalog request failed. Shown as a page-level banner.
    #[error("failed to load {part}: {reason}")]
    Load { part: CatalogPart, reason: String },

    /// A single check's result or history request failed.
    #[error("failed to fetch {kind} for {check}: {reason}")]
    Fetch {
        check: String,
        kind: FetchKind,
        reason: String,
    },

    /// The run-kickoff request failed.
    #[error("failed to submit run for {check}: {reason}")]
    Submission { check: String, reason: String },

    #[error("unknown check: {0}")]
    UnknownCheck(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("invalid engine configuration: {0}")]
    Config(String),
}
