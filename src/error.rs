// src/error.rs
//! Per-task retrieval failures. These never abort a dispatch; the dispatcher
//! turns each one into a failed outcome tagged with its (component, source) pair.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("task exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },
    /// The catalog rendered its explicit "nothing found" page.
    #[error("notFound")]
    NoResults,
    #[error("catalog answered with HTTP {status}")]
    Status { status: u16 },
    #[error("request failed: {message}")]
    Http { message: String },
    #[error("listing extraction failed: {message}")]
    Extraction { message: String },
    #[error("task aborted: {message}")]
    Panicked { message: String },
}

impl FetchError {
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    pub fn http(err: impl std::fmt::Display) -> Self {
        Self::Http {
            message: err.to_string(),
        }
    }

    /// Short machine-friendly label, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::NoResults => "no_results",
            Self::Status { .. } => "status",
            Self::Http { .. } => "http",
            Self::Extraction { .. } => "extraction",
            Self::Panicked { .. } => "panicked",
        }
    }
}
