//! Error types for fleetwatch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while computing or serving the fleet view.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity's raw payload is malformed or incomplete.
    ///
    /// Fatal for the recompute that hit it; the previously published view
    /// stays in place.
    #[error("Invalid payload for entity '{entity}': {}", FieldProblems(.problems))]
    Payload {
        entity: String,
        problems: Vec<FieldProblem>,
    },

    /// A staleness threshold expression could not be parsed.
    #[error("Invalid duration: {0}")]
    Duration(String),

    /// An upstream source failed.
    #[error("Source failed: {0}")]
    Source(String),

    /// An upstream call did not finish within the configured timeout.
    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    /// The recompute task panicked or was aborted.
    #[error("Recompute aborted: {0}")]
    ComputeAborted(String),

    /// The failure of one recompute, handed to every caller that waited on it.
    #[error(transparent)]
    Shared(Arc<Error>),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error was caused by a bad entity payload.
    pub fn is_payload(&self) -> bool {
        matches!(self.root(), Error::Payload { .. })
    }

    /// The underlying error, looking through [`Error::Shared`].
    pub fn root(&self) -> &Error {
        match self {
            Error::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

/// What is wrong with a single payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    Missing,
    /// Present but of the wrong shape; carries what was expected.
    Invalid(&'static str),
}

/// One missing or invalid field in a raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    /// Field path, e.g. `memory_used` or `storage[1].total`.
    pub field: String,
    pub kind: ProblemKind,
}

impl FieldProblem {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ProblemKind::Missing,
        }
    }

    pub fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field: field.into(),
            kind: ProblemKind::Invalid(expected),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProblemKind::Missing => write!(f, "missing field `{}`", self.field),
            ProblemKind::Invalid(expected) => {
                write!(f, "field `{}` must be {}", self.field, expected)
            }
        }
    }
}

struct FieldProblems<'a>(&'a [FieldProblem]);

impl fmt::Display for FieldProblems<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", problem)?;
        }
        Ok(())
    }
}
