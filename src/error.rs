//! Crate-wide error taxonomy.
//!
//! Mirrors the five failure categories the session controller has to
//! reason about: configuration mistakes and missing resources are fatal
//! at startup, everything else is something a running session can log
//! and continue past.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by fallible setup and session-lifecycle
/// operations. Transient per-frame/per-utterance failures are handled
/// inline (logged and converted to a safe default) rather than
/// propagated as `AsrError`, per the error handling design: nothing
/// below the Session Controller should bubble an error past it.
#[derive(Debug, Error)]
pub enum AsrError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to acquire resource {resource}: {source}")]
    Resource {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("policy rejection: {0}")]
    Policy(String),
}

impl AsrError {
    pub fn config(msg: impl Into<String>) -> Self {
        AsrError::Configuration(msg.into())
    }

    pub fn resource(resource: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AsrError::Resource {
            resource: resource.into(),
            source: source.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AsrError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AsrResult<T> = Result<T, AsrError>;
