//! Error types used across the crate.
//!
//! `ApiError` is the one structured error that is allowed to cross the wire
//! (spec §6: "captured error descriptions with preserved kind and message").
//! `Error` is the local, non-serializable error used for everything that
//! never needs to leave the process (bind failures, codec corruption, ...).

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A structured, serializable error that survives a round trip through the
/// transport with its kind and message preserved (spec §3, §7).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: String,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> ApiError {
        ApiError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The handler (or a subprocess job) raised a Rust panic instead of
    /// returning an error. This is this crate's analogue of the Python
    /// source's "handler raised an arbitrary exception" case.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> ApiError {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked with a non-string payload".to_string()
        };
        ApiError::new("panic", message)
    }

    pub fn unknown_method(method: &str) -> ApiError {
        ApiError::new("unknown_method", format!("no such method: {method}"))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> ApiError {
        ApiError::new("io", err.to_string())
    }
}

/// Errors local to this process. Never serialized, never sent to a peer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind listener at {path}: {source}")]
    Bind {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("message codec error: {0}")]
    Codec(String),

    #[error("no subprocess job registered under name {0:?}")]
    UnknownJob(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
