//! Error types for the Tradzy API client.
//!
//! # Design
//! Three kinds reach callers from a round-trip: the transport failed before
//! a response arrived (`Network`), the body was not the JSON we expected
//! (`Decode`), or the server answered with a non-2xx status (`Request`).
//! Local failures (payload encoding, the key-value store) get their own
//! variants so they are never confused with server answers.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by `TradzyClient` parse methods and `ApiSession`
/// operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport failed before any response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not valid JSON or did not match the expected
    /// shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The server returned a non-2xx status. `message` is the body's `error`
    /// field, or the operation's default message.
    #[error("HTTP {status}: {message}")]
    Request { status: u16, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The local credential store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Status code of a `Request` error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Failure raised by a `Transport` before a response was produced.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Network(err.0)
    }
}
