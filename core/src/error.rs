//! Error types for the data API client.
//!
//! # Design
//! `NotFound` and `PermissionDenied` get dedicated variants because callers
//! routinely distinguish "the record does not exist" and "this auth mode may
//! not do that" from "the server returned an unexpected status." All other
//! non-2xx responses land in `HttpError` with the raw status code and body
//! for debugging.

use crate::auth::AuthMode;

/// Errors returned by `DataClient` and by `Repository` implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404; the requested record does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned 401 or 403 for the chosen auth mode.
    #[error("permission denied (HTTP {status}): {body}")]
    PermissionDenied { status: u16, body: String },

    /// The server rejected the payload (400 or 422).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server returned any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// No credential is configured for the requested auth mode.
    #[error("no credential configured for auth mode {0}")]
    MissingCredential(AuthMode),

    /// An identifier or paging token cannot be placed in a request URL.
    #[error("invalid identifier `{0}`")]
    InvalidId(String),

    /// A list page handed back the same `next_token` it was asked for.
    #[error("pagination stalled at token `{0}`")]
    StalledPagination(String),

    /// The host failed to execute the HTTP round-trip.
    #[error("transport error: {0}")]
    Transport(String),
}
