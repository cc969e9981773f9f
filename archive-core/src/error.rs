//! Error types shared across the archive crates.
//!
//! [`SourceError`] is what a [`MessageSource`](crate::MessageSource) reports; [`FallbackReason`]
//! is the typed reason a best-effort lookup degraded to a placeholder.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by the upstream message source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The service asked us to back off for `wait` before retrying the same request.
    #[error("Rate limited, retry after {wait:?}")]
    RateLimited { wait: Duration },

    /// Permanent access denial for the entity (private, banned, deleted).
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for source calls; uses [`SourceError`].
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Why a best-effort lookup produced a fallback value instead of a resolved one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    #[error("lookup failed: {0}")]
    LookupFailed(#[from] SourceError),

    #[error("resolved peer has no usable name")]
    Unnamed,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Outcome of a best-effort lookup: the resolved value or the reason it fell back.
pub type Lookup<T> = std::result::Result<T, FallbackReason>;
