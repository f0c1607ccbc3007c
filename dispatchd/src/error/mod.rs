//! Error types and error handling

use thiserror::Error;

/// Engine error type
///
/// Every fallible engine operation surfaces one of these kinds. The kernel
/// is the only layer that matches broadly: [`EngineError::NotFound`] becomes
/// a `404`, token parse/signature failures become `401` inside the
/// authentication gate, and everything unclassified becomes a `500`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Dispatch was requested for a task name with no registration
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// No route matched the request verb and path
    #[error("no route matched")]
    NotFound,

    /// Malformed input: route templates, token segments, JSON payloads
    #[error("parse error: {0}")]
    Parse(String),

    /// Token signature did not match the recomputed value
    #[error("signature error: {0}")]
    Signature(String),

    /// A cryptographic primitive failed
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything a controller propagated that the kernel maps to a 500
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Marker error a job handler returns to request graceful cancellation.
///
/// [`crate::queue::Job::run`] recognises this by downcast and records the
/// cancelled outcome instead of the failed one. It never escapes a job.
#[derive(Debug, Clone, Copy, Error)]
#[error("job cancelled")]
pub struct Cancelled;
