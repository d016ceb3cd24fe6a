//! Error and decision types for the enforcement layer.
//!
//! Permission outcomes are plain values ([`Decision`]) so callers can
//! inspect them before anything runs. [`GuardError`] is what the Guard
//! and the effectors return once an operation was attempted.

use std::fmt;

use thiserror::Error;

/// Which class of access a denial refers to.
///
/// The user-visible deny message differs per class so a reader can
/// tell a read denial from a write, network or device denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedKind {
    Read,
    Write,
    Delete,
    Network,
    Gpu,
    Sensor,
    Camera,
}

/// A refused operation, with the reason kept for logs and callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub kind: DeniedKind,
    pub reason: String,
}

impl Denial {
    pub fn new(kind: DeniedKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.kind {
            DeniedKind::Read => "read access denied",
            DeniedKind::Write => "write access denied",
            DeniedKind::Delete => "delete access denied",
            DeniedKind::Network => "network access denied",
            DeniedKind::Gpu => "GPU access denied",
            DeniedKind::Sensor => "sensor access denied",
            DeniedKind::Camera => "camera access denied",
        };
        write!(f, "{class}: {}", self.reason)
    }
}

/// Outcome of a permission check. Produced by `Guard::check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Failures of the Guard and its effectors.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Manifest or protected-path check refused the operation. Never retried.
    #[error("Permission denied: {0}")]
    PermissionDenied(Denial),

    /// Target file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed URL, unsupported method or unknown sensor type.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network I/O failed after the request was allowed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A device backend (GPU) is not present on this host.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Manifest file could not be read, parsed or written.
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// True for enforcement failures, which must never be downgraded.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GuardError::PermissionDenied(_))
    }
}
