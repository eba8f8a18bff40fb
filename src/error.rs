//! Crate-level error handling
//!
//! Each subsystem has its own error enum. This module folds them into one
//! type for the host-facing frame functions and configuration loading.

use std::error::Error as StdError;
use std::fmt;

use crate::gpu::QueueClosed;
use crate::scene::NodeLocation;
use crate::sync::SyncError;
use crate::volume::EngineQueryError;

#[derive(Debug)]
pub enum MirrorError {
    // Volume engine
    EngineQueryFailure(EngineQueryError),

    // GPU resources
    QueueClosed,

    // Programming errors
    InvariantViolation {
        location: NodeLocation,
        reason: String,
    },

    // Configuration
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    // System
    IoError {
        path: String,
        error: String,
    },
    Internal {
        message: String,
    },
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::EngineQueryFailure(error) => {
                write!(f, "Volume engine query failed: {}", error)
            }
            MirrorError::QueueClosed => write!(f, "GPU resource command queue has been dropped"),
            MirrorError::InvariantViolation { location, reason } => {
                write!(f, "Invariant violated at node {}: {}", location, reason)
            }
            MirrorError::InvalidConfig {
                field,
                value,
                reason,
            } => write!(f, "Invalid config: {} = {} ({})", field, value, reason),
            MirrorError::IoError { path, error } => write!(f, "IO error for {}: {}", path, error),
            MirrorError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl StdError for MirrorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MirrorError::EngineQueryFailure(error) => Some(error),
            _ => None,
        }
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;

impl From<EngineQueryError> for MirrorError {
    fn from(error: EngineQueryError) -> Self {
        MirrorError::EngineQueryFailure(error)
    }
}

impl From<QueueClosed> for MirrorError {
    fn from(_: QueueClosed) -> Self {
        MirrorError::QueueClosed
    }
}

impl From<SyncError> for MirrorError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::EngineQuery(error) => MirrorError::EngineQueryFailure(error),
            SyncError::InvariantViolation { location, reason } => {
                MirrorError::InvariantViolation { location, reason }
            }
            SyncError::QueueClosed(_) => MirrorError::QueueClosed,
        }
    }
}

/// Extension trait for adding context to errors
pub trait MirrorErrorContext<T> {
    fn context(self, msg: &str) -> MirrorResult<T>;
    fn with_context<F>(self, f: F) -> MirrorResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> MirrorErrorContext<T> for Result<T, E>
where
    E: fmt::Display,
{
    fn context(self, msg: &str) -> MirrorResult<T> {
        self.map_err(|error| MirrorError::Internal {
            message: format!("{}: {}", msg, error),
        })
    }

    fn with_context<F>(self, f: F) -> MirrorResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|error| MirrorError::Internal {
            message: format!("{}: {}", f(), error),
        })
    }
}
