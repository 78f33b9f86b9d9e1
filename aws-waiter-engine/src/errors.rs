//! Error types for the waiter engine
//!
//! [`WaiterError`] covers everything that can go wrong before or around a wait:
//! loading and validating models, evaluating queries and invoking operations.
//! [`WaitError`] is the typed terminal result of a wait that ran but did not
//! reach a success state.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::acceptor::{MatchContext, ServiceError};

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, WaiterError>;

/// Errors raised while loading models or driving a waiter
#[derive(Debug, Error)]
pub enum WaiterError {
    /// The data source has nothing for this service identity.
    ///
    /// Model loaders turn this into an absent model rather than a failure.
    #[error("Unable to load data for: {service}/{api_version}/{file}")]
    DataNotFound {
        service: String,
        api_version: String,
        file: String,
    },

    #[error("Unsupported waiter version, supported version must be 2, but version {0} detected")]
    UnsupportedVersion(u64),

    #[error("Invalid waiter definition for {waiter}: {reason}")]
    InvalidWaiter { waiter: String, reason: String },

    #[error("Waiter does not exist: {0}")]
    WaiterNotFound(String),

    #[error("Operation does not exist: {0}")]
    OperationNotFound(String),

    #[error("Invalid service model: {0}")]
    InvalidServiceModel(String),

    #[error("JMESPath query {expression:?} failed: {message}")]
    Query { expression: String, message: String },

    #[error("Failed to {operation} {}: {source}", .path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation collaborator could not produce a response at all.
    #[error("Failed to invoke {operation}: {message}")]
    Invocation { operation: String, message: String },
}

impl WaiterError {
    pub(crate) fn data_not_found(service: &str, api_version: &str, file: &str) -> Self {
        Self::DataNotFound {
            service: service.to_string(),
            api_version: api_version.to_string(),
            file: file.to_string(),
        }
    }

    pub(crate) fn invalid_waiter(waiter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidWaiter {
            waiter: waiter.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn query(expression: &str, error: impl std::fmt::Display) -> Self {
        Self::Query {
            expression: expression.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn file_system(
        operation: &str,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build an invocation failure for collaborators outside this crate.
    pub fn invocation(operation: &str, message: impl Into<String>) -> Self {
        Self::Invocation {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Whether this is the "no data for this identity" condition.
    pub fn is_data_not_found(&self) -> bool {
        matches!(self, Self::DataNotFound { .. })
    }
}

/// A wait that ended in a terminal state other than success
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WaitError {
    /// An acceptor with state `failure` or `error` matched.
    #[error("Waiter {waiter} failed: Waiter encountered a terminal failure state: {context}")]
    TerminalFailure {
        waiter: String,
        attempts: u32,
        context: MatchContext,
    },

    /// The service returned an error that no acceptor expected.
    #[error("Waiter {waiter} failed: {error}")]
    UnmatchedError {
        waiter: String,
        attempts: u32,
        error: ServiceError,
    },

    #[error("Waiter {waiter} failed: Max attempts exceeded after {attempts} attempt(s) with a delay of {delay_seconds} second(s)")]
    TimedOut {
        waiter: String,
        attempts: u32,
        delay_seconds: u64,
    },

    #[error("Waiter {waiter} cancelled after {attempts} attempt(s)")]
    Cancelled { waiter: String, attempts: u32 },
}

impl WaitError {
    pub fn waiter(&self) -> &str {
        match self {
            Self::TerminalFailure { waiter, .. }
            | Self::UnmatchedError { waiter, .. }
            | Self::TimedOut { waiter, .. }
            | Self::Cancelled { waiter, .. } => waiter,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::TerminalFailure { attempts, .. }
            | Self::UnmatchedError { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}
