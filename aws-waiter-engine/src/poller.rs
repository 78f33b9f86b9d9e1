//! Polling loop
//!
//! [`PollingExecutor`] drives one wait: invoke the operation, classify the
//! response with the acceptor engine, then stop, or sleep and poll again. The
//! policy is fixed-interval polling with a hard attempt ceiling. Both the
//! invocation and the sleep race a [`CancellationToken`] so a wait can be
//! aborted promptly from outside.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::acceptor::{self, Evaluation, MatchContext, OperationResponse, ServiceError};
use crate::errors::{Result, WaitError, WaiterError};
use crate::model::{AcceptorState, WaiterConfig};

/// Request parameters forwarded to the polled operation
pub type Parameters = Map<String, Value>;

/// The capability to call the polled operation
///
/// Implementations own the transport and connection settings. A service error
/// is returned as [`OperationResponse::Error`]; `Err` is reserved for failures
/// that produced no response at all, and ends the wait.
#[async_trait]
pub trait OperationInvoker: Send + Sync {
    async fn invoke(&self, operation: &str, parameters: &Parameters) -> Result<OperationResponse>;
}

/// Why a wait ended in the `Error` state
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorReason {
    /// An acceptor with state `error` matched
    Acceptor(MatchContext),
    /// The service returned an error no acceptor expected
    Unexpected(ServiceError),
}

/// Terminal result of a wait
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Success {
        attempts: u32,
    },
    Failure {
        attempts: u32,
        context: MatchContext,
    },
    Error {
        attempts: u32,
        reason: ErrorReason,
    },
    TimedOut {
        attempts: u32,
        delay_seconds: u64,
    },
    /// Aborted by the cancellation token; `attempts` counts completed attempts
    Cancelled {
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts }
            | Self::Failure { attempts, .. }
            | Self::Error { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Map the outcome to the error taxonomy. `Ok` carries the attempt count.
    pub fn into_result(self, waiter: &str) -> std::result::Result<u32, WaitError> {
        let waiter = waiter.to_string();
        match self {
            Self::Success { attempts } => Ok(attempts),
            Self::Failure { attempts, context }
            | Self::Error {
                attempts,
                reason: ErrorReason::Acceptor(context),
            } => Err(WaitError::TerminalFailure {
                waiter,
                attempts,
                context,
            }),
            Self::Error {
                attempts,
                reason: ErrorReason::Unexpected(error),
            } => Err(WaitError::UnmatchedError {
                waiter,
                attempts,
                error,
            }),
            Self::TimedOut {
                attempts,
                delay_seconds,
            } => Err(WaitError::TimedOut {
                waiter,
                attempts,
                delay_seconds,
            }),
            Self::Cancelled { attempts } => Err(WaitError::Cancelled { waiter, attempts }),
        }
    }
}

/// Runs the attempt loop of one waiter
///
/// The executor holds no state between waits; each call to [`wait`](Self::wait)
/// starts again at attempt 1.
#[derive(Debug, Clone)]
pub struct PollingExecutor<'a> {
    config: &'a WaiterConfig,
    delay_seconds: u64,
    max_attempts: u32,
}

impl<'a> PollingExecutor<'a> {
    /// Poll with the delay and attempt ceiling declared by `config`.
    pub fn new(config: &'a WaiterConfig) -> Self {
        Self {
            config,
            delay_seconds: config.delay_seconds,
            max_attempts: config.max_attempts,
        }
    }

    /// Override the declared delay between attempts.
    #[must_use]
    pub fn with_delay(mut self, delay_seconds: u64) -> Self {
        self.delay_seconds = delay_seconds;
        self
    }

    /// Override the declared attempt ceiling. Must be at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(WaiterError::invalid_waiter(
                &self.config.name,
                "maxAttempts must be >= 1, got 0",
            ));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    pub fn delay_seconds(&self) -> u64 {
        self.delay_seconds
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Poll until a terminal outcome is reached.
    ///
    /// `Err` is returned only when the invoker fails outright or a query cannot
    /// be evaluated; every other ending is a [`PollOutcome`].
    pub async fn wait(
        &self,
        invoker: &dyn OperationInvoker,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let name = &self.config.name;
        let mut attempt: u32 = 1;

        loop {
            debug!(
                "Waiter {}: attempt {}/{} calling {}",
                name, attempt, self.max_attempts, self.config.operation
            );

            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Waiter {} cancelled during attempt {}", name, attempt);
                    return Ok(PollOutcome::Cancelled { attempts: attempt - 1 });
                }
                response = invoker.invoke(&self.config.operation, parameters) => response?,
            };

            match acceptor::evaluate(&self.config.acceptors, &response)? {
                Evaluation::Matched { acceptor, context } => match acceptor.state {
                    AcceptorState::Success => {
                        info!("Waiter {} succeeded after {} attempt(s)", name, attempt);
                        return Ok(PollOutcome::Success { attempts: attempt });
                    }
                    AcceptorState::Failure => {
                        warn!("Waiter {} reached a failure state: {}", name, context);
                        return Ok(PollOutcome::Failure {
                            attempts: attempt,
                            context,
                        });
                    }
                    AcceptorState::Error => {
                        warn!("Waiter {} reached an error state: {}", name, context);
                        return Ok(PollOutcome::Error {
                            attempts: attempt,
                            reason: ErrorReason::Acceptor(context),
                        });
                    }
                    AcceptorState::Retry => {
                        debug!("Waiter {}: retry acceptor matched ({})", name, context);
                    }
                },
                Evaluation::NoMatch => {
                    debug!("Waiter {}: no acceptor matched", name);
                }
                Evaluation::UnexpectedError(error) => {
                    warn!("Waiter {} received an unexpected error: {}", name, error);
                    return Ok(PollOutcome::Error {
                        attempts: attempt,
                        reason: ErrorReason::Unexpected(error),
                    });
                }
            }

            if attempt >= self.max_attempts {
                warn!("Waiter {} exhausted {} attempt(s)", name, attempt);
                return Ok(PollOutcome::TimedOut {
                    attempts: attempt,
                    delay_seconds: self.delay_seconds,
                });
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Waiter {} cancelled after {} attempt(s)", name, attempt);
                    return Ok(PollOutcome::Cancelled { attempts: attempt });
                }
                () = tokio::time::sleep(Duration::from_secs(self.delay_seconds)) => {}
            }

            attempt += 1;
        }
    }
}
