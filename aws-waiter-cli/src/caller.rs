//! Binding a waiter to a connection
//!
//! The engine's [`OperationInvoker`] only knows how to call an operation.
//! [`WaiterCaller`] adds what the command line contributes: the connection
//! settings used to reach the service and the polling overrides, and runs the
//! waiter's [`PollingExecutor`] against the resulting invoker.

use std::sync::Arc;

use aws_waiter_engine::{
    CancellationToken, OperationInvoker, Parameters, PollOutcome, PollingExecutor, ServiceMetadata,
    WaiterConfig,
};

use crate::errors::CliError;

/// Where and how to reach a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub region: Option<String>,
    /// Replaces the endpoint derived from the region
    pub endpoint_url: Option<String>,
    pub verify_tls: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            verify_tls: true,
        }
    }
}

/// Caller supplied replacements for the declared delay and attempt ceiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOverrides {
    pub delay_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Everything a waiter command needs at run time besides its own arguments
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub connection: ConnectionSettings,
    pub overrides: PollOverrides,
    pub cancel: CancellationToken,
}

/// Produces an invoker for a service once connection settings are known
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        metadata: &ServiceMetadata,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn OperationInvoker>, CliError>;
}

/// One waiter, ready to be invoked with parameters and connection settings
pub struct WaiterCaller {
    config: Arc<WaiterConfig>,
    metadata: ServiceMetadata,
    connector: Arc<dyn Connector>,
}

impl WaiterCaller {
    pub fn new(
        config: Arc<WaiterConfig>,
        metadata: ServiceMetadata,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            metadata,
            connector,
        }
    }

    pub fn config(&self) -> &WaiterConfig {
        &self.config
    }

    pub async fn invoke(
        &self,
        parameters: &Parameters,
        settings: &ConnectionSettings,
        overrides: PollOverrides,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, CliError> {
        let invoker = self.connector.connect(&self.metadata, settings)?;

        let mut executor = PollingExecutor::new(&self.config);
        if let Some(delay_seconds) = overrides.delay_seconds {
            executor = executor.with_delay(delay_seconds);
        }
        if let Some(max_attempts) = overrides.max_attempts {
            executor = executor.with_max_attempts(max_attempts)?;
        }

        log::debug!(
            "Waiter {}: polling {} every {}s, at most {} attempt(s)",
            self.config.name,
            self.config.operation,
            executor.delay_seconds(),
            executor.max_attempts()
        );

        Ok(executor.wait(invoker.as_ref(), parameters, cancel).await?)
    }
}
