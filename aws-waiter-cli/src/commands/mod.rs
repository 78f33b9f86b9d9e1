//! The command table
//!
//! Every service known to the model provider becomes a top-level command.
//! Services that declare at least one waiter get a `wait` subcommand with one
//! generated state command per waiter; every other service has no `wait` at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use aws_waiter_engine::{ModelCache, ModelProvider, ServiceModel, WaiterError};
use clap::{ArgMatches, Command};
use log::debug;

pub mod wait;
pub mod waiter_state;

pub use wait::{WaitCommand, WAIT_COMMAND_NAME};
pub use waiter_state::{WaiterStateCommand, WaiterStateCommandBuilder};

use crate::caller::{Connector, RunContext};
use crate::errors::CliError;

/// Service commands by service name
pub type CommandTable = BTreeMap<String, ServiceCommand>;

pub struct ServiceCommand {
    name: String,
    api_version: String,
    service_model: Arc<ServiceModel>,
    wait: Option<WaitCommand>,
}

impl ServiceCommand {
    pub fn new(name: String, api_version: String, service_model: Arc<ServiceModel>) -> Self {
        Self {
            name,
            api_version,
            service_model,
            wait: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn service_model(&self) -> &ServiceModel {
        &self.service_model
    }

    /// The `wait` dispatcher, if the service declares waiters
    pub fn wait(&self) -> Option<&WaitCommand> {
        self.wait.as_ref()
    }

    pub fn to_clap(&self) -> Command {
        let title = self
            .service_model
            .metadata
            .service_id
            .as_deref()
            .unwrap_or(&self.name);
        let command = Command::new(self.name.clone())
            .about(format!("{} (api version {})", title, self.api_version));
        match &self.wait {
            Some(wait) => command.subcommand(wait.to_clap()),
            None => command,
        }
    }

    pub async fn run(&self, matches: &ArgMatches, context: &RunContext) -> Result<u32, CliError> {
        match (matches.subcommand(), &self.wait) {
            (Some((WAIT_COMMAND_NAME, wait_matches)), Some(wait)) => {
                wait.run(wait_matches, context).await
            }
            (Some((other, _)), _) => Err(CliError::usage(format!(
                "Invalid choice: '{}' is not a command of {}",
                other, self.name
            ))),
            (None, _) => Err(CliError::usage(format!(
                "the following arguments are required: command (for {})",
                self.name
            ))),
        }
    }
}

/// Register the `wait` dispatcher on `command` when its service declares waiters.
///
/// A service without a waiter model, or with an empty one, is left untouched.
pub fn add_waiters(
    command: &mut ServiceCommand,
    cache: &mut ModelCache<'_>,
    connector: Arc<dyn Connector>,
) -> Result<(), WaiterError> {
    let Some(waiter_model) = cache.waiter_model(&command.name, &command.api_version)? else {
        debug!("{} {} declares no waiters", command.name, command.api_version);
        return Ok(());
    };
    if waiter_model.is_empty() {
        debug!("{} {} has an empty waiter model", command.name, command.api_version);
        return Ok(());
    }

    let mut commands = BTreeMap::new();
    WaiterStateCommandBuilder::new(waiter_model, Arc::clone(&command.service_model), connector)
        .build_all_waiter_state_cmds(&mut commands)?;
    debug!("{}: registered {} waiter(s)", command.name, commands.len());
    command.wait = Some(WaitCommand::new(commands));
    Ok(())
}

/// Build the command table of every service `provider` knows, at its latest api version.
pub fn build_command_table(
    provider: &dyn ModelProvider,
    connector: Arc<dyn Connector>,
) -> Result<CommandTable, WaiterError> {
    let mut cache = ModelCache::new(provider);
    let mut table = CommandTable::new();

    for (service, versions) in provider.available_services()? {
        let Some(api_version) = versions.last() else {
            continue;
        };
        let service_model = match cache.service_model(&service, api_version) {
            Ok(model) => model,
            Err(e) if e.is_data_not_found() => {
                debug!("Skipping {}: {}", service, e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut command = ServiceCommand::new(service.clone(), api_version.clone(), service_model);
        add_waiters(&mut command, &mut cache, Arc::clone(&connector))?;
        table.insert(service, command);
    }

    Ok(table)
}
