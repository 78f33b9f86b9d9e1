use std::collections::BTreeMap;

use clap::{ArgMatches, Command};

use super::waiter_state::WaiterStateCommand;
use crate::caller::RunContext;
use crate::errors::CliError;

pub const WAIT_COMMAND_NAME: &str = "wait";

const WAIT_ABOUT: &str = "Wait until a particular condition is satisfied.";
const WAIT_LONG_ABOUT: &str = "Wait until a particular condition is satisfied. Each subcommand \
polls an API until the listed requirement is met.";

/// The `wait` dispatcher of one service
pub struct WaitCommand {
    commands: BTreeMap<String, WaiterStateCommand>,
}

impl WaitCommand {
    pub fn new(commands: BTreeMap<String, WaiterStateCommand>) -> Self {
        Self { commands }
    }

    pub fn name(&self) -> &'static str {
        WAIT_COMMAND_NAME
    }

    /// State commands by name, in name order
    pub fn commands(&self) -> &BTreeMap<String, WaiterStateCommand> {
        &self.commands
    }

    pub fn to_clap(&self) -> Command {
        Command::new(WAIT_COMMAND_NAME)
            .about(WAIT_ABOUT)
            .long_about(WAIT_LONG_ABOUT)
            .subcommands(self.commands.values().map(WaiterStateCommand::to_clap))
    }

    /// Dispatch to the selected state command.
    ///
    /// Running `wait` without naming a state command is a usage error.
    pub async fn run(&self, matches: &ArgMatches, context: &RunContext) -> Result<u32, CliError> {
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(CliError::usage(format!(
                "the following arguments are required: waiter_name (choose from: {})",
                self.commands.keys().cloned().collect::<Vec<_>>().join(", ")
            )));
        };
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CliError::usage(format!("Invalid choice: '{name}'")))?;

        log::debug!("Dispatching {}", command.lineage().join(" "));
        command.run(sub_matches, context).await
    }
}
