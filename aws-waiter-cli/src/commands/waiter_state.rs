//! Generated waiter state commands
//!
//! One [`WaiterStateCommand`] exists per waiter a service declares, named after
//! the waiter in kebab case (`InstanceRunning` becomes `instance-running`).

use std::collections::BTreeMap;
use std::sync::Arc;

use aws_waiter_engine::{
    build_waiter_state_description, to_cli_name, ParameterSpec, ServiceModel, WaiterError,
    WaiterModel,
};
use clap::{ArgMatches, Command};

use super::wait::WAIT_COMMAND_NAME;
use crate::caller::{Connector, RunContext, WaiterCaller};
use crate::errors::CliError;
use crate::params;

pub struct WaiterStateCommand {
    name: String,
    lineage: Vec<String>,
    parameters: Vec<ParameterSpec>,
    description: String,
    caller: WaiterCaller,
}

impl WaiterStateCommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command names from the `wait` dispatcher down to this command
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Input members of the polled operation, in flag order
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn caller(&self) -> &WaiterCaller {
        &self.caller
    }

    pub fn to_clap(&self) -> Command {
        let config = self.caller.config();
        let long_about = format!(
            "{}\n\nPolls `{}` every {} second(s) until a successful state is reached. \
             An error is returned after {} failed checks.",
            self.description,
            to_cli_name(&config.operation),
            config.delay_seconds,
            config.max_attempts
        );

        Command::new(self.name.clone())
            .about(self.description.clone())
            .long_about(long_about)
            .args(self.parameters.iter().flat_map(params::parameter_args))
    }

    /// Run the wait. `Ok` carries the number of attempts it took.
    pub async fn run(&self, matches: &ArgMatches, context: &RunContext) -> Result<u32, CliError> {
        let parameters = params::parameters_from_matches(&self.parameters, matches)?;
        let outcome = self
            .caller
            .invoke(
                &parameters,
                &context.connection,
                context.overrides,
                &context.cancel,
            )
            .await?;
        Ok(outcome.into_result(&self.caller.config().name)?)
    }
}

/// Builds the state commands of one service's waiters
pub struct WaiterStateCommandBuilder {
    waiter_model: Arc<WaiterModel>,
    service_model: Arc<ServiceModel>,
    connector: Arc<dyn Connector>,
}

impl WaiterStateCommandBuilder {
    pub fn new(
        waiter_model: Arc<WaiterModel>,
        service_model: Arc<ServiceModel>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            waiter_model,
            service_model,
            connector,
        }
    }

    /// Insert one command per declared waiter into `table`, keyed by command name.
    pub fn build_all_waiter_state_cmds(
        &self,
        table: &mut BTreeMap<String, WaiterStateCommand>,
    ) -> Result<(), WaiterError> {
        let reserved = crate::reserved_flag_names();
        for waiter_name in self.waiter_model.names() {
            let config = self.waiter_model.get(waiter_name)?;
            let mut parameters = self.service_model.input_parameters(&config.operation)?;
            params::avoid_reserved_flags(&mut parameters, &reserved);
            let name = to_cli_name(waiter_name);
            let command = WaiterStateCommand {
                lineage: vec![WAIT_COMMAND_NAME.to_string(), name.clone()],
                parameters,
                description: build_waiter_state_description(&config),
                caller: WaiterCaller::new(
                    config,
                    self.service_model.metadata.clone(),
                    Arc::clone(&self.connector),
                ),
                name: name.clone(),
            };
            table.insert(name, command);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::test_support::RecordingConnector;
    use aws_waiter_engine::{OperationResponse, WaitError};
    use serde_json::json;

    fn service_model() -> Arc<ServiceModel> {
        Arc::new(
            serde_json::from_value(json!({
                "metadata": {"apiVersion": "2016-11-15", "endpointPrefix": "ec2"},
                "operations": {
                    "DescribeInstances": {"input": {"shape": "DescribeInstancesRequest"}}
                },
                "shapes": {
                    "DescribeInstancesRequest": {
                        "type": "structure",
                        "members": {
                            "InstanceIds": {"shape": "InstanceIdStringList"},
                            "DryRun": {"shape": "Boolean"}
                        }
                    },
                    "InstanceIdStringList": {"type": "list", "member": {"shape": "String"}},
                    "String": {"type": "string"},
                    "Boolean": {"type": "boolean"}
                }
            }))
            .unwrap(),
        )
    }

    fn waiter_model(operation: &str) -> Arc<WaiterModel> {
        Arc::new(
            WaiterModel::from_value(json!({
                "version": 2,
                "waiters": {
                    "InstanceRunning": {
                        "operation": operation,
                        "delay": 15,
                        "maxAttempts": 40,
                        "acceptors": [
                            {"state": "success", "matcher": "pathAll", "argument": "Reservations[].Instances[].State.Name", "expected": "running"},
                            {"state": "failure", "matcher": "pathAny", "argument": "Reservations[].Instances[].State.Name", "expected": "terminated"}
                        ]
                    },
                    "InstanceExists": {
                        "operation": operation,
                        "delay": 5,
                        "maxAttempts": 40,
                        "description": "Wait until the instance shows up.",
                        "acceptors": [
                            {"state": "success", "matcher": "path", "argument": "length(Reservations[]) > `0`", "expected": true}
                        ]
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn build(connector: Arc<RecordingConnector>) -> BTreeMap<String, WaiterStateCommand> {
        let mut table = BTreeMap::new();
        WaiterStateCommandBuilder::new(waiter_model("DescribeInstances"), service_model(), connector)
            .build_all_waiter_state_cmds(&mut table)
            .unwrap();
        table
    }

    #[test]
    fn test_one_command_per_waiter() {
        let table = build(Arc::new(RecordingConnector::default()));

        assert_eq!(
            table.keys().collect::<Vec<_>>(),
            vec!["instance-exists", "instance-running"]
        );
        let running = &table["instance-running"];
        assert_eq!(running.name(), "instance-running");
        assert_eq!(running.lineage(), ["wait", "instance-running"]);
        assert_eq!(running.caller().config().name, "InstanceRunning");
        assert_eq!(
            running
                .parameters()
                .iter()
                .map(|p| p.cli_name.as_str())
                .collect::<Vec<_>>(),
            vec!["dry-run", "instance-ids"]
        );
        assert_eq!(
            running.description(),
            "Wait until JMESPath query Reservations[].Instances[].State.Name returns running \
             for all elements when polling with `describe-instances`."
        );
        assert_eq!(
            table["instance-exists"].description(),
            "Wait until the instance shows up."
        );
    }

    #[test]
    fn test_unknown_operation_fails_the_build() {
        let mut table = BTreeMap::new();
        let error = WaiterStateCommandBuilder::new(
            waiter_model("DescribeNothing"),
            service_model(),
            Arc::new(RecordingConnector::default()),
        )
        .build_all_waiter_state_cmds(&mut table)
        .unwrap_err();
        assert!(matches!(error, WaiterError::OperationNotFound(ref op) if op == "DescribeNothing"));
    }

    #[test]
    fn test_help_lists_parameters_and_operation() {
        let table = build(Arc::new(RecordingConnector::default()));
        let help = table["instance-running"].to_clap().render_long_help().to_string();

        assert!(help.contains("--instance-ids"), "{}", help);
        assert!(help.contains("(list)"), "{}", help);
        assert!(help.contains("--no-dry-run"), "{}", help);
        assert!(help.contains("`describe-instances` every 15 second(s)"), "{}", help);
    }

    #[tokio::test]
    async fn test_run_forwards_parameters_and_settings() {
        let connector = Arc::new(RecordingConnector::new(vec![OperationResponse::payload(
            json!({"Reservations": [{"Instances": [{"State": {"Name": "running"}}]}]}),
        )]));
        let table = build(connector.clone());
        let command = &table["instance-running"];
        let matches = command
            .to_clap()
            .try_get_matches_from(["instance-running", "--instance-ids", "i-1", "--dry-run"])
            .unwrap();

        let attempts = command.run(&matches, &RunContext::default()).await.unwrap();

        assert_eq!(attempts, 1);
        let calls = connector.calls.lock().unwrap();
        assert_eq!(calls[0].0, "DescribeInstances");
        assert_eq!(
            serde_json::Value::Object(calls[0].1.clone()),
            json!({"InstanceIds": ["i-1"], "DryRun": true})
        );
    }

    #[tokio::test]
    async fn test_failure_state_is_a_terminal_failure() {
        let connector = Arc::new(RecordingConnector::new(vec![OperationResponse::payload(
            json!({"Reservations": [{"Instances": [{"State": {"Name": "terminated"}}]}]}),
        )]));
        let table = build(connector);
        let command = &table["instance-running"];
        let matches = command
            .to_clap()
            .try_get_matches_from(["instance-running"])
            .unwrap();

        let error = command.run(&matches, &RunContext::default()).await.unwrap_err();

        match error {
            CliError::Wait(WaitError::TerminalFailure { waiter, attempts, .. }) => {
                assert_eq!(waiter, "InstanceRunning");
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
