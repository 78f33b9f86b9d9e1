//! The `aws-waiter` command line
//!
//! `aws-waiter <service> wait <waiter-name> [parameters] [global flags]` polls
//! the waiter's operation until the resource reaches the waited-for state.
//! The command tree is generated from the service and waiter models at startup.

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use aws_waiter_engine::{
    CancellationToken, ChainedModelProvider, EmbeddedModelProvider, FileSystemModelProvider,
    ModelProvider,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};
use tokio::task::JoinHandle;

pub mod caller;
pub mod commands;
pub mod errors;
pub mod http;
pub mod params;

use caller::{ConnectionSettings, Connector, PollOverrides, RunContext};
use commands::{build_command_table, CommandTable, ServiceCommand};
use errors::CliError;
use http::HttpConnector;

pub const BIN_NAME: &str = "aws-waiter";

/// Colon separated directories searched for models before the bundled ones
pub const DATA_PATH_ENV: &str = "AWS_WAITER_DATA_PATH";

const REGION_ENV: &str = "AWS_REGION";
const DEFAULT_REGION_ENV: &str = "AWS_DEFAULT_REGION";

fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("region")
            .long("region")
            .global(true)
            .env(REGION_ENV)
            .value_name("REGION")
            .help("The region to use. Falls back to AWS_DEFAULT_REGION"),
        Arg::new("endpoint-url")
            .long("endpoint-url")
            .global(true)
            .value_name("URL")
            .help("Override the service endpoint with the given URL"),
        Arg::new("no-verify-ssl")
            .long("no-verify-ssl")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Do not verify TLS certificates of the endpoint"),
        Arg::new("debug")
            .long("debug")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Turn on debug logging"),
        Arg::new("wait-timeout")
            .long("wait-timeout")
            .global(true)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Give up waiting after this many seconds"),
        Arg::new("waiter-delay")
            .long("waiter-delay")
            .global(true)
            .value_name("SECONDS")
            .value_parser(value_parser!(u64))
            .help("Seconds between attempts, replacing the waiter's declared delay"),
        Arg::new("waiter-max-attempts")
            .long("waiter-max-attempts")
            .global(true)
            .value_name("COUNT")
            .value_parser(value_parser!(u32).range(1..))
            .help("Attempt ceiling, replacing the waiter's declared maximum"),
    ]
}

/// Flags every generated command already accepts
pub(crate) fn reserved_flag_names() -> Vec<String> {
    global_args()
        .iter()
        .map(|arg| arg.get_id().as_str().to_string())
        .chain(std::iter::once("help".to_string()))
        .collect()
}

/// The full command tree for `table`
pub fn root_command(table: &CommandTable) -> Command {
    Command::new(BIN_NAME)
        .version(clap::crate_version!())
        .about("Wait for AWS resources to reach a desired state")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(global_args())
        .subcommands(table.values().map(ServiceCommand::to_clap))
}

/// Global flags are propagated down, so the innermost matches see all of them
fn innermost(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;
    while let Some((_, sub_matches)) = current.subcommand() {
        current = sub_matches;
    }
    current
}

fn run_context(matches: &ArgMatches) -> RunContext {
    let region = matches
        .get_one::<String>("region")
        .cloned()
        .or_else(|| std::env::var(DEFAULT_REGION_ENV).ok());

    RunContext {
        connection: ConnectionSettings {
            region,
            endpoint_url: matches.get_one::<String>("endpoint-url").cloned(),
            verify_tls: !matches.get_flag("no-verify-ssl"),
        },
        overrides: PollOverrides {
            delay_seconds: matches.get_one::<u64>("waiter-delay").copied(),
            max_attempts: matches.get_one::<u32>("waiter-max-attempts").copied(),
        },
        cancel: CancellationToken::new(),
    }
}

/// Cancel `cancel` on Ctrl-C, and after `wait_timeout` seconds when given
fn spawn_cancellation(cancel: &CancellationToken, wait_timeout: Option<u64>) -> Vec<JoinHandle<()>> {
    let token = cancel.clone();
    let mut tasks = vec![tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling the wait");
            token.cancel();
        }
    })];

    if let Some(seconds) = wait_timeout {
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            info!("Wait timeout of {}s elapsed, cancelling the wait", seconds);
            token.cancel();
        }));
    }

    tasks
}

/// Install the logger. `RUST_LOG` applies, defaulting to `warn`; `debug` raises it to `debug`.
pub fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // A logger may already be installed when running embedded
    let _ = builder.try_init();
}

pub struct App {
    provider: Box<dyn ModelProvider>,
    connector: Arc<dyn Connector>,
}

impl App {
    pub fn new(provider: Box<dyn ModelProvider>, connector: Arc<dyn Connector>) -> Self {
        Self {
            provider,
            connector,
        }
    }

    /// Models from `AWS_WAITER_DATA_PATH` in front of the bundled ones, invoked over HTTP.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut providers: Vec<Box<dyn ModelProvider>> = Vec::new();
        if let Some(paths) = std::env::var_os(DATA_PATH_ENV) {
            for path in std::env::split_paths(&paths) {
                if path.as_os_str().is_empty() {
                    continue;
                }
                if !path.is_dir() {
                    bail!("{} entry {} is not a directory", DATA_PATH_ENV, path.display());
                }
                debug!("Searching {} for models", path.display());
                providers.push(Box::new(FileSystemModelProvider::new(&path)));
            }
        }
        providers.push(Box::new(EmbeddedModelProvider));

        Ok(Self::new(
            Box::new(ChainedModelProvider::new(providers)),
            Arc::new(HttpConnector),
        ))
    }

    /// Parse `args` (including the binary name) and run the selected waiter.
    ///
    /// `Ok` carries the number of attempts the wait took.
    pub async fn execute<I, T>(&self, args: I) -> Result<u32, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let table = build_command_table(self.provider.as_ref(), Arc::clone(&self.connector))?;
        let matches = root_command(&table).try_get_matches_from(args)?;

        let Some((service_name, service_matches)) = matches.subcommand() else {
            return Err(CliError::usage("the following arguments are required: command"));
        };
        let service = table
            .get(service_name)
            .ok_or_else(|| CliError::usage(format!("Invalid choice: '{service_name}'")))?;

        let leaf = innermost(&matches);
        let context = run_context(leaf);
        let tasks = spawn_cancellation(&context.cancel, leaf.get_one::<u64>("wait-timeout").copied());

        let result = service.run(service_matches, &context).await;
        for task in tasks {
            task.abort();
        }
        result
    }

    /// Run like the binary does: print errors and map them to an exit code.
    pub async fn run<I, T>(&self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.execute(args).await {
            Ok(attempts) => {
                debug!("Wait completed after {} attempt(s)", attempts);
                ExitCode::SUCCESS
            }
            Err(error) => {
                match &error {
                    // clap routes help to stdout and errors to stderr
                    CliError::Clap(e) => {
                        let _ = e.print();
                    }
                    other => eprintln!("\n{other}"),
                }
                ExitCode::from(error.exit_code())
            }
        }
    }
}
