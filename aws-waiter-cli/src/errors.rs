use aws_waiter_engine::{WaitError, WaiterError};
use thiserror::Error;

/// Exit status of a successful wait, or of `--help` / `--version`
pub const SUCCESS_EXIT_CODE: u8 = 0;
/// Exit status of a malformed command line
pub const USAGE_EXIT_CODE: u8 = 252;
/// Exit status of a wait that did not reach its success state
pub const FAILURE_EXIT_CODE: u8 = 255;
/// Exit status of a wait aborted by Ctrl-C or `--wait-timeout`
pub const CANCELLED_EXIT_CODE: u8 = 130;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Clap(#[from] clap::Error),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Engine(#[from] WaiterError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(
        "Service {service} uses the {protocol} protocol; only json protocol services can be polled"
    )]
    UnsupportedProtocol { service: String, protocol: String },
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => USAGE_EXIT_CODE,
            Self::Clap(e) => match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    SUCCESS_EXIT_CODE
                }
                _ => USAGE_EXIT_CODE,
            },
            Self::Wait(WaitError::Cancelled { .. }) => CANCELLED_EXIT_CODE,
            Self::Wait(_) | Self::Engine(_) | Self::Http(_) | Self::UnsupportedProtocol { .. } => {
                FAILURE_EXIT_CODE
            }
        }
    }
}
