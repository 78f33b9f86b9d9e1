use std::process::ExitCode;

use aws_waiter_cli::{init_logging, App};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // --debug is honoured before parsing so that model loading is logged too
    init_logging(std::env::args_os().any(|arg| arg == "--debug"));

    let app = App::from_env()?;
    Ok(app.run(std::env::args_os()).await)
}
