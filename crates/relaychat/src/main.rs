use std::process::ExitCode;

use clap::Parser;
use relaychat::cli::{Cli, Command, ServerArgs};
use relaychat::{RelayError, RelayServer, client};

fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_server(args: ServerArgs) -> Result<(), RelayError> {
    let config = args.resolve()?;
    let server = RelayServer::builder().config(config).build().await?;
    let addr = server.local_addr()?;
    println!("Chat server started, listening on {addr}");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, dropping all connections");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => {
            init_tracing("info");
            match run_server(args).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "server exited with error");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Client(args) => {
            init_tracing("warn");
            let code = match client::run(args).await {
                Ok(()) => 0,
                Err(_) => 1,
            };
            // Tokio's stdin reader is a blocking thread that would otherwise
            // keep the runtime alive until the next keypress.
            std::process::exit(code);
        }
    }
}
