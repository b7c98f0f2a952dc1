mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eventdekho_core::Backend;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never talk to the backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "eventdekho", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let backend = build_backend(&cli.global)?;
            tracing::debug!(command = ?cmd, base_url = %backend.client().base_url(), "dispatching command");
            commands::dispatch(cmd, &backend, &cli.global).await
        }
    }
}

/// Load the layered config, apply CLI overrides, and build the backend.
fn build_backend(global: &GlobalOpts) -> Result<Backend, CliError> {
    let mut cfg = eventdekho_config::load_config()?;
    commands::config_cmd::apply_overrides(&mut cfg, global);
    let backend_config = cfg.to_backend_config()?;
    Ok(Backend::new(backend_config)?)
}
