mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use netdiag_config::FileSessionStore;
use netdiag_core::SessionManager;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
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
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need the service
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "netdiag", &mut std::io::stdout());
            Ok(())
        }

        // Local history cache only
        Command::History(args) => commands::history::handle(args, &cli.global),

        // Everything else talks to the analysis service
        cmd => {
            let ctx = build_context(&cli.global)?;
            tracing::debug!(command = ?cmd, profile = %ctx.profile_name, "dispatching command");
            commands::dispatch(cmd, &ctx, &cli.global).await
        }
    }
}

/// Load config, pick the profile, and restore its persisted session.
fn build_context(global: &cli::GlobalOpts) -> Result<Context, CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);
    let client_config = config::resolve_client_config(global, &cfg, &profile_name)?;

    let store = Arc::new(FileSessionStore::new(netdiag_config::session_path(
        &profile_name,
    )));
    tracing::debug!(
        service = %client_config.base_url,
        session_file = %store.path().display(),
        "building session"
    );
    let session = SessionManager::new(&client_config, store)?;
    if let Err(e) = session.restore() {
        tracing::warn!(error = %e, "could not restore saved session");
    }

    Ok(Context {
        config: cfg,
        profile_name,
        session,
    })
}
