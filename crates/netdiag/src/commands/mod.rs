//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod analyze;
pub mod changes;
pub mod config_cmd;
pub mod discover;
pub mod history;
pub mod session;
pub mod util;

use netdiag_config::{Config, Profile};
use netdiag_core::SessionManager;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a service-bound command needs.
pub struct Context {
    pub config: Config,
    pub profile_name: String,
    pub session: SessionManager,
}

impl Context {
    pub fn profile(&self) -> Option<&Profile> {
        self.config.profiles.get(&self.profile_name)
    }
}

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(ctx, args, global).await,
        Command::Logout => session::logout(ctx, global).await,
        Command::Status => session::status(ctx, global).await,
        Command::Discover(args) => discover::handle(ctx, args, global).await,
        Command::Analyze(args) => analyze::handle(ctx, args, global).await,
        Command::Changes(args) => changes::handle(ctx, args, global).await,
        // Handled before a session is built
        Command::History(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command dispatched to the wrong handler".into()))
        }
    }
}
