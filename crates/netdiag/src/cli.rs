//! Clap derive structures for the `netdiag` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netdiag -- run and act on network health analyses
#[derive(Debug, Parser)]
#[command(
    name = "netdiag",
    version,
    about = "Analyze network health and apply recommended fixes",
    long_about = "Command-line client for the netdiag analysis service.\n\n\
        Log in to a network controller through the service, run health\n\
        analyses, review findings, and apply or revert recommended changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "NETDIAG_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Analysis service URL (overrides profile)
    #[arg(long, env = "NETDIAG_SERVICE", global = true)]
    pub service: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETDIAG_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETDIAG_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "NETDIAG_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in to a network controller through the analysis service
    Login(LoginArgs),

    /// End the current session
    Logout,

    /// Show whether the stored session is still valid
    Status,

    /// Scan a subnet for network controllers
    Discover(DiscoverArgs),

    /// Run analyses and read their results
    #[command(alias = "a")]
    Analyze(AnalyzeArgs),

    /// Preview, apply and revert recommended changes
    #[command(alias = "ch")]
    Changes(ChangesArgs),

    /// Browse locally saved analysis summaries
    History(HistoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Controller address (e.g., https://192.168.1.1)
    #[arg(long)]
    pub host: Option<String>,

    /// Controller username
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Controller site
    #[arg(long, short = 's')]
    pub site: Option<String>,

    /// Controller password (prefer the keyring or NETDIAG_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Subnet to scan in CIDR form (service default if omitted)
    #[arg(long)]
    pub subnet: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ANALYZE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommand,
}

/// Polling cadence for commands that wait on a job.
#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    /// Seconds between status checks
    #[arg(long)]
    pub interval: Option<u64>,

    /// Give up after this many status checks
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum AnalyzeCommand {
    /// Start a new analysis job
    Run {
        /// Wait for the job to finish and print its results
        #[arg(long, short = 'w')]
        wait: bool,

        /// Save the results to local history (implies --wait)
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Show one status snapshot of a job
    Status {
        /// Job ID
        job_id: String,
    },

    /// Wait until a job completes or fails
    Wait {
        /// Job ID
        job_id: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Show the results of a completed job
    Results {
        /// Job ID
        job_id: String,

        /// Save the results to local history
        #[arg(long)]
        save: bool,

        /// Show access points, clients and findings in full
        #[arg(long)]
        detail: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CHANGES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ChangesArgs {
    #[command(subcommand)]
    pub command: ChangesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChangesCommand {
    /// Show what applying recommendations would change
    Preview {
        /// Job the recommendations belong to
        job_id: String,

        /// Recommendation indexes (comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<u32>,
    },

    /// Apply recommendations to the network
    Apply {
        /// Job the recommendations belong to
        job_id: String,

        /// Recommendation indexes (comma-separated)
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<u32>,

        /// Simulate without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert an applied change
    Revert {
        /// Change ID
        change_id: String,
    },

    /// List every change the service has recorded
    History,

    /// List changes that can still be reverted
    Revertable,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HISTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List saved analyses, newest first
    #[command(alias = "ls")]
    List {
        /// Show at most this many entries
        #[arg(long, short = 'l')]
        limit: Option<usize>,
    },

    /// Show one saved analysis
    Show {
        /// History entry ID
        id: i64,
    },

    /// Delete a saved analysis
    #[command(alias = "rm")]
    Delete {
        /// History entry ID
        id: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config, session and history file locations
    Path,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
