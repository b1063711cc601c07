//! auto-pr: apply one change to many repositories and open pull requests.
//!
//! # Usage
//!
//! ```text
//! auto-pr [-w <dir>] [--repos-dir <dir>] [--debug] <command>
//!
//! auto-pr init --api-key <key> [--ssh-key-file <path>]
//! auto-pr pull [--no-fetch-repo-list] [--update-repos] [--jobs N] [--use-global-git-config]
//! auto-pr test [--pull-repos]
//! auto-pr run [--pull-repos] [--push-delay SECS]
//! auto-pr status [--json]
//! auto-pr reset all | auto-pr reset repos <owner/name>...
//! auto-pr close | auto-pr reopen
//! auto-pr search <query> [--max-repos N] [--public|--private] [--archived|--not-archived] [--append]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autopr_core::WorkDir;
use commands::{
    init::InitArgs,
    pull::PullArgs,
    pull_requests::{CloseArgs, ReopenArgs},
    reset::ResetCommand,
    run::RunArgs,
    search::SearchArgs,
    status::StatusArgs,
    test::TestArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "auto-pr",
    version,
    about = "Run one update command across many repositories and open pull requests",
    long_about = None,
)]
struct Cli {
    /// Work directory holding config.yaml, db.json and repos/.
    #[arg(short = 'w', long = "workdir", env = "APR_WORKDIR", global = true)]
    workdir: Option<PathBuf>,

    /// Directory for working copies; overrides `custom_repos_dir` in the config.
    #[arg(long, global = true, value_name = "DIR")]
    repos_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, env = "APR_DEBUG", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create config.yaml, db.json and the repositories directory.
    Init(InitArgs),

    /// Discover repositories, update the database and sync working copies.
    Pull(PullArgs),

    /// Apply the update command to each pending repository and show the diff.
    Test(TestArgs),

    /// Commit, push and open a pull request for each pending repository.
    Run(RunArgs),

    /// Summarise the tracked pull requests.
    Status(StatusArgs),

    /// Mark repositories as not done so the next run picks them up again.
    Reset {
        #[command(subcommand)]
        command: ResetCommand,
    },

    /// Close every tracked pull request.
    Close(CloseArgs),

    /// Reopen every tracked pull request.
    Reopen(ReopenArgs),

    /// Generate filter rules from a code search.
    Search(SearchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let location = match cli.workdir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let workdir = WorkDir::new(location, cli.repos_dir);

    match cli.command {
        Commands::Init(args) => args.run(&workdir),
        Commands::Pull(args) => args.run(&workdir),
        Commands::Test(args) => args.run(&workdir),
        Commands::Run(args) => args.run(&workdir),
        Commands::Status(args) => args.run(&workdir),
        Commands::Reset { command } => commands::reset::run(command, &workdir),
        Commands::Close(args) => args.run(&workdir),
        Commands::Reopen(args) => args.run(&workdir),
        Commands::Search(args) => args.run(&workdir),
    }
}

/// Logs go to stderr; RUST_LOG takes priority over `--debug`.
fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
