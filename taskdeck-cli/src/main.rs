//! Taskdeck: task and project client with background profile sync.
//!
//! # Usage
//!
//! ```text
//! taskdeck config show | set [--backend-url URL] [--api-key KEY] [--interval SECS]
//! taskdeck auth login --email EMAIL [--password PASS] | logout | whoami
//! taskdeck profile show [--json] | list | edit [--username U] [--display-name N] [--avatar REF]
//! taskdeck project list | add <name> [--description D] | rm <id>
//! taskdeck task list <project> | add <project> <title> | status <task> <status> | rm <task>
//! taskdeck log list <task> | add <task> --minutes N [--note TEXT] [--on YYYY-MM-DD]
//! taskdeck sync
//! taskdeck daemon start | stop | status | sync
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    auth::AuthCommand, config::ConfigCommand, daemon::DaemonCommand, log::LogCommand,
    profile::ProfileCommand, project::ProjectCommand, sync::SyncArgs, task::TaskCommand,
};
use taskdeck_core::TaskStatus;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "taskdeck",
    version,
    about = "Manage projects, tasks and work logs; keep your profile in sync",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change backend and sync settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Sign in, sign out, and show the current user.
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Inspect or edit the locally cached profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Manage projects on the backend.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage tasks within a project.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Record and list time spent on tasks.
    Log {
        #[command(subcommand)]
        command: LogCommand,
    },

    /// Reconcile the cached profile with the backend once, in the foreground.
    Sync(SyncArgs),

    /// Run or control the background sync daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Task status argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `TaskStatus` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStatusArg(pub TaskStatus);

impl FromStr for TaskStatusArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(Self(TaskStatus::Todo)),
            "in_progress" | "doing" => Ok(Self(TaskStatus::InProgress)),
            "done" => Ok(Self(TaskStatus::Done)),
            other => Err(format!(
                "unknown task status '{other}'; expected: todo, in_progress, done"
            )),
        }
    }
}

impl fmt::Display for TaskStatusArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<TaskStatusArg> for TaskStatus {
    fn from(s: TaskStatusArg) -> Self {
        s.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Auth { command } => commands::auth::run(command),
        Commands::Profile { command } => commands::profile::run(command),
        Commands::Project { command } => commands::project::run(command),
        Commands::Task { command } => commands::task::run(command),
        Commands::Log { command } => commands::log::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
