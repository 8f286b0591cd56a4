//! Backoffice CLI - a terminal front end for the backoffice login session.
//!
//! Every invocation behaves like a fresh page load: the stored session is
//! restored and validated before the requested command runs.

mod app;
mod prompt;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use backoffice_core::todo::Filter;
use backoffice_core::Config;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use prompt::TerminalPrompter;

/// Log file written inside the data directory
const LOG_FILE: &str = "backoffice.log";

#[derive(Parser)]
#[command(name = "backoffice", version, about = "Backoffice login session client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Restore the stored session and show who is logged in
    Status {
        /// Also print the bootstrap state transitions
        #[arg(long)]
        verbose: bool,
    },
    /// Log in with a backoffice ID and password
    Login {
        #[arg(long)]
        username: Option<String>,
    },
    /// Log out and forget the stored session
    Logout {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Manage the local todo list
    Todo {
        #[command(subcommand)]
        command: TodoCommand,
    },
    /// Run the scenario backend in the foreground
    ServeMock {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 4010)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum TodoCommand {
    /// Add a todo; `!` marks high priority, `?` medium
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List todos, high priority first
    List {
        #[arg(long, default_value = "all")]
        filter: Filter,
    },
    /// Mark a todo done or not done
    Toggle { id: u64 },
    /// Delete a todo (completed ones ask for confirmation)
    Remove {
        id: u64,
        #[arg(long)]
        yes: bool,
    },
    /// Show total, completed and pending counts
    Stats,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when a data directory is available, to a log file
/// inside it. The returned guard must live until exit to flush the file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({e:#}), using defaults");
        Config::default()
    });
    let data_dir = config.data_dir().ok();
    if let Some(ref dir) = data_dir {
        let _ = std::fs::create_dir_all(dir);
    }
    let _guard = init_tracing(data_dir.as_deref().filter(|d| d.is_dir()));
    info!(data_dir = ?data_dir, "Backoffice CLI starting");

    match cli.command {
        Command::Status { verbose } => {
            let mut app = App::new(config, Arc::new(TerminalPrompter::new(false))).await?;
            app.status(verbose).await;
        }
        Command::Login { username } => {
            let mut app = App::new(config, Arc::new(TerminalPrompter::new(false))).await?;
            app.login(username).await?;
        }
        Command::Logout { yes } => {
            let mut app = App::new(config, Arc::new(TerminalPrompter::new(yes))).await?;
            app.logout().await?;
        }
        Command::Todo { command } => {
            let assume_yes = matches!(command, TodoCommand::Remove { yes: true, .. });
            app::run_todo(&config, command, &TerminalPrompter::new(assume_yes))?;
        }
        Command::ServeMock { host, port } => {
            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            let addr = listener.local_addr()?;
            println!(
                "Scenario backend on http://{}{}",
                addr,
                backoffice_core::config::MOCK_PATH
            );
            if let Err(e) = backoffice_core::mock::serve(listener).await {
                warn!(error = %e, "Scenario backend stopped");
                return Err(e);
            }
        }
    }

    info!("Backoffice CLI exiting");
    Ok(())
}
