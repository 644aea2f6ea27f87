use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod host;
mod releases;

#[derive(Parser)]
#[command(name = "topoff", version, about = "Keeps Homebrew packages topped off")]
struct Cli {
    /// SQLite database holding settings and update history
    #[arg(long, env = "TOPOFF_DB")]
    db: Option<PathBuf>,

    /// brew executable to use instead of searching the usual prefixes
    #[arg(long, env = "TOPOFF_BREW")]
    brew: Option<PathBuf>,

    #[command(subcommand)]
    command: cli::Commands,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let db_path = match cli.db.or_else(cli::default_database_path) {
        Some(path) => path,
        None => {
            eprintln!("HOME is not set; pass --db to choose a database location");
            return ExitCode::FAILURE;
        }
    };

    match cli::execute(cli.command, db_path, cli.brew).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(kind = ?error.kind, message = %error.description(), "command failed");
            ExitCode::FAILURE
        }
    }
}
