//! storytap: manage a library of recorded stories from the terminal.
//!
//! Run with: `storytap <command>`

mod commands;
mod config;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{Stories, Tracks, Watch};
use config::CliConfig;

/// Manage a library of recorded stories
#[derive(Parser)]
#[command(name = "storytap")]
#[command(about = "Manage a library of recorded stories", long_about = None)]
#[command(version)]
struct Cli {
    /// Library directory (defaults to STORYTAP_LIBRARY_DIR or a platform-specific location)
    #[arg(short, long, global = true, value_name = "DIR")]
    library: Option<PathBuf>,

    /// Print every log line to stderr, not just warnings
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Manage stories
    Stories(Stories),

    /// Manage the tracks of one story
    Tracks(Tracks),

    /// Follow a story as it changes
    Watch(Watch),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = CliConfig::from_env().with_library_dir(cli.library);
    let _guard = logging::init(&config.log_dir, cli.verbose)?;
    tracing::debug!("Library: {}", config.library_dir.display());

    match cli.command {
        Command::Stories(cmd) => cmd.execute(&config).await,
        Command::Tracks(cmd) => cmd.execute(&config).await,
        Command::Watch(cmd) => cmd.execute(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_track_move() {
        let cli = Cli::try_parse_from([
            "storytap",
            "--library",
            "/tmp/lib",
            "tracks",
            "bedtime",
            "move",
            "intro",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.library, Some(PathBuf::from("/tmp/lib")));
        assert!(matches!(cli.command, Command::Tracks(_)));
    }

    #[test]
    fn test_rejects_negative_position() {
        assert!(
            Cli::try_parse_from(["storytap", "tracks", "s", "move", "intro", "-1"]).is_err()
        );
    }
}
