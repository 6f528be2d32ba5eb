//! Command-line interface for waiting on smart cards

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nexum_card_request::PcscSubsystem;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod config;

use commands::{events_command, list_readers, wait_command};

#[derive(Parser, Debug)]
#[command(version, about = "Wait for smart cards on PC/SC readers")]
struct Cli {
    /// Debug level output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.nxm/card-request.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available readers
    List,

    /// Wait for a card and connect to it
    Wait {
        /// Only accept a card inserted after the command started
        #[arg(short, long)]
        new: bool,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Wait for cards to be inserted
    Events {
        #[command(flatten)]
        wait: WaitArgs,
    },
}

/// Arguments shared by the waiting commands
#[derive(Args, Debug, Clone)]
struct WaitArgs {
    /// Seconds to wait before giving up (default: 10)
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Wait until a card shows up
    #[arg(long, conflicts_with = "timeout")]
    forever: bool,

    /// ATR the card must match, `?` matches any nibble (e.g. "3B ?? 94")
    #[arg(short, long)]
    atr: Option<String>,

    /// Reader to watch, may be repeated (default: every reader)
    #[arg(short, long = "reader")]
    readers: Vec<String>,
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;
    debug!(?config, "Loaded configuration");

    let subsystem = PcscSubsystem::shared()?;

    match &cli.command {
        Commands::List => list_readers(&subsystem)?,
        Commands::Wait { new, wait } => {
            wait_command(subsystem, config.request_config(wait)?.with_new_card_only(*new))?
        }
        Commands::Events { wait } => events_command(subsystem, config.request_config(wait)?)?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, directives.as_deref()))
        .with_ansi(true)
        .init();
}

/// `RUST_LOG` style `directives` over a default level picked by `verbose`
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn enabled(filter: EnvFilter, level: Level) -> bool {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        tracing::subscriber::with_default(subscriber, || {
            if level == Level::DEBUG {
                tracing::enabled!(Level::DEBUG)
            } else if level == Level::INFO {
                tracing::enabled!(Level::INFO)
            } else {
                tracing::enabled!(Level::ERROR)
            }
        })
    }

    #[test]
    fn test_verbose_enables_debug() {
        assert!(enabled(log_filter(true, None), Level::DEBUG));
    }

    #[test]
    fn test_default_level_is_info() {
        assert!(enabled(log_filter(false, None), Level::INFO));
        assert!(!enabled(log_filter(false, None), Level::DEBUG));
    }

    #[test]
    fn test_directives_override_default() {
        assert!(!enabled(log_filter(true, Some("error")), Level::INFO));
        assert!(enabled(log_filter(false, Some("debug")), Level::DEBUG));
    }
}
