//! Command handlers

use std::time::Duration;

use colored::Colorize;
use nexum_card_request::{
    CardRequest, PcscSubsystem, ReaderEnumerator, ReaderStateTable, ReaderSubsystem,
    RequestConfig, RequestError, StatusWatch, Timeout, to_hex_string,
};
use tracing::info;

/// List all available readers with the card they hold
pub(crate) fn list_readers(subsystem: &PcscSubsystem) -> eyre::Result<()> {
    let readers = ReaderEnumerator::new(subsystem, None).reader_names()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    let table = ReaderStateTable::new().reconcile(&readers);
    let states = subsystem
        .status_watch()
        .get_status_change(Duration::ZERO, &table)?;

    println!("Available readers:");
    for (i, state) in states.iter().enumerate() {
        if state.is_present() {
            println!(
                "{}. {} ({})",
                i + 1,
                state.name(),
                to_hex_string(state.atr()).green()
            );
        } else {
            println!("{}. {} ({})", i + 1, state.name(), "no card".dimmed());
        }
    }

    Ok(())
}

/// Wait for a card matching `config` and print where it was found
pub(crate) fn wait_command(subsystem: PcscSubsystem, config: RequestConfig) -> eyre::Result<()> {
    let new_card_only = config.new_card_only;
    let timeout = config.timeout;
    let request = CardRequest::new(subsystem, config);

    let what = if new_card_only { "a new card" } else { "a card" };
    match timeout {
        Timeout::Infinite => println!("Insert {what}"),
        Timeout::After(d) => println!("Insert {what} within {}", seconds(d)),
    }

    match request.wait_for_card() {
        Ok(service) => {
            let connection = service.connection();
            info!(reader = connection.reader_name(), "Card found");
            println!("{} {}", "✓".green(), connection.reader_name().bold());
            println!("{}", atr_line(&connection.atr()?));
            Ok(())
        }
        Err(RequestError::Timeout) => {
            println!("{} Time-out: no card found", "✗".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Wait for card insertions and print every inserted card
pub(crate) fn events_command(subsystem: PcscSubsystem, config: RequestConfig) -> eyre::Result<()> {
    let request = CardRequest::new(subsystem, config);

    println!("Waiting for card insertion");
    match request.wait_for_card_event() {
        Ok(cards) => {
            for card in cards {
                println!("{} {}", "✓".green(), card);
            }
            Ok(())
        }
        Err(RequestError::Timeout) => {
            println!("{} Time-out: no card inserted", "✗".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn atr_line(atr: &[u8]) -> String {
    format!("  ATR: {}", to_hex_string(atr))
}

fn seconds(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs == 1.0 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}
