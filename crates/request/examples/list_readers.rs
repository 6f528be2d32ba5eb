//! Example showing the readers a card request would watch

use std::time::Duration;

use nexum_card_request::{
    PcscSubsystem, ReaderEnumerator, ReaderStateTable, ReaderSubsystem, StatusWatch,
    to_hex_string,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subsystem = PcscSubsystem::new()?;

    let readers = ReaderEnumerator::new(&subsystem, None).reader_names()?;
    println!("Found {} readers:", readers.len());
    if readers.is_empty() {
        return Ok(());
    }

    // A table of unaware entries returns the current state right away
    let table = ReaderStateTable::new().reconcile(&readers);
    let states = subsystem
        .status_watch()
        .get_status_change(Duration::ZERO, &table)?;

    for (i, state) in states.iter().enumerate() {
        println!("{}. Reader: {}", i + 1, state.name());

        if state.is_present() {
            println!("   Card present, ATR: {}", to_hex_string(state.atr()));
        } else {
            println!("   No card present");
        }
    }

    Ok(())
}
