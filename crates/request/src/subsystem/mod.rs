//! Reader subsystem the card request talks to
//!
//! The request logic never talks to PC/SC directly. It enumerates readers,
//! waits for status changes and opens connections through
//! [`ReaderSubsystem`], which keeps the polling loop independent of the
//! platform driver stack.

use core::fmt;
use std::time::Duration;

use crate::error::SubsystemError;
use crate::state::{ReaderState, ReaderStateTable};

#[cfg(feature = "pcsc")]
mod platform;
#[cfg(feature = "pcsc")]
pub use self::platform::{PcscConnection, PcscStatusWatch, PcscSubsystem};

#[cfg(test)]
pub(crate) mod mock;

/// Platform card reader subsystem
pub trait ReaderSubsystem: fmt::Debug {
    /// Status watch handed out for one wait call
    type Watch: StatusWatch;

    /// Connection to a card in a reader
    type Connection;

    /// List the names of the readers currently visible
    ///
    /// An empty system may either return an empty list or
    /// [`SubsystemError::NoReadersAvailable`].
    fn list_reader_names(&self) -> Result<Vec<String>, SubsystemError>;

    /// Create a status watch for one wait call
    fn status_watch(&self) -> Self::Watch;

    /// Open a connection to the card in `reader`
    fn open_connection(&self, reader: &str) -> Result<Self::Connection, SubsystemError>;
}

/// Blocking status change primitive
///
/// A watch belongs to exactly one wait call, so implementations may keep
/// per-reader bookkeeping between rounds.
pub trait StatusWatch {
    /// Block until a reader differs from the flags recorded in `table`
    ///
    /// Returns the fresh state of every table entry, with `CHANGED` set on
    /// the ones that differ. Fails with [`SubsystemError::Timeout`] when
    /// nothing changed within `timeout`.
    fn get_status_change(
        &mut self,
        timeout: Duration,
        table: &ReaderStateTable,
    ) -> Result<Vec<ReaderState>, SubsystemError>;
}
