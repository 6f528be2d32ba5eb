//! PC/SC reader subsystem

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::time::Duration;

use parking_lot::{Mutex, const_mutex};
use pcsc::{Card, Context, Disposition, ReaderState as PcscReaderState, Scope, State};
use tracing::{debug, trace};

use crate::config::ConnectConfig;
use crate::error::SubsystemError;
use crate::flags::ReaderFlags;
use crate::state::{ReaderState, ReaderStateTable};
use crate::subsystem::{ReaderSubsystem, StatusWatch};

/// Process wide context handed out by [`PcscSubsystem::shared`]
static SHARED_CONTEXT: Mutex<Option<Context>> = const_mutex(None);

/// Reader subsystem backed by the platform PC/SC service
#[derive(Clone)]
pub struct PcscSubsystem {
    context: Context,
    connect: ConnectConfig,
}

impl fmt::Debug for PcscSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscSubsystem")
            .field("connect", &self.connect)
            .finish_non_exhaustive()
    }
}

impl PcscSubsystem {
    /// Establish a dedicated user scope context
    pub fn new() -> Result<Self, SubsystemError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self::from_context(context))
    }

    /// Use the process wide context, establishing it on first use
    ///
    /// A context the PC/SC service no longer recognizes is replaced.
    pub fn shared() -> Result<Self, SubsystemError> {
        let mut shared = SHARED_CONTEXT.lock();

        if let Some(context) = shared.as_ref().filter(|c| c.is_valid().is_ok()) {
            return Ok(Self::from_context(context.clone()));
        }

        debug!("Establishing shared PC/SC context");
        let context = Context::establish(Scope::User)?;
        *shared = Some(context.clone());
        Ok(Self::from_context(context))
    }

    /// Wrap an existing context
    pub fn from_context(context: Context) -> Self {
        Self {
            context,
            connect: ConnectConfig::default(),
        }
    }

    /// Set the options used when connecting to matched cards
    pub fn with_connect_config(mut self, config: ConnectConfig) -> Self {
        self.connect = config;
        self
    }

    /// Underlying PC/SC context
    pub const fn context(&self) -> &Context {
        &self.context
    }
}

impl ReaderSubsystem for PcscSubsystem {
    type Watch = PcscStatusWatch;
    type Connection = PcscConnection;

    fn list_reader_names(&self) -> Result<Vec<String>, SubsystemError> {
        let readers = self.context.list_readers_owned()?;
        Ok(readers
            .into_iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect())
    }

    fn status_watch(&self) -> PcscStatusWatch {
        PcscStatusWatch {
            context: self.context.clone(),
            states: Vec::new(),
        }
    }

    fn open_connection(&self, reader: &str) -> Result<PcscConnection, SubsystemError> {
        let mut connection =
            PcscConnection::new(self.context.clone(), reader, self.connect.clone());
        connection.connect()?;
        Ok(connection)
    }
}

/// PC/SC status change wait for one request
///
/// Keeps the PC/SC reader states of the previous round so the event counter
/// the service reports is passed back unchanged.
pub struct PcscStatusWatch {
    context: Context,
    states: Vec<PcscReaderState>,
}

impl fmt::Debug for PcscStatusWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscStatusWatch")
            .field("readers", &self.states.len())
            .finish_non_exhaustive()
    }
}

impl PcscStatusWatch {
    /// PC/SC reader states for the next wait, in table order
    fn next_states(
        &mut self,
        table: &ReaderStateTable,
    ) -> Result<Vec<PcscReaderState>, SubsystemError> {
        let mut previous: HashMap<String, PcscReaderState> = self
            .states
            .drain(..)
            .map(|rs| (rs.name().to_string_lossy().into_owned(), rs))
            .collect();

        table
            .iter()
            .map(|entry| {
                let known = previous
                    .remove(entry.name())
                    .filter(|_| entry.flags() != ReaderFlags::UNAWARE);

                Ok(match known {
                    Some(mut rs) => {
                        rs.sync_current_state();
                        rs
                    }
                    None => {
                        let name = CString::new(entry.name())
                            .map_err(|_| SubsystemError::InvalidReaderName(entry.name().into()))?;
                        let current = entry.flags().without_changed().state().bits();
                        PcscReaderState::new(name, State::from_bits_truncate(current as _))
                    }
                })
            })
            .collect()
    }
}

impl StatusWatch for PcscStatusWatch {
    fn get_status_change(
        &mut self,
        timeout: Duration,
        table: &ReaderStateTable,
    ) -> Result<Vec<ReaderState>, SubsystemError> {
        let mut states = self.next_states(table)?;

        trace!(readers = states.len(), ?timeout, "SCardGetStatusChange");
        let result = self.context.get_status_change(Some(timeout), &mut states);

        let updated = states
            .iter()
            .zip(table)
            .map(|(rs, entry)| {
                let flags = ReaderFlags::from(rs.event_state());
                let flags = ReaderFlags::from_bits(flags.bits() | (rs.event_count() << 16));
                ReaderState::new(entry.name(), flags, rs.atr())
            })
            .collect();

        self.states = states;
        result?;
        Ok(updated)
    }
}

/// Connection to a card in a PC/SC reader
pub struct PcscConnection {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Connection options
    config: ConnectConfig,
}

impl fmt::Debug for PcscConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscConnection")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscConnection {
    /// Create an unconnected handle for `reader_name`
    pub(crate) fn new(context: Context, reader_name: &str, config: ConnectConfig) -> Self {
        Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        }
    }

    /// Connect to the card, if not connected yet
    pub fn connect(&mut self) -> Result<(), SubsystemError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader = CString::new(self.reader_name.as_str())
            .map_err(|_| SubsystemError::InvalidReaderName(self.reader_name.clone()))?;

        let card = self
            .context
            .connect(&reader, self.config.share_mode.into(), self.config.protocols)?;
        debug!(reader = %self.reader_name, "Connected to card");
        self.card = Some(card);
        Ok(())
    }

    /// Disconnect, leaving the card as it is
    pub fn disconnect(&mut self) -> Result<(), SubsystemError> {
        self.card.take().map_or(Ok(()), |card| {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_, e)| e.into())
        })
    }

    /// Get the ATR of the connected card
    pub fn atr(&self) -> Result<Vec<u8>, SubsystemError> {
        let card = self
            .card
            .as_ref()
            .ok_or(SubsystemError::from(pcsc::Error::NoSmartcard))?;
        Ok(card.get_attribute_owned(pcsc::Attribute::AtrString)?)
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Check if the connection holds a card handle
    pub const fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    /// Raw card handle, for transmitting through the `pcsc` crate
    pub const fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }
}

impl Drop for PcscConnection {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
