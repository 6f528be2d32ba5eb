//! In-memory reader subsystem for tests

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::SubsystemError;
use crate::flags::ReaderFlags;
use crate::state::{ReaderState, ReaderStateTable};
use crate::subsystem::{ReaderSubsystem, StatusWatch};

/// Code reported when connecting to an empty reader
pub(crate) const NO_SMARTCARD: u32 = 0x8010_000C;

const STEP: Duration = Duration::from_millis(2);

#[derive(Debug, Clone)]
struct MockReader {
    name: String,
    card: Option<Vec<u8>>,
    events: u16,
}

impl MockReader {
    fn flags(&self) -> ReaderFlags {
        let state = if self.card.is_some() {
            ReaderFlags::PRESENT
        } else {
            ReaderFlags::EMPTY
        };
        ReaderFlags::from_bits(state.bits() | (u32::from(self.events) << 16))
    }
}

#[derive(Debug, Default)]
struct Inner {
    readers: Vec<MockReader>,
    list_error: Option<SubsystemError>,
    status_error: Option<SubsystemError>,
    status_calls: usize,
    tables: Vec<Vec<String>>,
    opened: Vec<String>,
}

/// Simulated readers that tests can plug, unplug and fill from any thread
#[derive(Debug, Clone, Default)]
pub(crate) struct MockSubsystem {
    inner: Arc<Mutex<Inner>>,
}

/// Connection handed out by [`MockSubsystem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockConnection {
    pub(crate) reader: String,
    pub(crate) atr: Vec<u8>,
}

impl MockSubsystem {
    /// Create a subsystem with empty readers
    pub(crate) fn new<I, S>(readers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subsystem = Self::default();
        for name in readers {
            subsystem.add_reader(name);
        }
        subsystem
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub(crate) fn add_reader(&self, name: impl Into<String>) {
        self.lock().readers.push(MockReader {
            name: name.into(),
            card: None,
            events: 0,
        });
    }

    pub(crate) fn remove_reader(&self, name: &str) {
        self.lock().readers.retain(|r| r.name != name);
    }

    pub(crate) fn insert_card(&self, reader: &str, atr: &[u8]) {
        let mut inner = self.lock();
        if let Some(r) = inner.readers.iter_mut().find(|r| r.name == reader) {
            r.card = Some(atr.to_vec());
            r.events += 1;
        }
    }

    pub(crate) fn remove_card(&self, reader: &str) {
        let mut inner = self.lock();
        if let Some(r) = inner.readers.iter_mut().find(|r| r.name == reader) {
            r.card = None;
            r.events += 1;
        }
    }

    pub(crate) fn fail_listing(&self, err: SubsystemError) {
        self.lock().list_error = Some(err);
    }

    pub(crate) fn fail_status(&self, err: SubsystemError) {
        self.lock().status_error = Some(err);
    }

    /// Number of status change calls that reached the subsystem
    pub(crate) fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    /// Reader names of every table handed to a status change call
    pub(crate) fn tables(&self) -> Vec<Vec<String>> {
        self.lock().tables.clone()
    }

    /// Readers a connection was opened to
    pub(crate) fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    fn poll(&self, table: &ReaderStateTable) -> Option<Vec<ReaderState>> {
        let inner = self.lock();
        let mut changed = false;

        let states = table
            .iter()
            .map(|entry| {
                let (actual, atr) = inner
                    .readers
                    .iter()
                    .find(|r| r.name == entry.name())
                    .map_or((ReaderFlags::UNKNOWN, Vec::new()), |r| {
                        (r.flags(), r.card.clone().unwrap_or_default())
                    });

                if actual == entry.flags().without_changed() {
                    ReaderState::new(entry.name(), actual, atr)
                } else {
                    changed = true;
                    ReaderState::new(entry.name(), actual | ReaderFlags::CHANGED, atr)
                }
            })
            .collect();

        changed.then_some(states)
    }
}

impl ReaderSubsystem for MockSubsystem {
    type Watch = MockWatch;
    type Connection = MockConnection;

    fn list_reader_names(&self) -> Result<Vec<String>, SubsystemError> {
        let inner = self.lock();
        if let Some(err) = &inner.list_error {
            return Err(err.clone());
        }
        Ok(inner.readers.iter().map(|r| r.name.clone()).collect())
    }

    fn status_watch(&self) -> MockWatch {
        MockWatch {
            subsystem: self.clone(),
        }
    }

    fn open_connection(&self, reader: &str) -> Result<MockConnection, SubsystemError> {
        let mut inner = self.lock();
        let atr = inner
            .readers
            .iter()
            .find(|r| r.name == reader)
            .and_then(|r| r.card.clone())
            .ok_or_else(|| SubsystemError::failure(NO_SMARTCARD, "No smart card inserted"))?;
        inner.opened.push(reader.to_string());
        Ok(MockConnection {
            reader: reader.to_string(),
            atr,
        })
    }
}

/// Status watch of [`MockSubsystem`]
#[derive(Debug)]
pub(crate) struct MockWatch {
    subsystem: MockSubsystem,
}

impl StatusWatch for MockWatch {
    fn get_status_change(
        &mut self,
        timeout: Duration,
        table: &ReaderStateTable,
    ) -> Result<Vec<ReaderState>, SubsystemError> {
        {
            let mut inner = self.subsystem.lock();
            inner.status_calls += 1;
            inner.tables.push(table.names().map(str::to_string).collect());
            if let Some(err) = &inner.status_error {
                return Err(err.clone());
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(states) = self.subsystem.poll(table) {
                return Ok(states);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SubsystemError::Timeout);
            }
            thread::sleep(STEP.min(deadline - now));
        }
    }
}
