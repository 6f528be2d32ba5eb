//! Reader state table kept across polling rounds

use tracing::trace;

use crate::flags::ReaderFlags;

/// Last known state of one reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderState {
    name: String,
    flags: ReaderFlags,
    atr: Vec<u8>,
}

impl ReaderState {
    /// State of a reader seen for the first time
    pub fn unaware(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: ReaderFlags::UNAWARE,
            atr: Vec::new(),
        }
    }

    /// Create a state with known flags and ATR
    pub fn new(name: impl Into<String>, flags: ReaderFlags, atr: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            flags,
            atr: atr.into(),
        }
    }

    /// Reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flags from the last round
    pub const fn flags(&self) -> ReaderFlags {
        self.flags
    }

    /// ATR of the inserted card, empty when there is none
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    /// Whether a card is inserted
    pub const fn is_present(&self) -> bool {
        self.flags.is_present()
    }
}

/// Reader states in enumeration order, unique by name
///
/// Tables are never edited in place. Every round produces a new table from
/// the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderStateTable {
    entries: Vec<ReaderState>,
}

impl ReaderStateTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build the table for the current reader enumeration
    ///
    /// Known readers keep their flags and ATR, new readers start out
    /// `UNAWARE`, readers missing from `names` are dropped.
    pub fn reconcile<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let mut entries: Vec<ReaderState> = Vec::with_capacity(names.len());

        for name in names.iter().map(AsRef::as_ref) {
            if entries.iter().any(|e| e.name == name) {
                continue;
            }
            match self.get(name) {
                Some(known) => entries.push(known.clone()),
                None => {
                    trace!(reader = name, "Reader added to state table");
                    entries.push(ReaderState::unaware(name));
                }
            }
        }

        for gone in self
            .entries
            .iter()
            .filter(|old| !entries.iter().any(|e| e.name == old.name))
        {
            trace!(reader = gone.name(), "Reader removed from state table");
        }

        Self { entries }
    }

    /// Build a table with the flags and ATRs of `updates` folded in
    ///
    /// Updates for readers that are not in the table are ignored.
    pub fn apply(&self, updates: &[ReaderState]) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                updates
                    .iter()
                    .find(|u| u.name == entry.name)
                    .unwrap_or(entry)
                    .clone()
            })
            .collect();
        Self { entries }
    }

    /// Look up a reader by name
    pub fn get(&self, name: &str) -> Option<&ReaderState> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Iterate over the entries in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &ReaderState> {
        self.entries.iter()
    }

    /// Reader names in enumeration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ReaderState::name)
    }

    /// Number of readers
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no readers
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReaderStateTable {
    type Item = &'a ReaderState;
    type IntoIter = core::slice::Iter<'a, ReaderState>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
