//! Cards reported by card event waits

use core::fmt;

use crate::util::to_hex_string;

/// A card seen in a reader
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Card {
    reader: String,
    atr: Vec<u8>,
}

impl Card {
    /// Create a card record
    pub fn new(reader: impl Into<String>, atr: impl Into<Vec<u8>>) -> Self {
        Self {
            reader: reader.into(),
            atr: atr.into(),
        }
    }

    /// Reader holding the card
    pub fn reader(&self) -> &str {
        &self.reader
    }

    /// Answer To Reset of the card
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reader, to_hex_string(&self.atr))
    }
}
