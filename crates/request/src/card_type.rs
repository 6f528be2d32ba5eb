//! Card type predicates

use core::fmt;

use crate::util::to_hex_string;

/// Decides whether a card is of the requested type
pub trait CardType: Send + Sync {
    /// Check the card with the given ATR in `reader`
    fn matches(&self, atr: &[u8], reader: &str) -> bool;

    /// Short name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> CardType for F
where
    F: Fn(&[u8], &str) -> bool + Send + Sync,
{
    fn matches(&self, atr: &[u8], reader: &str) -> bool {
        self(atr, reader)
    }
}

/// Accepts any card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyCardType;

impl CardType for AnyCardType {
    fn matches(&self, _atr: &[u8], _reader: &str) -> bool {
        true
    }

    fn name(&self) -> &str {
        "any"
    }
}

/// Error parsing an ATR pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AtrPatternError {
    /// The pattern has no bytes
    #[error("ATR pattern is empty")]
    Empty,

    /// A byte does not have exactly two nibbles
    #[error("Invalid ATR pattern byte {0:?}")]
    InvalidByte(String),

    /// Mask and ATR lengths differ
    #[error("ATR mask has {mask} bytes, ATR has {atr}")]
    MaskLength {
        /// ATR length
        atr: usize,
        /// Mask length
        mask: usize,
    },
}

/// Accepts cards whose ATR equals a template under a mask
///
/// Only the bits set in the mask are compared, and the ATR must have the
/// template's length.
#[derive(Clone, PartialEq, Eq)]
pub struct AtrCardType {
    atr: Vec<u8>,
    mask: Vec<u8>,
}

impl AtrCardType {
    /// Match one exact ATR
    pub fn new(atr: impl Into<Vec<u8>>) -> Self {
        let atr = atr.into();
        let mask = vec![0xFF; atr.len()];
        Self { atr, mask }
    }

    /// Match an ATR under a mask of the same length
    pub fn with_mask(
        atr: impl Into<Vec<u8>>,
        mask: impl Into<Vec<u8>>,
    ) -> Result<Self, AtrPatternError> {
        let (atr, mask) = (atr.into(), mask.into());
        if atr.len() != mask.len() {
            return Err(AtrPatternError::MaskLength {
                atr: atr.len(),
                mask: mask.len(),
            });
        }
        Ok(Self { atr, mask })
    }

    /// Parse a hex template where `?` marks a don't-care nibble
    ///
    /// Bytes may be separated by spaces or colons, or written back to back:
    /// `"3B 8? 80 01"`, `"3B:8?:80:01"` and `"3B8?8001"` are equivalent.
    pub fn from_pattern(pattern: &str) -> Result<Self, AtrPatternError> {
        let digits: Vec<char> = pattern
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();

        if digits.is_empty() {
            return Err(AtrPatternError::Empty);
        }
        if digits.len() % 2 != 0 {
            return Err(AtrPatternError::InvalidByte(pattern.trim().to_string()));
        }

        let mut atr = Vec::with_capacity(digits.len() / 2);
        let mut mask = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let (hi, hi_mask) = nibble(pair[0]).ok_or_else(|| invalid(pair))?;
            let (lo, lo_mask) = nibble(pair[1]).ok_or_else(|| invalid(pair))?;
            atr.push((hi << 4) | lo);
            mask.push((hi_mask << 4) | lo_mask);
        }

        Ok(Self { atr, mask })
    }

    /// ATR template
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    /// Comparison mask
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }
}

fn nibble(c: char) -> Option<(u8, u8)> {
    match c {
        '?' => Some((0, 0)),
        c => c.to_digit(16).map(|d| (d as u8, 0x0F)),
    }
}

fn invalid(pair: &[char]) -> AtrPatternError {
    AtrPatternError::InvalidByte(pair.iter().collect())
}

impl CardType for AtrCardType {
    fn matches(&self, atr: &[u8], _reader: &str) -> bool {
        atr.len() == self.atr.len()
            && atr
                .iter()
                .zip(&self.atr)
                .zip(&self.mask)
                .all(|((a, t), m)| a & m == t & m)
    }

    fn name(&self) -> &str {
        "atr"
    }
}

impl fmt::Debug for AtrCardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtrCardType")
            .field("atr", &to_hex_string(&self.atr))
            .field("mask", &to_hex_string(&self.mask))
            .finish()
    }
}
