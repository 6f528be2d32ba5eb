//! Reader state flags

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Reader state bitmask as reported by a status change wait
///
/// The low 16 bits carry the standard PC/SC state bits, the high 16 bits the
/// reader's event counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReaderFlags(u32);

impl ReaderFlags {
    /// Nothing is known about the reader yet
    pub const UNAWARE: Self = Self(0x0000);
    /// The reader should be ignored
    pub const IGNORE: Self = Self(0x0001);
    /// The state differs from the one the caller passed in
    pub const CHANGED: Self = Self(0x0002);
    /// The reader is unknown to the subsystem
    pub const UNKNOWN: Self = Self(0x0004);
    /// The reader state is unavailable
    pub const UNAVAILABLE: Self = Self(0x0008);
    /// No card in the reader
    pub const EMPTY: Self = Self(0x0010);
    /// A card is inserted
    pub const PRESENT: Self = Self(0x0020);
    /// The card ATR matches a target
    pub const ATRMATCH: Self = Self(0x0040);
    /// The card is in exclusive use
    pub const EXCLUSIVE: Self = Self(0x0080);
    /// The card is in use
    pub const INUSE: Self = Self(0x0100);
    /// The card does not answer
    pub const MUTE: Self = Self(0x0200);
    /// The card is not powered
    pub const UNPOWERED: Self = Self(0x0400);

    const STATE_MASK: u32 = 0x0000_FFFF;

    /// Create flags from raw bits, event counter included
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits, event counter included
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a card is inserted
    pub const fn is_present(self) -> bool {
        self.contains(Self::PRESENT)
    }

    /// Whether the state changed since the previous round
    pub const fn is_changed(self) -> bool {
        self.contains(Self::CHANGED)
    }

    /// The same flags with `CHANGED` cleared
    ///
    /// This is the form passed back as the current state of the next wait.
    pub const fn without_changed(self) -> Self {
        Self(self.0 & !Self::CHANGED.0)
    }

    /// Event counter kept in the high 16 bits
    pub const fn event_count(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// State bits without the event counter
    pub const fn state(self) -> Self {
        Self(self.0 & Self::STATE_MASK)
    }
}

impl BitOr for ReaderFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ReaderFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ReaderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ReaderFlags, &str); 11] = [
            (ReaderFlags::IGNORE, "IGNORE"),
            (ReaderFlags::CHANGED, "CHANGED"),
            (ReaderFlags::UNKNOWN, "UNKNOWN"),
            (ReaderFlags::UNAVAILABLE, "UNAVAILABLE"),
            (ReaderFlags::EMPTY, "EMPTY"),
            (ReaderFlags::PRESENT, "PRESENT"),
            (ReaderFlags::ATRMATCH, "ATRMATCH"),
            (ReaderFlags::EXCLUSIVE, "EXCLUSIVE"),
            (ReaderFlags::INUSE, "INUSE"),
            (ReaderFlags::MUTE, "MUTE"),
            (ReaderFlags::UNPOWERED, "UNPOWERED"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "UNAWARE")?;
        } else {
            write!(f, "{}", names.join(" | "))?;
        }
        if self.event_count() != 0 {
            write!(f, " (events: {})", self.event_count())?;
        }
        Ok(())
    }
}

#[cfg(feature = "pcsc")]
impl From<pcsc::State> for ReaderFlags {
    fn from(state: pcsc::State) -> Self {
        Self((state.bits() as u32) & Self::STATE_MASK)
    }
}
