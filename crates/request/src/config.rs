//! Configuration options for card requests

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "pcsc")]
use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};

use crate::card_type::{AnyCardType, CardType};

/// Interval of a single status change wait
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(300);

/// Overall time budget of a request
pub const DEFAULT_TIMEOUT: Timeout = Timeout::After(Duration::from_secs(1));

/// Service kind requested from the card service factory by default
pub const DEFAULT_SERVICE_KIND: &str = "pass-through";

/// How long a request may wait in total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Wait until a card shows up
    Infinite,
    /// Give up after the duration
    After(Duration),
}

impl Timeout {
    /// Timeout of whole seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self::After(Duration::from_secs(secs))
    }

    /// Timeout in milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self::After(Duration::from_millis(millis))
    }

    /// Timeout of fractional seconds, truncated to whole milliseconds
    ///
    /// Negative and NaN values give a zero timeout.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_infinite() && secs > 0.0 {
            return Self::Infinite;
        }
        let millis = if secs.is_nan() || secs <= 0.0 {
            0
        } else {
            (secs * 1000.0) as u64
        };
        Self::from_millis(millis)
    }

    /// `None` waits forever, `Some(secs)` gives up after `secs` seconds
    pub const fn from_option_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::from_secs(secs),
            None => Self::Infinite,
        }
    }

    /// Duration of a finite timeout
    pub const fn duration(&self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::After(d) => Some(*d),
        }
    }

    /// Whether this timeout never expires
    pub const fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl Default for Timeout {
    fn default() -> Self {
        DEFAULT_TIMEOUT
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Infinite, Self::After)
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self::After(duration)
    }
}

/// Configuration of a card request
///
/// Built once and read-only while the request waits.
#[derive(Clone)]
pub struct RequestConfig {
    /// Only accept cards inserted after the request started
    pub new_card_only: bool,

    /// Readers to watch, all readers when `None`
    pub readers: Option<Vec<String>>,

    /// Predicate the card must satisfy
    pub card_type: Arc<dyn CardType>,

    /// Service kind the card service factory must support
    pub service_kind: String,

    /// Overall time budget
    pub timeout: Timeout,

    /// Timeout of each status change wait
    pub polling_interval: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            new_card_only: false,
            readers: None,
            card_type: Arc::new(AnyCardType),
            service_kind: DEFAULT_SERVICE_KIND.to_string(),
            timeout: DEFAULT_TIMEOUT,
            polling_interval: DEFAULT_POLLING_INTERVAL,
        }
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("new_card_only", &self.new_card_only)
            .field("readers", &self.readers)
            .field("card_type", &self.card_type.name())
            .field("service_kind", &self.service_kind)
            .field("timeout", &self.timeout)
            .field("polling_interval", &self.polling_interval)
            .finish()
    }
}

impl RequestConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether only newly inserted cards are accepted
    pub const fn with_new_card_only(mut self, new_card_only: bool) -> Self {
        self.new_card_only = new_card_only;
        self
    }

    /// Restrict the request to the given readers
    pub fn with_readers<I, S>(mut self, readers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.readers = Some(readers.into_iter().map(Into::into).collect());
        self
    }

    /// Set the card type predicate
    pub fn with_card_type<T: CardType + 'static>(mut self, card_type: T) -> Self {
        self.card_type = Arc::new(card_type);
        self
    }

    /// Set the service kind requested from the factory
    pub fn with_service_kind(mut self, kind: impl Into<String>) -> Self {
        self.service_kind = kind.into();
        self
    }

    /// Set the overall timeout
    pub const fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling interval
    pub const fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }
}

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
    /// Direct connection to the reader
    Direct,
}

#[cfg(feature = "pcsc")]
impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Options used when connecting to a matched card
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Preferred protocols for card communication
    #[cfg(feature = "pcsc")]
    pub protocols: PcscProtocols,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            #[cfg(feature = "pcsc")]
            protocols: PcscProtocols::ANY,
        }
    }
}

impl ConnectConfig {
    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    #[cfg(feature = "pcsc")]
    pub const fn with_protocols(mut self, protocols: PcscProtocols) -> Self {
        self.protocols = protocols;
        self
    }
}
