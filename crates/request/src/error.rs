//! Error types for card requests

/// Errors reported by the reader subsystem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubsystemError {
    /// No reader changed state within the timeout
    #[error("Status wait timed out")]
    Timeout,

    /// The subsystem knows no readers
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader name cannot be passed to the subsystem
    #[error("Invalid reader name: {0:?}")]
    InvalidReaderName(String),

    /// Any other failure, with the raw subsystem code
    #[error("{message} (0x{code:08X})")]
    Failure {
        /// Raw status code
        code: u32,
        /// Human readable message for the code
        message: String,
    },
}

impl SubsystemError {
    /// Create a failure from a raw code and its message
    pub fn failure<S: Into<String>>(code: u32, message: S) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Get the raw status code, if this error carries one
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::Failure { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(feature = "pcsc")]
impl From<pcsc::Error> for SubsystemError {
    fn from(err: pcsc::Error) -> Self {
        match err {
            pcsc::Error::Timeout => Self::Timeout,
            pcsc::Error::NoReadersAvailable => Self::NoReadersAvailable,
            other => Self::Failure {
                message: other.to_string(),
                code: other as u32,
            },
        }
    }
}

/// Errors raised by [`CardRequest`](crate::CardRequest)
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The deadline elapsed without an accepted card
    #[error("Time-out in card request")]
    Timeout,

    /// Reader enumeration failed
    #[error("Failed to list readers: {0}")]
    ListReaders(#[source] SubsystemError),

    /// The status change wait failed
    #[error("Failed to get status change: {0}")]
    StatusChange(#[source] SubsystemError),

    /// Opening a connection to the matched reader failed
    #[error("Failed to connect to reader {reader}: {source}")]
    Connect {
        /// Reader the card was found in
        reader: String,
        /// Underlying subsystem error
        #[source]
        source: SubsystemError,
    },

    /// The card service factory refused the connection
    #[error("Failed to bind card service: {0}")]
    Bind(String),
}

impl RequestError {
    /// Whether this is the expected deadline error
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Get the underlying subsystem code, if any
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::ListReaders(e) | Self::StatusChange(e) | Self::Connect { source: e, .. } => {
                e.code()
            }
            Self::Timeout | Self::Bind(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_and_code() {
        let err = SubsystemError::failure(0x8010_001D, "Service not available");
        assert_eq!(err.code(), Some(0x8010_001D));
        assert_eq!(err.to_string(), "Service not available (0x8010001D)");

        let err = RequestError::StatusChange(err);
        assert_eq!(err.code(), Some(0x8010_001D));
        assert!(err.to_string().starts_with("Failed to get status change"));
    }

    #[test]
    fn test_timeout_has_no_code() {
        assert!(RequestError::Timeout.is_timeout());
        assert_eq!(RequestError::Timeout.code(), None);
        assert_eq!(SubsystemError::Timeout.code(), None);
    }
}
