//! Reader enumeration

use tracing::trace;

use crate::error::{RequestError, SubsystemError};
use crate::subsystem::ReaderSubsystem;

/// Lists the readers a request watches
///
/// Uses the explicit reader list when one is configured, the subsystem's
/// readers otherwise.
#[derive(Debug)]
pub struct ReaderEnumerator<'a, S> {
    subsystem: &'a S,
    explicit: Option<&'a [String]>,
}

impl<'a, S: ReaderSubsystem> ReaderEnumerator<'a, S> {
    /// Create an enumerator over `subsystem`, or over `explicit` if given
    pub const fn new(subsystem: &'a S, explicit: Option<&'a [String]>) -> Self {
        Self {
            subsystem,
            explicit,
        }
    }

    /// Current reader names
    ///
    /// A subsystem without readers gives an empty list.
    pub fn reader_names(&self) -> Result<Vec<String>, RequestError> {
        if let Some(explicit) = self.explicit {
            return Ok(explicit.to_vec());
        }

        match self.subsystem.list_reader_names() {
            Ok(names) => Ok(names),
            Err(SubsystemError::NoReadersAvailable) => {
                trace!("No readers available");
                Ok(Vec::new())
            }
            Err(e) => Err(RequestError::ListReaders(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::mock::MockSubsystem;

    #[test]
    fn test_lists_subsystem_readers() {
        let subsystem = MockSubsystem::new(["R1", "R2"]);
        let names = ReaderEnumerator::new(&subsystem, None).reader_names().unwrap();
        assert_eq!(names, ["R1", "R2"]);
    }

    #[test]
    fn test_explicit_readers_skip_subsystem() {
        let subsystem = MockSubsystem::new(["R1"]);
        subsystem.fail_listing(SubsystemError::failure(0x8010_001D, "Service not available"));

        let explicit = vec!["Virtual".to_string()];
        let names = ReaderEnumerator::new(&subsystem, Some(&explicit))
            .reader_names()
            .unwrap();
        assert_eq!(names, ["Virtual"]);
    }

    #[test]
    fn test_no_readers_is_empty() {
        let subsystem = MockSubsystem::new::<[&str; 0], &str>([]);
        subsystem.fail_listing(SubsystemError::NoReadersAvailable);

        let names = ReaderEnumerator::new(&subsystem, None).reader_names().unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_listing_failure() {
        let subsystem = MockSubsystem::new(["R1"]);
        subsystem.fail_listing(SubsystemError::failure(0x8010_001D, "Service not available"));

        let err = ReaderEnumerator::new(&subsystem, None)
            .reader_names()
            .unwrap_err();
        assert!(matches!(err, RequestError::ListReaders(_)));
        assert_eq!(err.code(), Some(0x8010_001D));
    }
}
