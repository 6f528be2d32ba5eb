//! Status change waits over a reader state table

use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::error::{RequestError, SubsystemError};
use crate::state::{ReaderState, ReaderStateTable};
use crate::subsystem::StatusWatch;

/// Result of one status change wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Readers that changed or hold a card, in table order
    Changed(Vec<ReaderState>),
    /// Nothing changed within the timeout
    TimedOut,
}

/// Issues status change waits for one request
#[derive(Debug)]
pub struct StatusWaiter<W> {
    watch: W,
}

impl<W: StatusWatch> StatusWaiter<W> {
    /// Wrap a status watch
    pub const fn new(watch: W) -> Self {
        Self { watch }
    }

    /// Wait up to `timeout` for a reader in `table` to change
    ///
    /// An empty table is never handed to the subsystem; the waiter sleeps for
    /// `timeout` instead and reports [`WaitOutcome::TimedOut`].
    pub fn wait(
        &mut self,
        table: &ReaderStateTable,
        timeout: Duration,
    ) -> Result<WaitOutcome, RequestError> {
        if table.is_empty() {
            trace!(?timeout, "No readers to watch, sleeping");
            thread::sleep(timeout);
            return Ok(WaitOutcome::TimedOut);
        }

        match self.watch.get_status_change(timeout, table) {
            Ok(states) => {
                let updated: Vec<ReaderState> = states
                    .into_iter()
                    .filter(|s| s.flags().is_changed() || s.is_present())
                    .collect();
                for state in &updated {
                    trace!(reader = state.name(), flags = ?state.flags(), "Reader status");
                }
                Ok(WaitOutcome::Changed(updated))
            }
            Err(SubsystemError::Timeout) => Ok(WaitOutcome::TimedOut),
            Err(e) => {
                warn!(error = %e, "Status change wait failed");
                Err(RequestError::StatusChange(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::ReaderFlags;
    use crate::subsystem::ReaderSubsystem;
    use crate::subsystem::mock::MockSubsystem;
    use std::time::Instant;

    const ATR: [u8; 4] = [0x3B, 0x02, 0x14, 0x50];

    #[test]
    fn test_first_wait_reports_all_readers() {
        let subsystem = MockSubsystem::new(["R1", "R2"]);
        subsystem.insert_card("R2", &ATR);
        let mut waiter = StatusWaiter::new(subsystem.status_watch());

        let table = ReaderStateTable::new().reconcile(&["R1", "R2"]);
        let WaitOutcome::Changed(states) = waiter.wait(&table, Duration::ZERO).unwrap() else {
            panic!("expected a change");
        };

        assert_eq!(states.len(), 2);
        assert!(states[0].flags().contains(ReaderFlags::EMPTY | ReaderFlags::CHANGED));
        assert!(states[1].flags().contains(ReaderFlags::PRESENT | ReaderFlags::CHANGED));
        assert_eq!(states[1].atr(), ATR);
    }

    #[test]
    fn test_unchanged_table_times_out() {
        let subsystem = MockSubsystem::new(["R1"]);
        let mut waiter = StatusWaiter::new(subsystem.status_watch());

        let table = ReaderStateTable::new().reconcile(&["R1"]);
        let WaitOutcome::Changed(states) = waiter.wait(&table, Duration::ZERO).unwrap() else {
            panic!("expected a change");
        };
        let table = table.apply(&states);

        let start = Instant::now();
        let outcome = waiter.wait(&table, Duration::from_millis(30)).unwrap();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_present_unchanged_reader_is_reported() {
        let subsystem = MockSubsystem::new(["R1", "R2"]);
        subsystem.insert_card("R1", &ATR);
        let mut waiter = StatusWaiter::new(subsystem.status_watch());

        let table = ReaderStateTable::new().reconcile(&["R1", "R2"]);
        let WaitOutcome::Changed(states) = waiter.wait(&table, Duration::ZERO).unwrap() else {
            panic!("expected a change");
        };
        let table = table.apply(&states);

        subsystem.insert_card("R2", &ATR);
        let WaitOutcome::Changed(states) = waiter.wait(&table, Duration::from_secs(1)).unwrap()
        else {
            panic!("expected a change");
        };

        assert_eq!(states.len(), 2);
        assert!(!states[0].flags().is_changed() && states[0].is_present());
        assert!(states[1].flags().is_changed() && states[1].is_present());
    }

    #[test]
    fn test_empty_table_sleeps_without_subsystem_call() {
        let subsystem = MockSubsystem::default();
        let mut waiter = StatusWaiter::new(subsystem.status_watch());

        let start = Instant::now();
        let outcome = waiter
            .wait(&ReaderStateTable::new(), Duration::from_millis(40))
            .unwrap();

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(subsystem.status_calls(), 0);
    }

    #[test]
    fn test_subsystem_failure() {
        let subsystem = MockSubsystem::new(["R1"]);
        subsystem.fail_status(SubsystemError::failure(0x8010_0017, "Reader unavailable"));
        let mut waiter = StatusWaiter::new(subsystem.status_watch());

        let table = ReaderStateTable::new().reconcile(&["R1"]);
        let err = waiter.wait(&table, Duration::ZERO).unwrap_err();
        assert!(matches!(err, RequestError::StatusChange(_)));
        assert_eq!(err.code(), Some(0x8010_0017));
    }
}
