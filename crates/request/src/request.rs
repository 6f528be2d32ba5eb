//! Card request orchestration

use std::time::Duration;

use tracing::{debug, instrument};

use crate::card::Card;
use crate::config::RequestConfig;
use crate::deadline::DeadlineTimer;
use crate::error::RequestError;
use crate::flags::ReaderFlags;
use crate::matcher::MatchEngine;
use crate::reader::ReaderEnumerator;
use crate::service::{CardServiceFactory, PassThruCardServiceFactory};
use crate::state::{ReaderState, ReaderStateTable};
use crate::subsystem::ReaderSubsystem;
use crate::waiter::{StatusWaiter, WaitOutcome};

/// Waits for a card, or for card events, on the readers of a subsystem
///
/// Every call owns its own reader state table and deadline, so one request
/// can be waited on repeatedly.
#[derive(Debug)]
pub struct CardRequest<S, F = PassThruCardServiceFactory> {
    subsystem: S,
    config: RequestConfig,
    factory: F,
}

impl<S: ReaderSubsystem> CardRequest<S> {
    /// Create a request binding matched cards to a pass-through service
    pub const fn new(subsystem: S, config: RequestConfig) -> Self {
        Self {
            subsystem,
            config,
            factory: PassThruCardServiceFactory,
        }
    }
}

impl<S, F> CardRequest<S, F>
where
    S: ReaderSubsystem,
    F: CardServiceFactory<S::Connection>,
{
    /// Create a request binding matched cards with `factory`
    pub const fn with_factory(subsystem: S, config: RequestConfig, factory: F) -> Self {
        Self {
            subsystem,
            config,
            factory,
        }
    }

    /// Request configuration
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Reader subsystem
    pub const fn subsystem(&self) -> &S {
        &self.subsystem
    }

    /// Wait for a matching card and bind a service to it
    ///
    /// Unless only new cards are requested, a card that is already inserted
    /// is accepted by an initial non-blocking status query, before the
    /// timeout starts counting.
    #[instrument(level = "debug", skip_all, fields(new_card_only = self.config.new_card_only))]
    pub fn wait_for_card(&self) -> Result<F::Service, RequestError> {
        let enumerator = self.enumerator();
        let engine = self.engine();
        let mut waiter = StatusWaiter::new(self.subsystem.status_watch());

        let mut table = ReaderStateTable::new().reconcile(&enumerator.reader_names()?);

        // Always fold the initial state in, so cards inserted before the
        // request are not reported as new later on.
        if let WaitOutcome::Changed(states) = waiter.wait(&table, Duration::ZERO)? {
            table = table.apply(&states);
            if !self.config.new_card_only
                && let Some(found) =
                    first_match::<S::Connection, F>(&engine, &states, ReaderFlags::PRESENT)
            {
                debug!(reader = found.name(), "Card already inserted");
                return self.bind(found);
            }
        }

        let accept = if self.config.new_card_only {
            ReaderFlags::PRESENT | ReaderFlags::CHANGED
        } else {
            ReaderFlags::PRESENT
        };

        let mut deadline = DeadlineTimer::started(self.config.timeout);
        loop {
            table = table.reconcile(&enumerator.reader_names()?);

            if let WaitOutcome::Changed(states) =
                waiter.wait(&table, self.config.polling_interval)?
            {
                table = table.apply(&states);
                if let Some(found) = first_match::<S::Connection, F>(&engine, &states, accept) {
                    deadline.cancel();
                    debug!(reader = found.name(), "Card found");
                    return self.bind(found);
                }
            }

            if deadline.has_fired() {
                debug!(timeout = ?self.config.timeout, "Card request timed out");
                return Err(RequestError::Timeout);
            }
        }
    }

    /// Wait for cards to be inserted
    ///
    /// Returns every reader whose card appeared in the same round. Readers
    /// holding a card when the wait starts count as insertions. Card removals
    /// are not reported and do not end the wait.
    #[instrument(level = "debug", skip_all)]
    pub fn wait_for_card_event(&self) -> Result<Vec<Card>, RequestError> {
        let enumerator = self.enumerator();
        let mut waiter = StatusWaiter::new(self.subsystem.status_watch());
        let mut table = ReaderStateTable::new();
        let mut deadline = DeadlineTimer::new(self.config.timeout);

        loop {
            deadline.start();
            table = table.reconcile(&enumerator.reader_names()?);

            if let WaitOutcome::Changed(states) =
                waiter.wait(&table, self.config.polling_interval)?
            {
                table = table.apply(&states);
                let cards: Vec<Card> = states
                    .iter()
                    .filter(|s| s.flags().contains(ReaderFlags::PRESENT | ReaderFlags::CHANGED))
                    .map(|s| Card::new(s.name(), s.atr()))
                    .collect();

                if !cards.is_empty() {
                    deadline.cancel();
                    debug!(count = cards.len(), "Card event");
                    return Ok(cards);
                }
            }

            if deadline.has_fired() {
                debug!(timeout = ?self.config.timeout, "Card event wait timed out");
                return Err(RequestError::Timeout);
            }
        }
    }

    fn enumerator(&self) -> ReaderEnumerator<'_, S> {
        ReaderEnumerator::new(&self.subsystem, self.config.readers.as_deref())
    }

    fn engine(&self) -> MatchEngine<'_, F> {
        MatchEngine::new(
            &*self.config.card_type,
            &self.factory,
            &self.config.service_kind,
        )
    }

    fn bind(&self, found: &ReaderState) -> Result<F::Service, RequestError> {
        let connection =
            self.subsystem
                .open_connection(found.name())
                .map_err(|source| RequestError::Connect {
                    reader: found.name().to_string(),
                    source,
                })?;
        self.factory.bind(connection)
    }
}

/// First reader in enumeration order with all `required` flags and an
/// accepted card
fn first_match<'s, C, F>(
    engine: &MatchEngine<'_, F>,
    states: &'s [ReaderState],
    required: ReaderFlags,
) -> Option<&'s ReaderState>
where
    F: CardServiceFactory<C>,
{
    states
        .iter()
        .filter(|s| s.flags().contains(required))
        .find(|s| engine.accepts::<C>(s.name(), s.atr()))
}
