//! Acceptance of candidate cards

use tracing::trace;

use crate::card_type::CardType;
use crate::service::CardServiceFactory;

/// Applies the card type and the service capability check to a candidate
///
/// The card type is checked first; the factory is only asked when the type
/// matched.
pub struct MatchEngine<'a, F> {
    card_type: &'a dyn CardType,
    factory: &'a F,
    service_kind: &'a str,
}

impl<'a, F> MatchEngine<'a, F> {
    /// Create an engine for one request
    pub const fn new(card_type: &'a dyn CardType, factory: &'a F, service_kind: &'a str) -> Self {
        Self {
            card_type,
            factory,
            service_kind,
        }
    }

    /// Whether the card with `atr` in `reader` is accepted
    pub fn accepts<C>(&self, reader: &str, atr: &[u8]) -> bool
    where
        F: CardServiceFactory<C>,
    {
        if !self.card_type.matches(atr, reader) {
            trace!(reader, card_type = self.card_type.name(), "Card type mismatch");
            return false;
        }
        if !self.factory.supports(self.service_kind) {
            trace!(reader, kind = self.service_kind, "Service kind not supported");
            return false;
        }
        true
    }
}

impl<F> core::fmt::Debug for MatchEngine<'_, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("card_type", &self.card_type.name())
            .field("service_kind", &self.service_kind)
            .finish_non_exhaustive()
    }
}
