//! Application facade - wires the engine's components together.

use crate::cart::CartService;
use crate::config::Config;
use crate::error::{Result, TicketingError};
use crate::generator::TicketGenerator;
use crate::inventory::{InMemoryTicketStore, InventorySummary};
use crate::metrics;
use crate::pricing::PricingPolicy;
use crate::reservation::ReservationManager;
use boxoffice_core::capacity::CapacityProvider;
use boxoffice_core::environment::Clock;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::EventId;
use std::sync::Arc;

/// The ticket inventory engine.
///
/// Owns one shared [`PricingPolicy`] and hands the same store, capacity
/// provider and clock to every component.
#[derive(Clone)]
pub struct BoxOffice {
    /// Ticket generation
    pub generator: TicketGenerator,
    /// Lifecycle transitions
    pub reservations: ReservationManager,
    /// Carts and checkout
    pub carts: CartService,
    /// Pricing rules
    pub pricing: Arc<PricingPolicy>,
    store: Arc<dyn TicketStore>,
    config: Config,
}

impl BoxOffice {
    /// Wire the engine over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the pricing schedule is unusable.
    pub fn new(
        config: Config,
        store: Arc<dyn TicketStore>,
        capacity: Arc<dyn CapacityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.pricing.validate().map_err(TicketingError::Validation)?;

        let pricing = Arc::new(PricingPolicy::new(config.pricing.clone()));
        let reservations = ReservationManager::new(
            Arc::clone(&store),
            Arc::clone(&capacity),
            Arc::clone(&pricing),
            Arc::clone(&clock),
        );
        let generator = TicketGenerator::new(
            Arc::clone(&store),
            capacity,
            Arc::clone(&pricing),
            Arc::clone(&clock),
        )
        .sharing_locks(reservations.lock_table());
        let carts = CartService::new(reservations.clone(), clock);

        tracing::info!(
            vip_markup_percent = config.pricing.vip_markup_percent,
            metrics_enabled = config.service.metrics_enabled,
            "Box office initialized"
        );

        Ok(Self {
            generator,
            reservations,
            carts,
            pricing,
            store,
            config,
        })
    }

    /// Wire the engine over a fresh [`InMemoryTicketStore`].
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the pricing schedule is unusable.
    pub fn in_memory(
        config: Config,
        capacity: Arc<dyn CapacityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::new(config, Arc::new(InMemoryTicketStore::new()), capacity, clock)
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Current availability for an event.
    ///
    /// Also refreshes the `boxoffice_tickets_available` gauge.
    ///
    /// # Errors
    ///
    /// `Store` if the inventory cannot be read.
    pub async fn availability(&self, event_id: EventId) -> Result<InventorySummary> {
        let tickets = self.store.find_by_event(event_id).await?;
        let summary = InventorySummary::for_event(event_id, &tickets);
        metrics::update_tickets_available(event_id, summary.available());
        Ok(summary)
    }
}
