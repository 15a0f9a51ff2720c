//! Ticket generation from venue capacity.
//!
//! Generation is all-or-nothing: a request that exceeds the venue's free seats
//! or remaining general-admission places fails before anything is persisted,
//! and a failure after persisting (a seat link refused, a store error) undoes
//! every write made so far.
//!
//! The one exception is a ticket a cart managed to hold between being
//! persisted and the rollback. Rollback takes each ticket's lock and keeps any
//! ticket that is no longer AVAILABLE, together with its seat.
//!
//! Generation is not idempotent. Calling it twice for the same event creates a
//! second batch of inventory; the event lifecycle owning this engine decides
//! when inventory is generated.

use crate::error::{Result, TicketingError};
use crate::metrics;
use crate::pricing::PricingPolicy;
use crate::reservation::LockTable;
use boxoffice_core::capacity::{CapacityProvider, CapacityProviderError};
use boxoffice_core::environment::Clock;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::{
    EventInfo, Money, NewTicket, SeatId, SeatRef, Ticket, TicketId, TicketStatus, TicketTier,
};
use serde::{Deserialize, Serialize};
use std::iter;
use std::sync::Arc;

/// How many tickets of each tier to create, and from what base price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Price every tier is derived from. Zero makes a free event.
    pub base_price: Money,
    /// EARLY_BIRD tickets, assigned first
    pub early_bird: u32,
    /// VIP tickets, assigned next
    pub vip: u32,
    /// STANDARD tickets, assigned last
    pub standard: u32,
}

impl GenerationRequest {
    /// Creates a request
    #[must_use]
    pub const fn new(base_price: Money, early_bird: u32, vip: u32, standard: u32) -> Self {
        Self {
            base_price,
            early_bird,
            vip,
            standard,
        }
    }

    /// Total tickets requested, `None` on overflow
    #[must_use]
    pub const fn total(&self) -> Option<u32> {
        match self.early_bird.checked_add(self.vip) {
            Some(partial) => partial.checked_add(self.standard),
            None => None,
        }
    }

    /// Count for one tier
    #[must_use]
    pub const fn count(&self, tier: TicketTier) -> u32 {
        match tier {
            TicketTier::EarlyBird => self.early_bird,
            TicketTier::Vip => self.vip,
            TicketTier::Standard => self.standard,
        }
    }

    /// One tier per ticket, in assignment order
    fn tier_sequence(&self) -> impl Iterator<Item = TicketTier> + '_ {
        TicketTier::ALL
            .into_iter()
            .flat_map(move |tier| iter::repeat_n(tier, self.count(tier) as usize))
    }

    fn validate(&self) -> Result<u32> {
        self.total().ok_or_else(|| {
            TicketingError::Validation("Total ticket count overflows".to_string())
        })
    }
}

/// Creates an event's ticket pool from the venue's capacity
#[derive(Clone)]
pub struct TicketGenerator {
    store: Arc<dyn TicketStore>,
    capacity: Arc<dyn CapacityProvider>,
    pricing: Arc<PricingPolicy>,
    clock: Arc<dyn Clock>,
    locks: Arc<LockTable>,
}

impl TicketGenerator {
    /// Creates a generator over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        capacity: Arc<dyn CapacityProvider>,
        pricing: Arc<PricingPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            capacity,
            pricing,
            clock,
            locks: Arc::new(LockTable::default()),
        }
    }

    /// Roll back under the same ticket locks as `reservations` uses
    pub(crate) fn sharing_locks(mut self, locks: Arc<LockTable>) -> Self {
        self.locks = locks;
        self
    }

    /// Generate and persist the ticket pool for `event`.
    ///
    /// Seat-mapped venues get one ticket per free seat taken in ascending seat id
    /// order, tiers assigned EARLY_BIRD, then VIP, then STANDARD. General-admission
    /// venues get seatless tickets with the same split. Prices are computed once,
    /// now, and frozen on the tickets.
    ///
    /// # Errors
    ///
    /// - `Validation` for an overflowing total
    /// - `Capacity` if the venue cannot fit the request
    /// - `Store` / `Provider` if a collaborator fails (nothing is left behind)
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, venue_id = %event.venue_id))]
    pub async fn generate(&self, event: &EventInfo, request: GenerationRequest) -> Result<Vec<Ticket>> {
        let total = request.validate()?;
        if total == 0 {
            tracing::debug!("Empty generation request");
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let mut prices = Vec::with_capacity(TicketTier::ALL.len());
        for tier in TicketTier::ALL {
            let price = self
                .pricing
                .tier_price(tier, request.base_price, event.starts_at, now)?;
            prices.push((tier, price));
        }
        let price_of = |tier: TicketTier| {
            prices
                .iter()
                .find(|(t, _)| *t == tier)
                .map_or(request.base_price, |(_, price)| *price)
        };

        let tickets = if self.capacity.has_seats(event.venue_id).await? {
            self.generate_seated(event, &request, total, price_of).await?
        } else {
            self.generate_general_admission(event, &request, total, price_of)
                .await?
        };

        for tier in TicketTier::ALL {
            metrics::record_tickets_generated(tier, request.count(tier));
        }
        tracing::info!(
            generated = tickets.len(),
            early_bird = request.early_bird,
            vip = request.vip,
            standard = request.standard,
            base_price = %request.base_price,
            "Generated ticket inventory"
        );

        Ok(tickets)
    }

    async fn generate_seated(
        &self,
        event: &EventInfo,
        request: &GenerationRequest,
        total: u32,
        price_of: impl Fn(TicketTier) -> Money,
    ) -> Result<Vec<Ticket>> {
        let free = self.capacity.free_seats(event.venue_id, event.id).await?;
        let available = u32::try_from(free.len()).unwrap_or(u32::MAX);
        if total > available {
            tracing::warn!(requested = total, available, "Not enough free seats");
            return Err(TicketingError::Capacity {
                requested: total,
                available,
            });
        }

        let seats: Vec<SeatRef> = free.into_iter().take(total as usize).collect();
        let batch: Vec<NewTicket> = seats
            .iter()
            .zip(request.tier_sequence())
            .map(|(seat, tier)| NewTicket {
                event_id: event.id,
                seat_id: Some(seat.id),
                tier,
                price: price_of(tier),
            })
            .collect();

        let tickets = self.store.insert_all(batch).await?;

        let mut linked: Vec<SeatId> = Vec::with_capacity(tickets.len());
        for ticket in &tickets {
            let Some(seat_id) = ticket.seat_id else {
                continue;
            };
            if let Err(error) = self.capacity.link_ticket(seat_id, Some(ticket.id)).await {
                tracing::warn!(%seat_id, ticket_id = %ticket.id, %error, "Seat link refused, rolling back generation");
                let kept = self.rollback_seated(&linked, &tickets).await;
                if !kept.is_empty() {
                    tracing::warn!(kept = ?kept, "Rollback left tickets already claimed by carts");
                }
                return Err(error.into());
            }
            tracing::debug!(%seat_id, ticket_id = %ticket.id, tier = %ticket.tier, "Seat bound to ticket");
            linked.push(seat_id);
        }

        Ok(tickets)
    }

    /// Undo a seated batch. Returns the tickets kept because a cart got to
    /// them first.
    async fn rollback_seated(&self, linked: &[SeatId], tickets: &[Ticket]) -> Vec<TicketId> {
        let mut kept = Vec::new();
        for ticket in tickets {
            let guard = self.locks.acquire(ticket.id).await;
            match self.store.find_by_id(ticket.id).await {
                Ok(Some(current)) if current.status == TicketStatus::Available => {}
                Ok(Some(current)) => {
                    tracing::warn!(ticket_id = %ticket.id, state = %current.state(), "Ticket claimed before rollback, keeping it");
                    self.keep_linked(ticket, linked).await;
                    kept.push(ticket.id);
                    continue;
                }
                Ok(None) => continue,
                Err(error) => {
                    tracing::error!(ticket_id = %ticket.id, %error, "Failed to read ticket during rollback");
                    kept.push(ticket.id);
                    continue;
                }
            }

            if let Some(seat_id) = ticket.seat_id.filter(|seat| linked.contains(seat)) {
                if let Err(error) = self.capacity.link_ticket(seat_id, None).await {
                    tracing::error!(%seat_id, %error, "Failed to clear seat link during rollback");
                }
            }
            if let Err(error) = self.store.delete(ticket.id).await {
                tracing::error!(ticket_id = %ticket.id, %error, "Failed to delete ticket during rollback");
                continue;
            }
            drop(guard);
            self.locks.forget(ticket.id).await;
        }
        kept
    }

    async fn keep_linked(&self, ticket: &Ticket, linked: &[SeatId]) {
        let Some(seat_id) = ticket.seat_id else {
            return;
        };
        if linked.contains(&seat_id) {
            return;
        }
        if let Err(error) = self.capacity.link_ticket(seat_id, Some(ticket.id)).await {
            tracing::error!(%seat_id, ticket_id = %ticket.id, %error, "Kept ticket has no seat link");
        }
    }

    async fn generate_general_admission(
        &self,
        event: &EventInfo,
        request: &GenerationRequest,
        total: u32,
        price_of: impl Fn(TicketTier) -> Money,
    ) -> Result<Vec<Ticket>> {
        let remaining = self
            .capacity
            .remaining_general_admission(event.venue_id, event.id)
            .await?;
        if total > remaining {
            tracing::warn!(requested = total, available = remaining, "Not enough admission places");
            return Err(TicketingError::Capacity {
                requested: total,
                available: remaining,
            });
        }

        self.capacity
            .claim_general_admission(event.venue_id, event.id, total)
            .await
            .map_err(|error| match error {
                CapacityProviderError::InsufficientGeneralAdmission {
                    requested,
                    remaining,
                } => TicketingError::Capacity {
                    requested,
                    available: remaining,
                },
                other => other.into(),
            })?;

        let batch: Vec<NewTicket> = request
            .tier_sequence()
            .map(|tier| NewTicket {
                event_id: event.id,
                seat_id: None,
                tier,
                price: price_of(tier),
            })
            .collect();

        match self.store.insert_all(batch).await {
            Ok(tickets) => Ok(tickets),
            Err(error) => {
                tracing::warn!(%error, "Persisting tickets failed, releasing admission claim");
                if let Err(release_error) = self
                    .capacity
                    .release_general_admission(event.venue_id, event.id, total)
                    .await
                {
                    tracing::error!(%release_error, "Failed to release admission claim");
                }
                Err(error.into())
            }
        }
    }
}
