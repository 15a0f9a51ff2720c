//! Ticket lifecycle: `AVAILABLE → HELD → SOLD`.
//!
//! | Operation | Requires | Result |
//! |---|---|---|
//! | `hold` | AVAILABLE, same event as the cart | HELD by the cart |
//! | `release` | HELD | AVAILABLE |
//! | `sell` | HELD by the selling cart | SOLD, seat reserved |
//! | `unsell` | SOLD | AVAILABLE, seat unreserved |
//!
//! # Concurrency
//!
//! Every transition runs under a per-ticket `tokio::sync::Mutex`, so two racing
//! holds on one ticket serialize and exactly one sees AVAILABLE. Locks are held
//! only for the store/provider writes of a single ticket; nothing here calls
//! out to a payment gateway.
//!
//! `sell` and `unsell` are the only writers of a seat's `reserved` flag. The
//! flag is flipped with a compare-and-set on the capacity provider before the
//! ticket is written, and flipped back if the ticket write fails, so a sold
//! ticket and its reserved seat are never observed out of step.

use crate::error::{ConflictKind, Resource, Result, TicketingError};
use crate::metrics;
use crate::pricing::PricingPolicy;
use boxoffice_core::capacity::{CapacityProvider, CapacityProviderError};
use boxoffice_core::environment::Clock;
use boxoffice_core::store::TicketStore;
use boxoffice_core::types::{
    CartId, CustomerId, EventId, EventInfo, Money, SeatId, Ticket, TicketId, TicketState,
    TicketStatus, TicketTier,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-ticket mutual exclusion, shared with the generator's rollback
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    locks: Mutex<HashMap<TicketId, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(crate) async fn acquire(&self, ticket_id: TicketId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(ticket_id).or_default())
        };
        lock.lock_owned().await
    }

    pub(crate) async fn forget(&self, ticket_id: TicketId) {
        self.locks.lock().await.remove(&ticket_id);
    }
}

/// Applies lifecycle transitions to tickets
#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn TicketStore>,
    capacity: Arc<dyn CapacityProvider>,
    pricing: Arc<PricingPolicy>,
    clock: Arc<dyn Clock>,
    locks: Arc<LockTable>,
}

impl ReservationManager {
    /// Creates a manager over the given collaborators
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

    pub(crate) fn lock_table(&self) -> Arc<LockTable> {
        Arc::clone(&self.locks)
    }

    /// Look up a ticket.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id does not resolve.
    pub async fn ticket(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.store
            .find_by_id(ticket_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Ticket(ticket_id)))
    }

    /// Every ticket generated for an event, ascending by id.
    ///
    /// # Errors
    ///
    /// `Store` if the query fails.
    pub async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>> {
        Ok(self.store.find_by_event(event_id).await?)
    }

    /// Hold an AVAILABLE ticket for `cart_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ticket does not exist
    /// - `StateConflict` if the ticket belongs to another event than
    ///   `cart_event`, or is already HELD or SOLD
    pub async fn hold(&self, ticket_id: TicketId, cart_id: CartId, cart_event: EventId) -> Result<Ticket> {
        let _guard = self.locks.acquire(ticket_id).await;
        let result = self.hold_locked(ticket_id, cart_id, cart_event).await;
        metrics::record_hold(result.is_ok());
        result
    }

    async fn hold_locked(&self, ticket_id: TicketId, cart_id: CartId, cart_event: EventId) -> Result<Ticket> {
        let mut ticket = self.ticket(ticket_id).await?;
        if ticket.event_id != cart_event {
            return Err(TicketingError::StateConflict(ConflictKind::EventMismatch { ticket_id }));
        }
        if ticket.status != TicketStatus::Available {
            tracing::debug!(%ticket_id, %cart_id, state = %ticket.state(), "Hold refused");
            return Err(TicketingError::wrong_state(
                ticket_id,
                ticket.state(),
                TicketState::Available,
            ));
        }

        ticket.status = TicketStatus::Held { cart_id };
        self.store.save(ticket.clone()).await?;
        tracing::debug!(%ticket_id, %cart_id, event_id = %ticket.event_id, "Ticket held");
        Ok(ticket)
    }

    /// Return a HELD ticket to the available pool.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `StateConflict` if the ticket is not HELD.
    pub async fn release(&self, ticket_id: TicketId) -> Result<Ticket> {
        let _guard = self.locks.acquire(ticket_id).await;
        let mut ticket = self.ticket(ticket_id).await?;
        let TicketStatus::Held { cart_id } = ticket.status else {
            return Err(TicketingError::wrong_state(
                ticket_id,
                ticket.state(),
                TicketState::Held,
            ));
        };

        ticket.status = TicketStatus::Available;
        self.store.save(ticket.clone()).await?;
        metrics::record_release();
        tracing::debug!(%ticket_id, %cart_id, "Ticket released");
        Ok(ticket)
    }

    /// Sell a ticket held by `cart_id` to `customer_id`.
    ///
    /// For a seated ticket the seat is reserved on the capacity provider first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ticket does not exist
    /// - `StateConflict` if the ticket is not HELD, is held by another cart, or
    ///   its seat is already reserved
    pub async fn sell(&self, ticket_id: TicketId, cart_id: CartId, customer_id: CustomerId) -> Result<Ticket> {
        let _guard = self.locks.acquire(ticket_id).await;
        let mut ticket = self.ticket(ticket_id).await?;
        match ticket.status {
            TicketStatus::Held { cart_id: holder } if holder == cart_id => {}
            TicketStatus::Held { cart_id: holder } => {
                return Err(TicketingError::StateConflict(ConflictKind::HeldByOtherCart {
                    ticket_id,
                    holder,
                }));
            }
            TicketStatus::Available | TicketStatus::Sold { .. } => {
                return Err(TicketingError::wrong_state(
                    ticket_id,
                    ticket.state(),
                    TicketState::Held,
                ));
            }
        }

        if let Some(seat_id) = ticket.seat_id {
            self.capacity
                .set_seat_reserved(seat_id, true)
                .await
                .map_err(|error| match error {
                    CapacityProviderError::SeatAlreadyReserved(seat) => {
                        tracing::warn!(%ticket_id, seat_id = %seat, "Seat already reserved by another sale");
                        TicketingError::StateConflict(ConflictKind::SeatAlreadyReserved(seat))
                    }
                    other => other.into(),
                })?;
        }

        ticket.status = TicketStatus::Sold {
            customer_id,
            purchased_at: self.clock.now(),
        };
        if let Err(error) = self.store.save(ticket.clone()).await {
            if let Some(seat_id) = ticket.seat_id {
                self.restore_seat(seat_id, false).await;
            }
            return Err(error.into());
        }

        metrics::record_ticket_sold();
        tracing::debug!(%ticket_id, %cart_id, %customer_id, seat_id = ?ticket.seat_id, "Ticket sold");
        Ok(ticket)
    }

    /// Cancel a sale, returning the ticket to the available pool.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `StateConflict` if the ticket is not SOLD.
    pub async fn unsell(&self, ticket_id: TicketId) -> Result<Ticket> {
        let ticket = self.cancel_sale(ticket_id, TicketStatus::Available).await?;
        metrics::record_sale_cancelled();
        Ok(ticket)
    }

    /// Undo a sale made during a checkout that did not complete, putting the
    /// ticket back in the cart's hold.
    pub(crate) async fn revert_sale(&self, ticket_id: TicketId, cart_id: CartId) -> Result<Ticket> {
        self.cancel_sale(ticket_id, TicketStatus::Held { cart_id }).await
    }

    async fn cancel_sale(&self, ticket_id: TicketId, next: TicketStatus) -> Result<Ticket> {
        let _guard = self.locks.acquire(ticket_id).await;
        let mut ticket = self.ticket(ticket_id).await?;
        let TicketStatus::Sold { customer_id, .. } = ticket.status else {
            return Err(TicketingError::wrong_state(
                ticket_id,
                ticket.state(),
                TicketState::Sold,
            ));
        };

        if let Some(seat_id) = ticket.seat_id {
            self.capacity.set_seat_reserved(seat_id, false).await?;
        }

        ticket.status = next;
        if let Err(error) = self.store.save(ticket.clone()).await {
            if let Some(seat_id) = ticket.seat_id {
                self.restore_seat(seat_id, true).await;
            }
            return Err(error.into());
        }

        tracing::debug!(%ticket_id, %customer_id, state = %ticket.state(), "Sale cancelled");
        Ok(ticket)
    }

    async fn restore_seat(&self, seat_id: SeatId, reserved: bool) {
        match self.capacity.set_seat_reserved(seat_id, reserved).await {
            Ok(()) => tracing::warn!(%seat_id, reserved, "Ticket write failed, seat flag restored"),
            Err(error) => {
                tracing::error!(%seat_id, reserved, %error, "Failed to restore seat flag");
            }
        }
    }

    /// Scale an unsold ticket's price by `(1 + percentage / 100)`.
    ///
    /// # Errors
    ///
    /// - `Validation` if `percentage < -100`
    /// - `StateConflict` if the ticket is SOLD
    pub async fn adjust_price(&self, ticket_id: TicketId, percentage: i32) -> Result<Ticket> {
        let _guard = self.locks.acquire(ticket_id).await;
        let mut ticket = self.ticket(ticket_id).await?;
        if ticket.is_sold() {
            return Err(TicketingError::wrong_state(
                ticket_id,
                TicketState::Sold,
                TicketState::Available,
            ));
        }

        let price = PricingPolicy::adjust_price(ticket.price, percentage)?;
        if price == ticket.price {
            return Ok(ticket);
        }

        let previous = ticket.price;
        ticket.price = price;
        self.store.save(ticket.clone()).await?;
        tracing::info!(%ticket_id, %previous, %price, percentage, "Ticket price adjusted");
        Ok(ticket)
    }

    /// Re-price every AVAILABLE STANDARD ticket of `event` from `base_price` at
    /// the current time. HELD and SOLD tickets keep the price they were quoted.
    ///
    /// Returns the tickets whose price changed.
    ///
    /// # Errors
    ///
    /// `Store` on a backend failure, `Validation` on an unusable schedule.
    pub async fn reprice_unsold_standard_tickets(
        &self,
        event: &EventInfo,
        base_price: Money,
    ) -> Result<Vec<Ticket>> {
        let price = self
            .pricing
            .dynamic_standard_price(base_price, event.starts_at, self.clock.now())?;

        let candidates: Vec<TicketId> = self
            .store
            .find_by_event(event.id)
            .await?
            .into_iter()
            .filter(|t| t.tier == TicketTier::Standard && t.status == TicketStatus::Available)
            .map(|t| t.id)
            .collect();

        let mut repriced = Vec::new();
        for ticket_id in candidates {
            let _guard = self.locks.acquire(ticket_id).await;
            let Some(mut ticket) = self.store.find_by_id(ticket_id).await? else {
                continue;
            };
            // Re-check under the lock; a hold may have landed since the scan
            if ticket.status != TicketStatus::Available || ticket.price == price {
                continue;
            }
            ticket.price = price;
            self.store.save(ticket.clone()).await?;
            repriced.push(ticket);
        }

        tracing::info!(event_id = %event.id, repriced = repriced.len(), %price, "Re-priced STANDARD tickets");
        Ok(repriced)
    }

    /// Remove an AVAILABLE ticket of `event` from inventory.
    ///
    /// A seated ticket's seat is unlinked so a later generation can use it; a
    /// general-admission ticket gives its place back to the venue.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ticket does not exist
    /// - `Validation` if the ticket belongs to another event
    /// - `StateConflict` if the ticket is HELD or SOLD
    pub async fn delete_ticket(&self, event: &EventInfo, ticket_id: TicketId) -> Result<Ticket> {
        let guard = self.locks.acquire(ticket_id).await;
        let ticket = self.ticket(ticket_id).await?;
        if ticket.event_id != event.id {
            return Err(TicketingError::Validation(format!(
                "Ticket {ticket_id} is for event {}, not {}",
                ticket.event_id, event.id
            )));
        }
        if ticket.status != TicketStatus::Available {
            return Err(TicketingError::wrong_state(
                ticket_id,
                ticket.state(),
                TicketState::Available,
            ));
        }

        match ticket.seat_id {
            Some(seat_id) => self.capacity.link_ticket(seat_id, None).await?,
            None => {
                self.capacity
                    .release_general_admission(event.venue_id, event.id, 1)
                    .await?;
            }
        }
        if let Err(error) = self.store.delete(ticket_id).await {
            self.restore_capacity(event, &ticket).await;
            return Err(error.into());
        }

        drop(guard);
        self.locks.forget(ticket_id).await;
        tracing::info!(%ticket_id, seat_id = ?ticket.seat_id, "Ticket deleted");
        Ok(ticket)
    }

    async fn restore_capacity(&self, event: &EventInfo, ticket: &Ticket) {
        let restored = match ticket.seat_id {
            Some(seat_id) => self.capacity.link_ticket(seat_id, Some(ticket.id)).await,
            None => {
                self.capacity
                    .claim_general_admission(event.venue_id, event.id, 1)
                    .await
            }
        };
        if let Err(error) = restored {
            tracing::error!(ticket_id = %ticket.id, %error, "Failed to restore capacity after delete failure");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inventory::InMemoryTicketStore;
    use boxoffice_core::types::NewTicket;
    use boxoffice_core::types::VenueId;
    use boxoffice_testing::helpers::event_in_days;
    use boxoffice_testing::{InMemoryVenueCatalog, SectionLayout, test_clock, test_epoch};

    struct Fixture {
        manager: ReservationManager,
        store: Arc<InMemoryTicketStore>,
        catalog: InMemoryVenueCatalog,
        ticket: Ticket,
    }

    const EVENT: EventId = EventId::new(1);
    const CART: CartId = CartId::new(10);
    const CUSTOMER: CustomerId = CustomerId::new(20);

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTicketStore::new());
        let catalog = InMemoryVenueCatalog::new();
        catalog.add_seated_venue(VenueId::new(1), vec![SectionLayout::uniform("Floor", 1, 2)]);
        catalog.schedule_event(VenueId::new(1), EVENT).unwrap();
        let seat_id = catalog.seats_for_event(EVENT)[0].id;

        let ticket = store
            .insert_all(vec![NewTicket {
                event_id: EVENT,
                seat_id: Some(seat_id),
                tier: TicketTier::Standard,
                price: Money::from_dollars(110),
            }])
            .await
            .unwrap()
            .remove(0);
        catalog.link_ticket(seat_id, Some(ticket.id)).await.unwrap();

        let manager = ReservationManager::new(
            store.clone(),
            Arc::new(catalog.clone()),
            Arc::new(PricingPolicy::default()),
            Arc::new(test_clock()),
        );
        Fixture {
            manager,
            store,
            catalog,
            ticket,
        }
    }

    #[tokio::test]
    async fn test_hold_release_cycle() {
        let f = fixture().await;
        let held = f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();
        assert_eq!(held.cart_id(), Some(CART));

        let again = f.manager.hold(f.ticket.id, CartId::new(11), EVENT).await;
        assert!(matches!(again, Err(TicketingError::StateConflict(_))));

        let released = f.manager.release(f.ticket.id).await.unwrap();
        assert_eq!(released.state(), TicketState::Available);
        assert!(f.manager.release(f.ticket.id).await.is_err());
    }

    #[tokio::test]
    async fn test_hold_rejects_other_event() {
        let f = fixture().await;
        let result = f.manager.hold(f.ticket.id, CART, EventId::new(2)).await;
        assert_eq!(
            result,
            Err(TicketingError::StateConflict(ConflictKind::EventMismatch {
                ticket_id: f.ticket.id
            }))
        );
    }

    #[tokio::test]
    async fn test_sell_reserves_seat_and_unsell_frees_it() {
        let f = fixture().await;
        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();

        let wrong_cart = f.manager.sell(f.ticket.id, CartId::new(99), CUSTOMER).await;
        assert!(matches!(
            wrong_cart,
            Err(TicketingError::StateConflict(ConflictKind::HeldByOtherCart { .. }))
        ));

        let sold = f.manager.sell(f.ticket.id, CART, CUSTOMER).await.unwrap();
        assert_eq!(sold.customer_id(), Some(CUSTOMER));
        assert!(sold.cart_id().is_none());
        assert_eq!(f.catalog.reserved_seat_count(EVENT), 1);

        let unsold = f.manager.unsell(f.ticket.id).await.unwrap();
        assert_eq!(unsold.state(), TicketState::Available);
        assert!(unsold.purchased_at().is_none());
        assert_eq!(f.catalog.reserved_seat_count(EVENT), 0);
        assert!(f.manager.unsell(f.ticket.id).await.is_err());
    }

    #[tokio::test]
    async fn test_sell_fails_when_seat_already_reserved() {
        let f = fixture().await;
        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();
        let seat_id = f.ticket.seat_id.unwrap();
        f.catalog.set_seat_reserved(seat_id, true).await.unwrap();

        let result = f.manager.sell(f.ticket.id, CART, CUSTOMER).await;
        assert_eq!(
            result,
            Err(TicketingError::StateConflict(ConflictKind::SeatAlreadyReserved(seat_id)))
        );
        let ticket = f.manager.ticket(f.ticket.id).await.unwrap();
        assert_eq!(ticket.cart_id(), Some(CART));
    }

    #[tokio::test]
    async fn test_revert_sale_returns_ticket_to_cart() {
        let f = fixture().await;
        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();
        f.manager.sell(f.ticket.id, CART, CUSTOMER).await.unwrap();

        let reverted = f.manager.revert_sale(f.ticket.id, CART).await.unwrap();
        assert_eq!(reverted.cart_id(), Some(CART));
        assert_eq!(f.catalog.reserved_seat_count(EVENT), 0);
    }

    #[tokio::test]
    async fn test_adjust_price_refused_once_sold() {
        let f = fixture().await;
        let cheaper = f.manager.adjust_price(f.ticket.id, -50).await.unwrap();
        assert_eq!(cheaper.price, Money::from_dollars(55));
        assert!(matches!(
            f.manager.adjust_price(f.ticket.id, -101).await,
            Err(TicketingError::Validation(_))
        ));

        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();
        f.manager.sell(f.ticket.id, CART, CUSTOMER).await.unwrap();
        assert!(matches!(
            f.manager.adjust_price(f.ticket.id, 10).await,
            Err(TicketingError::StateConflict(_))
        ));
        assert_eq!(
            f.manager.ticket(f.ticket.id).await.unwrap().price,
            Money::from_dollars(55)
        );
    }

    #[tokio::test]
    async fn test_sell_with_unknown_seat_is_not_found() {
        let f = fixture().await;
        let mut stray = f.ticket.clone();
        stray.seat_id = Some(SeatId::new(999));
        f.store.save(stray).await.unwrap();
        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();

        assert_eq!(
            f.manager.sell(f.ticket.id, CART, CUSTOMER).await,
            Err(TicketingError::NotFound(Resource::Seat(SeatId::new(999))))
        );
        let ticket = f.manager.ticket(f.ticket.id).await.unwrap();
        assert_eq!(ticket.cart_id(), Some(CART));
    }

    #[tokio::test]
    async fn test_delete_ticket_frees_seat() {
        let f = fixture().await;
        let event = event_in_days(EVENT, VenueId::new(1), test_epoch(), 10);
        f.manager.hold(f.ticket.id, CART, EVENT).await.unwrap();
        assert!(f.manager.delete_ticket(&event, f.ticket.id).await.is_err());
        f.manager.release(f.ticket.id).await.unwrap();

        let elsewhere = event_in_days(EventId::new(2), VenueId::new(1), test_epoch(), 10);
        assert!(matches!(
            f.manager.delete_ticket(&elsewhere, f.ticket.id).await,
            Err(TicketingError::Validation(_))
        ));

        f.manager.delete_ticket(&event, f.ticket.id).await.unwrap();
        assert!(f.store.is_empty().await);
        assert!(f.catalog.seats_for_event(EVENT).iter().all(|s| s.is_free()));
        assert_eq!(
            f.manager.ticket(f.ticket.id).await,
            Err(TicketingError::NotFound(Resource::Ticket(f.ticket.id)))
        );
    }

    #[tokio::test]
    async fn test_delete_general_admission_ticket_returns_place() {
        let f = fixture().await;
        let venue = VenueId::new(2);
        let event_id = EventId::new(2);
        f.catalog.add_general_admission_venue(venue, 4);
        f.catalog.schedule_event(venue, event_id).unwrap();
        f.catalog.claim_general_admission(venue, event_id, 4).await.unwrap();
        let ticket = f
            .store
            .insert_all(vec![NewTicket {
                event_id,
                seat_id: None,
                tier: TicketTier::Standard,
                price: Money::from_dollars(40),
            }])
            .await
            .unwrap()
            .remove(0);

        let event = event_in_days(event_id, venue, test_epoch(), 10);
        f.manager.delete_ticket(&event, ticket.id).await.unwrap();

        assert_eq!(
            f.catalog.remaining_general_admission(venue, event_id).await.unwrap(),
            1
        );
        assert!(f.store.find_by_id(ticket.id).await.unwrap().is_none());
    }
}
