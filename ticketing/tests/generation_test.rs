//! Ticket generation tests.
//!
//! Covers the tier split and frozen prices, the capacity bound, and rollback
//! when the capacity provider refuses a seat link midway.
//!
//! Run with: `cargo test --test generation_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use boxoffice_core::capacity::{CapacityProvider, CapacityProviderError};
use boxoffice_core::store::{StoreError, TicketStore};
use boxoffice_core::types::{
    CartId, CustomerId, EventId, EventInfo, Money, NewTicket, Seat, SeatId, SeatRef, Ticket,
    TicketId, TicketState, TicketTier, VenueId,
};
use boxoffice_testing::helpers::event_in_days;
use boxoffice_testing::{InMemoryVenueCatalog, SectionLayout, test_clock, test_epoch};
use proptest::prelude::*;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Notify;
use ticketing::{BoxOffice, Config, GenerationRequest, InMemoryTicketStore, TicketingError};

const VENUE: VenueId = VenueId::new(1);
const EVENT: EventId = EventId::new(1);

fn ten_seat_catalog() -> InMemoryVenueCatalog {
    let catalog = InMemoryVenueCatalog::new();
    catalog.add_seated_venue(VENUE, vec![SectionLayout::uniform("Orchestra", 2, 5)]);
    catalog.schedule_event(VENUE, EVENT).unwrap();
    catalog
}

fn office_over(catalog: &InMemoryVenueCatalog) -> BoxOffice {
    BoxOffice::in_memory(
        Config::default(),
        Arc::new(catalog.clone()),
        Arc::new(test_clock()),
    )
    .unwrap()
}

fn event(days: i64) -> EventInfo {
    event_in_days(EVENT, VENUE, test_epoch(), days)
}

/// Generating 2/1/3 at base $100 for an event 40 days out on a 10-seat venue.
#[tokio::test]
async fn test_tier_split_and_prices() {
    let catalog = ten_seat_catalog();
    let office = office_over(&catalog);

    let tickets = office
        .generator
        .generate(&event(40), GenerationRequest::new(Money::from_dollars(100), 2, 1, 3))
        .await
        .unwrap();

    let summary: Vec<(TicketTier, Money)> = tickets.iter().map(|t| (t.tier, t.price)).collect();
    assert_eq!(
        summary,
        vec![
            (TicketTier::EarlyBird, Money::from_dollars(100)),
            (TicketTier::EarlyBird, Money::from_dollars(100)),
            (TicketTier::Vip, Money::from_dollars(150)),
            (TicketTier::Standard, Money::from_dollars(110)),
            (TicketTier::Standard, Money::from_dollars(110)),
            (TicketTier::Standard, Money::from_dollars(110)),
        ]
    );

    // Seats are taken in ascending id order
    let seat_ids: Vec<SeatId> = tickets.iter().map(|t| t.seat_id.unwrap()).collect();
    assert!(seat_ids.windows(2).all(|pair| pair[0] < pair[1]));

    // Each seat points back at its ticket
    let seats = catalog.seats_for_event(EVENT);
    for ticket in &tickets {
        let seat = seats.iter().find(|s| Some(s.id) == ticket.seat_id).unwrap();
        assert_eq!(seat.ticket_id, Some(ticket.id));
    }
    assert_eq!(seats.iter().filter(|s| s.is_free()).count(), 4);
}

#[tokio::test]
async fn test_over_capacity_persists_nothing() {
    let catalog = ten_seat_catalog();
    let office = office_over(&catalog);

    let error = office
        .generator
        .generate(&event(40), GenerationRequest::new(Money::from_dollars(100), 5, 5, 1))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        TicketingError::Capacity {
            requested: 11,
            available: 10
        }
    );
    assert!(office.reservations.tickets_for_event(EVENT).await.unwrap().is_empty());
    assert!(catalog.seats_for_event(EVENT).iter().all(Seat::is_free));
}

#[tokio::test]
async fn test_second_batch_only_uses_remaining_seats() {
    let catalog = ten_seat_catalog();
    let office = office_over(&catalog);
    let request = GenerationRequest::new(Money::from_dollars(50), 0, 0, 6);

    office.generator.generate(&event(10), request).await.unwrap();
    let error = office.generator.generate(&event(10), request).await.unwrap_err();
    assert_eq!(
        error,
        TicketingError::Capacity {
            requested: 6,
            available: 4
        }
    );

    let rest = office
        .generator
        .generate(&event(10), GenerationRequest::new(Money::from_dollars(50), 0, 0, 4))
        .await
        .unwrap();
    assert_eq!(rest.len(), 4);
    assert_eq!(office.reservations.tickets_for_event(EVENT).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_general_admission_remaining_shrinks() {
    let catalog = InMemoryVenueCatalog::new();
    catalog.add_general_admission_venue(VenueId::new(2), 100);
    catalog.schedule_event(VenueId::new(2), EventId::new(2)).unwrap();
    let office = office_over(&catalog);
    let event = event_in_days(EventId::new(2), VenueId::new(2), test_epoch(), 20);

    let tickets = office
        .generator
        .generate(&event, GenerationRequest::new(Money::from_dollars(30), 10, 20, 30))
        .await
        .unwrap();
    assert_eq!(tickets.len(), 60);
    assert!(tickets.iter().all(|t| t.seat_id.is_none()));
    assert_eq!(
        catalog
            .remaining_general_admission(VenueId::new(2), EventId::new(2))
            .await
            .unwrap(),
        40
    );
}

// ============================================================================
// Rollback when a seat link is refused
// ============================================================================

/// Two-way handshake around the refused link: the catalog signals `reached`
/// and waits for `resume` before refusing.
#[derive(Default)]
struct LinkGate {
    reached: Notify,
    resume: Notify,
}

/// Delegates to an [`InMemoryVenueCatalog`] but refuses to link one seat.
#[derive(Clone)]
struct RefusingCatalog {
    inner: InMemoryVenueCatalog,
    refused: SeatId,
    gate: Option<Arc<LinkGate>>,
}

impl CapacityProvider for RefusingCatalog {
    fn has_seats(
        &self,
        venue_id: VenueId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CapacityProviderError>> + Send + '_>> {
        self.inner.has_seats(venue_id)
    }

    fn free_seats(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatRef>, CapacityProviderError>> + Send + '_>> {
        self.inner.free_seats(venue_id, event_id)
    }

    fn remaining_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<u32, CapacityProviderError>> + Send + '_>> {
        self.inner.remaining_general_admission(venue_id, event_id)
    }

    fn claim_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        self.inner.claim_general_admission(venue_id, event_id, quantity)
    }

    fn release_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        self.inner.release_general_admission(venue_id, event_id, quantity)
    }

    fn link_ticket(
        &self,
        seat_id: SeatId,
        ticket_id: Option<TicketId>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        if seat_id == self.refused && ticket_id.is_some() {
            let gate = self.gate.clone();
            return Box::pin(async move {
                if let Some(gate) = gate {
                    gate.reached.notify_one();
                    gate.resume.notified().await;
                }
                Err(CapacityProviderError::Backend("seat map offline".to_string()))
            });
        }
        self.inner.link_ticket(seat_id, ticket_id)
    }

    fn seat(
        &self,
        seat_id: SeatId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Seat>, CapacityProviderError>> + Send + '_>> {
        self.inner.seat(seat_id)
    }

    fn set_seat_reserved(
        &self,
        seat_id: SeatId,
        reserved: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        self.inner.set_seat_reserved(seat_id, reserved)
    }
}

#[tokio::test]
async fn test_refused_link_rolls_back_everything() {
    let catalog = ten_seat_catalog();
    let third_seat = catalog.seats_for_event(EVENT)[2].id;
    let store = Arc::new(InMemoryTicketStore::new());
    let office = BoxOffice::new(
        Config::default(),
        store.clone(),
        Arc::new(RefusingCatalog {
            inner: catalog.clone(),
            refused: third_seat,
            gate: None,
        }),
        Arc::new(test_clock()),
    )
    .unwrap();

    let error = office
        .generator
        .generate(&event(40), GenerationRequest::new(Money::from_dollars(100), 2, 1, 3))
        .await
        .unwrap_err();

    assert!(matches!(error, TicketingError::Provider(CapacityProviderError::Backend(_))));
    assert!(store.is_empty().await);
    assert!(catalog.seats_for_event(EVENT).iter().all(Seat::is_free));
}

/// A cart holds the first ticket after it is persisted but before the refused
/// link; rollback keeps that ticket and its seat and removes the rest.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rollback_keeps_ticket_held_before_it_ran() {
    let catalog = ten_seat_catalog();
    let seats = catalog.seats_for_event(EVENT);
    let gate = Arc::new(LinkGate::default());
    let office = BoxOffice::new(
        Config::default(),
        Arc::new(InMemoryTicketStore::new()),
        Arc::new(RefusingCatalog {
            inner: catalog.clone(),
            refused: seats[2].id,
            gate: Some(Arc::clone(&gate)),
        }),
        Arc::new(test_clock()),
    )
    .unwrap();

    let generating = {
        let office = office.clone();
        tokio::spawn(async move {
            office
                .generator
                .generate(&event(40), GenerationRequest::new(Money::from_dollars(100), 2, 1, 3))
                .await
        })
    };

    gate.reached.notified().await;
    let early = office.reservations.tickets_for_event(EVENT).await.unwrap()[0].clone();
    let mut cart = office.carts.open(CustomerId::new(1), EVENT);
    office.carts.add_ticket(&mut cart, early.id).await.unwrap();
    gate.resume.notify_one();

    let result = generating.await.unwrap();
    assert!(matches!(result, Err(TicketingError::Provider(CapacityProviderError::Backend(_)))));

    let remaining = office.reservations.tickets_for_event(EVENT).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, early.id);
    assert_eq!(remaining[0].state(), TicketState::Held);
    assert_eq!(office.carts.calculate_total(&cart).await.unwrap(), Money::from_dollars(100));

    let seats = catalog.seats_for_event(EVENT);
    let held_seat = seats.iter().find(|s| Some(s.id) == early.seat_id).unwrap();
    assert_eq!(held_seat.ticket_id, Some(early.id));
    assert_eq!(seats.iter().filter(|s| s.is_free()).count(), 9);
}

// ============================================================================
// General admission
// ============================================================================

fn general_admission_office(places: u32) -> (BoxOffice, InMemoryVenueCatalog, EventInfo) {
    let catalog = InMemoryVenueCatalog::new();
    catalog.add_general_admission_venue(VenueId::new(2), places);
    catalog.schedule_event(VenueId::new(2), EventId::new(2)).unwrap();
    let office = office_over(&catalog);
    let event = event_in_days(EventId::new(2), VenueId::new(2), test_epoch(), 20);
    (office, catalog, event)
}

#[tokio::test]
async fn test_deleting_general_admission_ticket_frees_a_place() {
    let (office, catalog, event) = general_admission_office(4);
    let tickets = office
        .generator
        .generate(&event, GenerationRequest::new(Money::from_dollars(30), 0, 0, 4))
        .await
        .unwrap();

    office.reservations.delete_ticket(&event, tickets[0].id).await.unwrap();
    assert_eq!(
        catalog
            .remaining_general_admission(event.venue_id, event.id)
            .await
            .unwrap(),
        1
    );

    let again = office
        .generator
        .generate(&event, GenerationRequest::new(Money::from_dollars(30), 0, 0, 1))
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(office.reservations.tickets_for_event(event.id).await.unwrap().len(), 4);
}

/// Store whose batch inserts always fail.
struct OfflineStore {
    inner: InMemoryTicketStore,
}

impl TicketStore for OfflineStore {
    fn insert_all(
        &self,
        _tickets: Vec<NewTicket>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async { Err(StoreError::Backend("disk full".to_string())) })
    }

    fn save(&self, ticket: Ticket) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        self.inner.save(ticket)
    }

    fn find_by_id(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        self.inner.find_by_id(id)
    }

    fn find_by_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.find_by_event(event_id)
    }

    fn find_by_cart(
        &self,
        cart_id: CartId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.find_by_cart(cart_id)
    }

    fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.find_by_customer(customer_id)
    }

    fn delete(&self, id: TicketId) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        self.inner.delete(id)
    }

    fn all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        self.inner.all()
    }
}

#[tokio::test]
async fn test_failed_insert_releases_admission_claim() {
    let catalog = InMemoryVenueCatalog::new();
    catalog.add_general_admission_venue(VenueId::new(2), 4);
    catalog.schedule_event(VenueId::new(2), EventId::new(2)).unwrap();
    let office = BoxOffice::new(
        Config::default(),
        Arc::new(OfflineStore {
            inner: InMemoryTicketStore::new(),
        }),
        Arc::new(catalog.clone()),
        Arc::new(test_clock()),
    )
    .unwrap();
    let event = event_in_days(EventId::new(2), VenueId::new(2), test_epoch(), 20);

    let error = office
        .generator
        .generate(&event, GenerationRequest::new(Money::from_dollars(30), 1, 1, 1))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        TicketingError::Store(StoreError::Backend("disk full".to_string()))
    );
    assert_eq!(
        catalog
            .remaining_general_admission(VenueId::new(2), EventId::new(2))
            .await
            .unwrap(),
        4
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any request larger than the free seats fails and leaves no inventory.
    #[test]
    fn prop_generation_respects_capacity(early in 0u32..8, vip in 0u32..8, standard in 0u32..8) {
        let catalog = ten_seat_catalog();
        let office = office_over(&catalog);
        let request = GenerationRequest::new(Money::from_dollars(20), early, vip, standard);
        let total = early + vip + standard;

        let result = tokio_test::block_on(office.generator.generate(&event(15), request));
        let stored = tokio_test::block_on(office.reservations.tickets_for_event(EVENT)).unwrap();

        if total > 10 {
            let is_capacity_error = matches!(result, Err(TicketingError::Capacity { .. }));
            prop_assert!(is_capacity_error);
            prop_assert!(stored.is_empty());
        } else {
            prop_assert_eq!(result.unwrap().len(), total as usize);
            prop_assert_eq!(stored.len(), total as usize);
            let free = catalog.seats_for_event(EVENT).iter().filter(|s| s.is_free()).count();
            prop_assert_eq!(free, 10 - total as usize);
        }
    }
}
