//! In-memory venue catalog.
//!
//! A [`CapacityProvider`] over two kinds of venue:
//!
//! - **Seated**: sections of rows of numbered seats. Scheduling an event at the
//!   venue materializes one [`Seat`] record per physical seat, with ids assigned in
//!   layout order (section, then row, then seat number).
//! - **General admission**: a plain capacity count, tracked per event as
//!   `capacity - claimed`.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap on lock poisoning

use boxoffice_core::capacity::{CapacityProvider, CapacityProviderError};
use boxoffice_core::types::{EventId, Seat, SeatId, SeatRef, TicketId, VenueId};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// One row of numbered seats
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowLayout {
    /// Row label (e.g., "A")
    pub label: String,
    /// Seats in the row, numbered from 1
    pub seats: u32,
}

/// One section of a seated venue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionLayout {
    /// Section name
    pub name: String,
    /// Rows, front to back
    pub rows: Vec<RowLayout>,
}

impl SectionLayout {
    /// A section of `rows` rows labelled A, B, C, ... with `seats_per_row` seats each
    #[must_use]
    pub fn uniform(name: &str, rows: u32, seats_per_row: u32) -> Self {
        let rows = (0..rows)
            .map(|index| RowLayout {
                label: row_label(index),
                seats: seats_per_row,
            })
            .collect();
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// Total seats in the section
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.rows.iter().map(|row| row.seats).sum()
    }
}

fn row_label(index: u32) -> String {
    let letter = char::from_u32(u32::from(b'A') + index % 26).unwrap_or('?');
    if index < 26 {
        letter.to_string()
    } else {
        format!("{letter}{}", index / 26)
    }
}

#[derive(Clone, Debug)]
enum VenueLayout {
    Seated(Vec<SectionLayout>),
    GeneralAdmission(u32),
}

#[derive(Clone, Copy, Debug)]
struct Admission {
    capacity: u32,
    claimed: u32,
}

impl Admission {
    const fn remaining(self) -> u32 {
        self.capacity.saturating_sub(self.claimed)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    venues: HashMap<VenueId, VenueLayout>,
    seats: BTreeMap<SeatId, Seat>,
    seated_events: HashMap<(VenueId, EventId), Vec<SeatId>>,
    admissions: HashMap<(VenueId, EventId), Admission>,
    next_seat_id: u64,
}

/// In-memory capacity provider for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct InMemoryVenueCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryVenueCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a seat-mapped venue
    pub fn add_seated_venue(&self, venue_id: VenueId, sections: Vec<SectionLayout>) {
        self.state
            .write()
            .unwrap()
            .venues
            .insert(venue_id, VenueLayout::Seated(sections));
    }

    /// Register a general-admission venue
    pub fn add_general_admission_venue(&self, venue_id: VenueId, capacity: u32) {
        self.state
            .write()
            .unwrap()
            .venues
            .insert(venue_id, VenueLayout::GeneralAdmission(capacity));
    }

    /// Schedule an event at a venue, materializing its seats or admission count.
    ///
    /// Scheduling the same event twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `UnknownVenue` if the venue was never registered.
    pub fn schedule_event(&self, venue_id: VenueId, event_id: EventId) -> Result<(), CapacityProviderError> {
        let mut state = self.state.write().unwrap();
        let layout = state
            .venues
            .get(&venue_id)
            .cloned()
            .ok_or(CapacityProviderError::UnknownVenue(venue_id))?;

        match layout {
            VenueLayout::GeneralAdmission(capacity) => {
                state
                    .admissions
                    .entry((venue_id, event_id))
                    .or_insert(Admission { capacity, claimed: 0 });
            }
            VenueLayout::Seated(sections) => {
                if state.seated_events.contains_key(&(venue_id, event_id)) {
                    return Ok(());
                }
                let mut ids = Vec::new();
                for section in &sections {
                    for row in &section.rows {
                        for number in 1..=row.seats {
                            state.next_seat_id += 1;
                            let id = SeatId::new(state.next_seat_id);
                            state.seats.insert(
                                id,
                                Seat {
                                    id,
                                    venue_id,
                                    event_id,
                                    section: section.name.clone(),
                                    row: row.label.clone(),
                                    number,
                                    reserved: false,
                                    ticket_id: None,
                                },
                            );
                            ids.push(id);
                        }
                    }
                }
                tracing::debug!(%venue_id, %event_id, seats = ids.len(), "Seat map materialized");
                state.seated_events.insert((venue_id, event_id), ids);
            }
        }
        Ok(())
    }

    /// Snapshot of every seat record for an event, ascending by id
    #[must_use]
    pub fn seats_for_event(&self, event_id: EventId) -> Vec<Seat> {
        self.state
            .read()
            .unwrap()
            .seats
            .values()
            .filter(|seat| seat.event_id == event_id)
            .cloned()
            .collect()
    }

    /// Number of reserved seats for an event
    #[must_use]
    pub fn reserved_seat_count(&self, event_id: EventId) -> usize {
        self.seats_for_event(event_id)
            .iter()
            .filter(|seat| seat.reserved)
            .count()
    }

    fn seated_ids(
        state: &CatalogState,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Result<Vec<SeatId>, CapacityProviderError> {
        state
            .seated_events
            .get(&(venue_id, event_id))
            .cloned()
            .ok_or(CapacityProviderError::EventNotScheduled { venue_id, event_id })
    }
}

impl CapacityProvider for InMemoryVenueCatalog {
    fn has_seats(
        &self,
        venue_id: VenueId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            match self.state.read().unwrap().venues.get(&venue_id) {
                Some(VenueLayout::Seated(_)) => Ok(true),
                Some(VenueLayout::GeneralAdmission(_)) => Ok(false),
                None => Err(CapacityProviderError::UnknownVenue(venue_id)),
            }
        })
    }

    fn free_seats(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatRef>, CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            let mut ids = Self::seated_ids(&state, venue_id, event_id)?;
            ids.sort();
            Ok(ids
                .iter()
                .filter_map(|id| state.seats.get(id))
                .filter(|seat| seat.is_free())
                .map(Seat::to_ref)
                .collect())
        })
    }

    fn remaining_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<u32, CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            self.state
                .read()
                .unwrap()
                .admissions
                .get(&(venue_id, event_id))
                .map(|admission| admission.remaining())
                .ok_or(CapacityProviderError::EventNotScheduled { venue_id, event_id })
        })
    }

    fn claim_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let admission = state
                .admissions
                .get_mut(&(venue_id, event_id))
                .ok_or(CapacityProviderError::EventNotScheduled { venue_id, event_id })?;
            let remaining = admission.remaining();
            if quantity > remaining {
                return Err(CapacityProviderError::InsufficientGeneralAdmission {
                    requested: quantity,
                    remaining,
                });
            }
            admission.claimed += quantity;
            Ok(())
        })
    }

    fn release_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let admission = state
                .admissions
                .get_mut(&(venue_id, event_id))
                .ok_or(CapacityProviderError::EventNotScheduled { venue_id, event_id })?;
            admission.claimed = admission.claimed.saturating_sub(quantity);
            Ok(())
        })
    }

    fn link_ticket(
        &self,
        seat_id: SeatId,
        ticket_id: Option<TicketId>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let seat = state
                .seats
                .get_mut(&seat_id)
                .ok_or(CapacityProviderError::UnknownSeat(seat_id))?;
            match (seat.ticket_id, ticket_id) {
                (Some(current), Some(requested)) if current != requested => {
                    Err(CapacityProviderError::SeatAlreadyLinked {
                        seat_id,
                        ticket_id: current,
                    })
                }
                _ => {
                    seat.ticket_id = ticket_id;
                    Ok(())
                }
            }
        })
    }

    fn seat(
        &self,
        seat_id: SeatId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Seat>, CapacityProviderError>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().unwrap().seats.get(&seat_id).cloned()) })
    }

    fn set_seat_reserved(
        &self,
        seat_id: SeatId,
        reserved: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            let seat = state
                .seats
                .get_mut(&seat_id)
                .ok_or(CapacityProviderError::UnknownSeat(seat_id))?;
            match (seat.reserved, reserved) {
                (true, true) => Err(CapacityProviderError::SeatAlreadyReserved(seat_id)),
                (false, false) => Err(CapacityProviderError::SeatNotReserved(seat_id)),
                _ => {
                    seat.reserved = reserved;
                    Ok(())
                }
            }
        })
    }
}
