//! Venue capacity provider trait.
//!
//! Answers "does this venue have individually numbered seats, and if so which
//! seats are free for this event?" or "how many general-admission places are left
//! for this event?". The provider is the source of truth for a seat's `reserved`
//! flag; the reservation manager writes through to it on sale and cancellation.

use crate::types::{EventId, Seat, SeatId, SeatRef, TicketId, VenueId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors reported by a capacity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityProviderError {
    /// The venue is unknown.
    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),

    /// The venue exists but the event is not scheduled there.
    #[error("Event {event_id} is not scheduled at venue {venue_id}")]
    EventNotScheduled {
        /// Venue that was looked up
        venue_id: VenueId,
        /// Event that was looked up
        event_id: EventId,
    },

    /// The seat id does not resolve.
    #[error("Unknown seat: {0}")]
    UnknownSeat(SeatId),

    /// Compare-and-set failed: the seat is already reserved.
    #[error("Seat {0} is already reserved")]
    SeatAlreadyReserved(SeatId),

    /// Compare-and-set failed: the seat is not reserved.
    #[error("Seat {0} is not reserved")]
    SeatNotReserved(SeatId),

    /// The seat is already linked to a different ticket.
    #[error("Seat {seat_id} is already linked to ticket {ticket_id}")]
    SeatAlreadyLinked {
        /// Seat being linked
        seat_id: SeatId,
        /// Ticket currently occupying it
        ticket_id: TicketId,
    },

    /// Not enough general-admission places left to claim.
    #[error("Requested {requested} general admission places, only {remaining} remain")]
    InsufficientGeneralAdmission {
        /// Places requested
        requested: u32,
        /// Places remaining
        remaining: u32,
    },

    /// The provider backend failed.
    #[error("Capacity provider error: {0}")]
    Backend(String),
}

/// Source of seat maps and general-admission counts.
///
/// Seat records are scoped to one event: a [`SeatId`] identifies one physical
/// seat at one event.
pub trait CapacityProvider: Send + Sync {
    /// Whether the venue is seat-mapped (as opposed to general admission).
    ///
    /// # Errors
    ///
    /// Returns an error if the venue cannot be resolved.
    fn has_seats(
        &self,
        venue_id: VenueId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CapacityProviderError>> + Send + '_>>;

    /// Seats with no ticket and no reservation, ordered by ascending seat id.
    ///
    /// # Errors
    ///
    /// Returns `EventNotScheduled` if the venue has no seat map for the event.
    fn free_seats(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatRef>, CapacityProviderError>> + Send + '_>>;

    /// General-admission places not yet allocated to tickets.
    ///
    /// # Errors
    ///
    /// Returns `EventNotScheduled` if the venue has no admission count for the event.
    fn remaining_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<u32, CapacityProviderError>> + Send + '_>>;

    /// Allocate `quantity` general-admission places to newly generated tickets.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientGeneralAdmission` if fewer places remain.
    fn claim_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>>;

    /// Return `quantity` previously claimed general-admission places.
    ///
    /// # Errors
    ///
    /// Returns `EventNotScheduled` if the venue has no admission count for the event.
    fn release_general_admission(
        &self,
        venue_id: VenueId,
        event_id: EventId,
        quantity: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>>;

    /// Set (`Some`) or clear (`None`) the seat's back reference to its ticket.
    ///
    /// # Errors
    ///
    /// Returns `SeatAlreadyLinked` when linking a seat that already belongs to
    /// another ticket, `UnknownSeat` if the seat does not resolve.
    fn link_ticket(
        &self,
        seat_id: SeatId,
        ticket_id: Option<TicketId>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>>;

    /// Look up a seat.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the lookup failed. An unknown seat is `Ok(None)`.
    fn seat(
        &self,
        seat_id: SeatId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Seat>, CapacityProviderError>> + Send + '_>>;

    /// Compare-and-set the seat's `reserved` flag.
    ///
    /// Setting `true` on a reserved seat fails with `SeatAlreadyReserved`; setting
    /// `false` on an unreserved seat fails with `SeatNotReserved`. A concurrent
    /// writer therefore can never silently overwrite another's reservation.
    ///
    /// # Errors
    ///
    /// See above, plus `UnknownSeat`.
    fn set_seat_reserved(
        &self,
        seat_id: SeatId,
        reserved: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), CapacityProviderError>> + Send + '_>>;
}
