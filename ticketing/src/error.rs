//! Error taxonomy for the ticketing engine.
//!
//! Every failure is scoped to the one operation that raised it; nothing here is
//! fatal to the process and nothing is retried automatically.

use boxoffice_core::capacity::CapacityProviderError;
use boxoffice_core::store::StoreError;
use boxoffice_core::types::{CartId, SeatId, TicketId, TicketState};
use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, TicketingError>;

/// Something that can fail to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A ticket id
    Ticket(TicketId),
    /// A seat id
    Seat(SeatId),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ticket(id) => write!(f, "ticket {id}"),
            Self::Seat(id) => write!(f, "seat {id}"),
        }
    }
}

/// Why a lifecycle transition was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The ticket is not in the state the operation needs
    TicketState {
        /// Ticket involved
        ticket_id: TicketId,
        /// State it was found in
        actual: TicketState,
        /// State the operation requires
        expected: TicketState,
    },
    /// The ticket is held, but by another cart
    HeldByOtherCart {
        /// Ticket involved
        ticket_id: TicketId,
        /// Cart actually holding it
        holder: CartId,
    },
    /// Ticket and cart belong to different events
    EventMismatch {
        /// Ticket involved
        ticket_id: TicketId,
    },
    /// The seat is already reserved by another sale
    SeatAlreadyReserved(SeatId),
    /// The cart has already been paid for
    CartAlreadyProcessed(CartId),
    /// The ticket is already in the cart
    AlreadyInCart {
        /// Ticket involved
        ticket_id: TicketId,
        /// Cart involved
        cart_id: CartId,
    },
    /// The ticket is not a member of the cart
    NotInCart {
        /// Ticket involved
        ticket_id: TicketId,
        /// Cart involved
        cart_id: CartId,
    },
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TicketState {
                ticket_id,
                actual,
                expected,
            } => write!(f, "ticket {ticket_id} is {actual}, expected {expected}"),
            Self::HeldByOtherCart { ticket_id, holder } => {
                write!(f, "ticket {ticket_id} is held by cart {holder}")
            }
            Self::EventMismatch { ticket_id } => {
                write!(f, "ticket {ticket_id} belongs to a different event than the cart")
            }
            Self::SeatAlreadyReserved(seat_id) => write!(f, "seat {seat_id} is already reserved"),
            Self::CartAlreadyProcessed(cart_id) => {
                write!(f, "cart {cart_id} has already been checked out")
            }
            Self::AlreadyInCart { ticket_id, cart_id } => {
                write!(f, "ticket {ticket_id} is already in cart {cart_id}")
            }
            Self::NotInCart { ticket_id, cart_id } => {
                write!(f, "ticket {ticket_id} is not in cart {cart_id}")
            }
        }
    }
}

/// Errors surfaced by the ticketing engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// Malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested ticket counts exceed what the venue has left
    #[error("Insufficient capacity: requested {requested}, available {available}")]
    Capacity {
        /// Tickets requested
        requested: u32,
        /// Seats or admission places available
        available: u32,
    },

    /// Operation attempted in the wrong lifecycle state
    #[error("State conflict: {0}")]
    StateConflict(ConflictKind),

    /// An id did not resolve
    #[error("Not found: {0}")]
    NotFound(Resource),

    /// The payment capability declined the charge
    #[error("Payment failed: {reason}")]
    PaymentFailure {
        /// Gateway's reason
        reason: String,
    },

    /// Ticket store backend failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Capacity provider failure
    #[error(transparent)]
    Provider(CapacityProviderError),
}

impl From<CapacityProviderError> for TicketingError {
    fn from(error: CapacityProviderError) -> Self {
        match error {
            CapacityProviderError::UnknownSeat(seat_id) => Self::NotFound(Resource::Seat(seat_id)),
            other => Self::Provider(other),
        }
    }
}

impl TicketingError {
    /// Shorthand for a ticket-state conflict
    #[must_use]
    pub const fn wrong_state(ticket_id: TicketId, actual: TicketState, expected: TicketState) -> Self {
        Self::StateConflict(ConflictKind::TicketState {
            ticket_id,
            actual,
            expected,
        })
    }

    /// Stable label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Capacity { .. } => "capacity",
            Self::StateConflict(_) => "state_conflict",
            Self::NotFound(_) => "not_found",
            Self::PaymentFailure { .. } => "payment_failure",
            Self::Store(_) => "store",
            Self::Provider(_) => "provider",
        }
    }
}
