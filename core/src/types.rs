//! Domain types for the ticket inventory engine.
//!
//! Value objects (identifiers, money, dates), the ticket record and its lifecycle
//! status, and the seat/event views handed over by external collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[doc = concat!("Creates a `", stringify!($name), "` from its integer value")]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the integer value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Unique identifier for a ticket, assigned by the ticket store
    TicketId
);
integer_id!(
    /// Unique identifier for a seat, owned by the capacity provider
    SeatId
);
integer_id!(
    /// Unique identifier for a cart
    CartId
);
integer_id!(
    /// Unique identifier for a scheduled event
    EventId
);
integer_id!(
    /// Unique identifier for a venue
    VenueId
);
integer_id!(
    /// Unique identifier for a customer
    CustomerId
);

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use `checked_from_dollars` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Scales the amount by `(1 + percent / 100)`.
    ///
    /// Positive percentages are a markup, negative ones a discount. Fractions of a
    /// cent are truncated. Returns `None` when `percent < -100` (the result would
    /// be negative) or on overflow.
    #[must_use]
    pub const fn checked_adjust_percent(self, percent: i32) -> Option<Self> {
        if percent < -100 {
            return None;
        }

        let magnitude = percent.unsigned_abs() as u64;
        let delta = match self.0.checked_mul(magnitude) {
            Some(product) => product / 100,
            None => return None,
        };

        if percent >= 0 {
            match self.0.checked_add(delta) {
                Some(result) => Some(Self(result)),
                None => None,
            }
        } else {
            // delta <= self.0 because magnitude <= 100
            Some(Self(self.0 - delta))
        }
    }

    /// Sums an iterator of amounts, returning `None` on overflow
    #[must_use]
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Time Value Objects
// ============================================================================

/// Wrapper for event start date with ordering and comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventDate(DateTime<Utc>);

impl EventDate {
    /// Creates a new `EventDate`
    #[must_use]
    pub const fn new(date: DateTime<Utc>) -> Self {
        Self(date)
    }

    /// Returns the inner `DateTime`
    #[must_use]
    pub const fn inner(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M UTC"))
    }
}

// ============================================================================
// Events and Seats (owned by external collaborators)
// ============================================================================

/// The slice of a scheduled event the engine needs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Event identifier
    pub id: EventId,
    /// Venue hosting the event
    pub venue_id: VenueId,
    /// Display name (e.g., "Summer Music Festival")
    pub name: String,
    /// When the event starts
    pub starts_at: EventDate,
}

impl EventInfo {
    /// Creates a new `EventInfo`
    #[must_use]
    pub const fn new(id: EventId, venue_id: VenueId, name: String, starts_at: EventDate) -> Self {
        Self {
            id,
            venue_id,
            name,
            starts_at,
        }
    }
}

/// A free seat as reported by the capacity provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRef {
    /// Seat identifier
    pub id: SeatId,
    /// Section name (e.g., "Balcony")
    pub section: String,
    /// Row label within the section
    pub row: String,
    /// Seat number within the row
    pub number: u32,
}

/// A physical seat for one event.
///
/// The capacity provider is the source of truth for `reserved`. The link to the
/// ticket occupying the seat is held by id, never by reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Seat identifier
    pub id: SeatId,
    /// Venue the seat belongs to
    pub venue_id: VenueId,
    /// Event this seat record is scoped to
    pub event_id: EventId,
    /// Section name
    pub section: String,
    /// Row label
    pub row: String,
    /// Seat number within the row
    pub number: u32,
    /// Whether the seat is reserved by a sold ticket
    pub reserved: bool,
    /// Ticket generated for this seat, if any
    pub ticket_id: Option<TicketId>,
}

impl Seat {
    /// A seat is free when no ticket occupies it and it is not reserved
    #[must_use]
    pub const fn is_free(&self) -> bool {
        !self.reserved && self.ticket_id.is_none()
    }

    /// Returns the lightweight reference for this seat
    #[must_use]
    pub fn to_ref(&self) -> SeatRef {
        SeatRef {
            id: self.id,
            section: self.section.clone(),
            row: self.row.clone(),
            number: self.number,
        }
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Pricing/quality class of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TicketTier {
    /// First to market, sold at the base price
    EarlyBird,
    /// Premium tier, fixed markup over the base price
    Vip,
    /// Dynamically priced by days remaining until the event
    Standard,
}

impl TicketTier {
    /// All tiers in generation order
    pub const ALL: [Self; 3] = [Self::EarlyBird, Self::Vip, Self::Standard];

    /// Stable lowercase label, used for metrics and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EarlyBird => "early_bird",
            Self::Vip => "vip",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for TicketTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EarlyBird => "EARLY_BIRD",
            Self::Vip => "VIP",
            Self::Standard => "STANDARD",
        })
    }
}

/// Lifecycle status of a ticket.
///
/// Holding the cart and sale data inside the variants makes the ticket invariants
/// structural: a sold ticket always has a customer and purchase time and never a
/// cart, and a held ticket is never sold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Free for any cart to hold
    Available,
    /// Held by a cart, not yet sold
    Held {
        /// Cart holding the ticket
        cart_id: CartId,
    },
    /// Sold to a customer
    Sold {
        /// Buyer
        customer_id: CustomerId,
        /// When the sale was committed
        purchased_at: DateTime<Utc>,
    },
}

/// Discriminant view of [`TicketStatus`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketState {
    /// See [`TicketStatus::Available`]
    Available,
    /// See [`TicketStatus::Held`]
    Held,
    /// See [`TicketStatus::Sold`]
    Sold,
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "AVAILABLE",
            Self::Held => "HELD",
            Self::Sold => "SOLD",
        })
    }
}

/// A ticket awaiting persistence (no identity yet)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Seat occupied, for seat-mapped venues
    pub seat_id: Option<SeatId>,
    /// Pricing tier
    pub tier: TicketTier,
    /// Unit price, frozen at generation
    pub price: Money,
}

/// One sellable unit of an event's inventory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identity
    pub id: TicketId,
    /// Event the ticket admits to (immutable after creation)
    pub event_id: EventId,
    /// Seat occupied, present iff the venue is seat-mapped
    pub seat_id: Option<SeatId>,
    /// Pricing tier
    pub tier: TicketTier,
    /// Unit price
    pub price: Money,
    /// Lifecycle status
    pub status: TicketStatus,
}

impl Ticket {
    /// Materializes a new ticket with the given identity, starting `Available`
    #[must_use]
    pub const fn from_new(id: TicketId, new: NewTicket) -> Self {
        Self {
            id,
            event_id: new.event_id,
            seat_id: new.seat_id,
            tier: new.tier,
            price: new.price,
            status: TicketStatus::Available,
        }
    }

    /// Returns the lifecycle state
    #[must_use]
    pub const fn state(&self) -> TicketState {
        match self.status {
            TicketStatus::Available => TicketState::Available,
            TicketStatus::Held { .. } => TicketState::Held,
            TicketStatus::Sold { .. } => TicketState::Sold,
        }
    }

    /// Cart currently holding the ticket
    #[must_use]
    pub const fn cart_id(&self) -> Option<CartId> {
        match self.status {
            TicketStatus::Held { cart_id } => Some(cart_id),
            _ => None,
        }
    }

    /// Customer who bought the ticket
    #[must_use]
    pub const fn customer_id(&self) -> Option<CustomerId> {
        match self.status {
            TicketStatus::Sold { customer_id, .. } => Some(customer_id),
            _ => None,
        }
    }

    /// When the ticket was sold
    #[must_use]
    pub const fn purchased_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            TicketStatus::Sold { purchased_at, .. } => Some(purchased_at),
            _ => None,
        }
    }

    /// Whether the ticket has been sold
    #[must_use]
    pub const fn is_sold(&self) -> bool {
        matches!(self.status, TicketStatus::Sold { .. })
    }
}
