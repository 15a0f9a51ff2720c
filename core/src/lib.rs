//! # Box Office Core
//!
//! Domain types and collaborator ports for the ticket inventory engine.
//!
//! The engine never owns venues, events, customers or payments. It talks to them
//! through the narrow traits defined here, injected as `Arc<dyn Trait>`:
//!
//! - [`store::TicketStore`]: authoritative ticket records, keyed by integer id
//! - [`capacity::CapacityProvider`]: seat maps and general-admission counts
//! - [`payment::PaymentGateway`]: the external "charge this amount" capability
//! - [`environment::Clock`]: the only source of "now"
//!
//! ## Ticket lifecycle
//!
//! ```text
//!  ┌───────────┐  hold   ┌──────┐  sell   ┌──────┐
//!  │ Available │ ──────► │ Held │ ──────► │ Sold │
//!  └───────────┘ ◄────── └──────┘         └──────┘
//!        ▲       release                      │
//!        └────────────── unsell ──────────────┘
//! ```
//!
//! Seats and tickets reference each other by id only (see [`types::Seat::ticket_id`]
//! and [`types::Ticket::seat_id`]); neither owns the other.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod capacity;
pub mod payment;
pub mod store;
pub mod types;

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// into the components that need them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
