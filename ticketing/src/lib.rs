//! Ticketing - ticket inventory and reservation engine
//!
//! Sells tickets to scheduled events at seat-mapped or general-admission venues.
//! The engine covers the inventory lifecycle only:
//!
//! - **Generation**: a fixed, non-overlapping pool of tickets per event, split
//!   into EARLY_BIRD, VIP and STANDARD tiers
//! - **Dynamic pricing**: STANDARD priced by days remaining until the event
//! - **Holds**: a ticket attached exclusively to one cart
//! - **Checkout**: all-or-nothing sale of a cart, contingent on payment
//!
//! Venues, customers and payments are external collaborators reached through the
//! ports in `boxoffice_core`.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!                    │  BoxOffice   │
//!                    └──────────────┘
//!          ┌────────────────┼─────────────────┐
//!          ▼                ▼                 ▼
//! ┌─────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ TicketGenerator │ │ Reservation  │◄│ CartService  │──► PaymentGateway
//! └─────────────────┘ │   Manager    │ └──────────────┘
//!          │          └──────────────┘
//!          │                 │
//!          ▼                 ▼
//! ┌──────────────────────────────────┐ ┌──────────────────┐
//! │ TicketStore (InMemoryTicketStore)│ │ CapacityProvider │
//! └──────────────────────────────────┘ └──────────────────┘
//! ```
//!
//! # Key Guarantees
//!
//! ## 1. No double-sell
//!
//! Transitions run under a per-ticket lock, and a seat's `reserved` flag is
//! written with compare-and-set, so at most one SOLD ticket ever references a
//! seat.
//!
//! ## 2. All-or-nothing generation and checkout
//!
//! Generation that exceeds capacity persists nothing. A checkout whose payment is
//! declined leaves every ticket HELD in the cart:
//!
//! ```text
//! Checkout Flow:
//! 1. Sell every held ticket (seats reserved)
//! 2. Charge the customer (no locks held)
//! 3a. Approved → cart processed, receipt returned
//! 3b. Declined → sales reverted to holds → PaymentFailure
//! ```
//!
//! ## 3. Price freeze
//!
//! Prices are computed once at generation. Re-pricing is an explicit batch
//! ([`ReservationManager::reprice_unsold_standard_tickets`]) and live quotes never
//! write ([`PricingPolicy::current_price`]).
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use boxoffice_core::types::{EventId, Money, VenueId};
//! use boxoffice_testing::{InMemoryVenueCatalog, SectionLayout, test_clock, test_epoch};
//! use boxoffice_testing::helpers::event_in_days;
//! use ticketing::{BoxOffice, Config, GenerationRequest};
//!
//! # tokio_test::block_on(async {
//! let catalog = InMemoryVenueCatalog::new();
//! catalog.add_seated_venue(VenueId::new(1), vec![SectionLayout::uniform("Floor", 1, 10)]);
//! catalog.schedule_event(VenueId::new(1), EventId::new(1)).unwrap();
//!
//! let office = BoxOffice::in_memory(Config::default(), Arc::new(catalog), Arc::new(test_clock())).unwrap();
//! let event = event_in_days(EventId::new(1), VenueId::new(1), test_epoch(), 40);
//! let tickets = office
//!     .generator
//!     .generate(&event, GenerationRequest::new(Money::from_dollars(100), 2, 1, 3))
//!     .await
//!     .unwrap();
//! assert_eq!(tickets.len(), 6);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cart;
pub mod config;
pub mod error;
pub mod generator;
pub mod inventory;
pub mod metrics;
pub mod pricing;
pub mod reservation;

pub use app::BoxOffice;
pub use cart::{Cart, CartService, Receipt};
pub use config::{Config, PricingConfig, ServiceConfig};
pub use error::{ConflictKind, Resource, Result, TicketingError};
pub use generator::{GenerationRequest, TicketGenerator};
pub use inventory::{InMemoryTicketStore, InventorySummary, TierCounts};
pub use pricing::PricingPolicy;
pub use reservation::ReservationManager;
