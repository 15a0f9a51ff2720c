//! Ticket store trait and related types.
//!
//! The ticket store owns the authoritative set of [`Ticket`] records for every
//! event. The persistence backend (in-memory map, flat file, relational database)
//! is an interchangeable implementation detail behind this trait.
//!
//! # Implementations
//!
//! - `InMemoryTicketStore` (in the `ticketing` crate): `BTreeMap`-backed store

use crate::types::{CartId, CustomerId, EventId, NewTicket, Ticket, TicketId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during ticket store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No ticket with this id exists.
    #[error("Ticket not found: {0}")]
    NotFound(TicketId),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Repository of ticket records keyed by integer identity.
///
/// All listing operations return tickets ordered by ascending id so callers get
/// reproducible results regardless of backend.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be shared as `Arc<dyn TicketStore>`.
pub trait TicketStore: Send + Sync {
    /// Persist a batch of new tickets, assigning each a fresh id.
    ///
    /// The batch is all-or-nothing: either every ticket is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the batch could not be stored.
    fn insert_all(
        &self,
        tickets: Vec<NewTicket>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Overwrite an existing ticket.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no ticket with `ticket.id` exists.
    fn save(&self, ticket: Ticket) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Look up a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the lookup failed. A missing ticket is `Ok(None)`.
    fn find_by_id(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>>;

    /// All tickets generated for an event.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the query failed.
    fn find_by_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Tickets currently held by a cart.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the query failed.
    fn find_by_cart(
        &self,
        cart_id: CartId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Tickets sold to a customer.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the query failed.
    fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;

    /// Remove a ticket, returning the removed record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no ticket with this id exists.
    fn delete(&self, id: TicketId) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>>;

    /// Every ticket in the store.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the query failed.
    fn all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>>;
}
