//! Carts and checkout.
//!
//! A cart belongs to one customer and one event. Adding a ticket holds it;
//! removing or clearing releases it. Checkout sells every member, then charges
//! the customer outside every ticket lock. A declined charge reverts each sale
//! back to a hold in the same cart, so the customer can retry or abandon.

use crate::error::{ConflictKind, Result, TicketingError};
use crate::metrics;
use crate::reservation::ReservationManager;
use boxoffice_core::environment::Clock;
use boxoffice_core::payment::PaymentGateway;
use boxoffice_core::types::{CartId, CustomerId, EventId, Money, Ticket, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A customer's selection of held tickets for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    customer_id: CustomerId,
    event_id: EventId,
    tickets: Vec<TicketId>,
    payment_processed: bool,
}

impl Cart {
    /// Cart identity
    #[must_use]
    pub const fn id(&self) -> CartId {
        self.id
    }

    /// Owner of the cart
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Event every member ticket belongs to
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Member tickets, in the order they were added
    #[must_use]
    pub fn tickets(&self) -> &[TicketId] {
        &self.tickets
    }

    /// Whether the cart has been paid for. A processed cart takes no new tickets.
    #[must_use]
    pub const fn is_payment_processed(&self) -> bool {
        self.payment_processed
    }

    /// Whether the cart has no tickets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    fn contains(&self, ticket_id: TicketId) -> bool {
        self.tickets.contains(&ticket_id)
    }
}

/// Proof of a completed checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Cart that was checked out
    pub cart_id: CartId,
    /// Buyer
    pub customer_id: CustomerId,
    /// Event the tickets admit to
    pub event_id: EventId,
    /// Tickets sold, as recorded at sale
    pub tickets: Vec<Ticket>,
    /// Amount charged
    pub total: Money,
    /// Gateway transaction reference
    pub transaction_id: String,
    /// When payment was confirmed
    pub paid_at: DateTime<Utc>,
}

/// Cart operations over the reservation manager
#[derive(Clone)]
pub struct CartService {
    reservations: ReservationManager,
    clock: Arc<dyn Clock>,
    next_cart_id: Arc<AtomicU64>,
}

impl CartService {
    /// Creates a cart service
    #[must_use]
    pub fn new(reservations: ReservationManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            reservations,
            clock,
            next_cart_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Open an empty cart for `customer_id` at `event_id`
    pub fn open(&self, customer_id: CustomerId, event_id: EventId) -> Cart {
        let id = CartId::new(self.next_cart_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(cart_id = %id, %customer_id, %event_id, "Cart opened");
        Cart {
            id,
            customer_id,
            event_id,
            tickets: Vec::new(),
            payment_processed: false,
        }
    }

    /// Hold `ticket_id` and add it to the cart.
    ///
    /// # Errors
    ///
    /// - `Validation` if the ticket belongs to another event
    /// - `StateConflict` if the cart is processed, already has the ticket, or the
    ///   ticket cannot be held
    /// - `NotFound` if the ticket does not exist
    pub async fn add_ticket(&self, cart: &mut Cart, ticket_id: TicketId) -> Result<Ticket> {
        if cart.payment_processed {
            return Err(TicketingError::StateConflict(ConflictKind::CartAlreadyProcessed(cart.id)));
        }
        if cart.contains(ticket_id) {
            return Err(TicketingError::StateConflict(ConflictKind::AlreadyInCart {
                ticket_id,
                cart_id: cart.id,
            }));
        }

        let ticket = self.reservations.ticket(ticket_id).await?;
        if ticket.event_id != cart.event_id {
            return Err(TicketingError::Validation(format!(
                "Ticket {ticket_id} is for event {}, cart {} is for event {}",
                ticket.event_id, cart.id, cart.event_id
            )));
        }

        let held = self.reservations.hold(ticket_id, cart.id, cart.event_id).await?;
        cart.tickets.push(ticket_id);
        Ok(held)
    }

    /// Release `ticket_id` and remove it from the cart.
    ///
    /// # Errors
    ///
    /// `StateConflict` if the ticket is not a member or cannot be released.
    pub async fn remove_ticket(&self, cart: &mut Cart, ticket_id: TicketId) -> Result<Ticket> {
        if !cart.contains(ticket_id) {
            return Err(TicketingError::StateConflict(ConflictKind::NotInCart {
                ticket_id,
                cart_id: cart.id,
            }));
        }

        let released = self.reservations.release(ticket_id).await?;
        cart.tickets.retain(|id| *id != ticket_id);
        Ok(released)
    }

    /// Release every ticket in the cart.
    ///
    /// Tickets that fail to release stay in the cart.
    ///
    /// # Errors
    ///
    /// The first release failure, after every ticket has been attempted.
    pub async fn clear(&self, cart: &mut Cart) -> Result<()> {
        let mut first_error = None;
        let mut kept = Vec::new();
        for ticket_id in std::mem::take(&mut cart.tickets) {
            if let Err(error) = self.reservations.release(ticket_id).await {
                tracing::warn!(cart_id = %cart.id, %ticket_id, %error, "Could not release ticket");
                kept.push(ticket_id);
                first_error.get_or_insert(error);
            }
        }
        cart.tickets = kept;
        tracing::debug!(cart_id = %cart.id, remaining = cart.tickets.len(), "Cart cleared");
        first_error.map_or(Ok(()), Err)
    }

    /// Sum of the member tickets' current stored prices.
    ///
    /// # Errors
    ///
    /// `NotFound` if a member no longer exists, `Validation` on overflow.
    pub async fn calculate_total(&self, cart: &Cart) -> Result<Money> {
        let mut prices = Vec::with_capacity(cart.tickets.len());
        for ticket_id in &cart.tickets {
            prices.push(self.reservations.ticket(*ticket_id).await?.price);
        }
        Money::checked_sum(prices)
            .ok_or_else(|| TicketingError::Validation(format!("Total of cart {} overflows", cart.id)))
    }

    /// Sell every ticket in the cart to `customer_id` and charge them.
    ///
    /// All-or-nothing: if any sale fails or payment is declined, every sale made
    /// by this call is reverted and the tickets stay held in the cart. The
    /// amount charged is the sum of the prices the tickets were sold at.
    ///
    /// # Errors
    ///
    /// - `StateConflict` if the cart was already processed or a sale is refused
    /// - `Validation` if the cart is empty or `customer_id` is not its owner
    /// - `PaymentFailure` if the gateway declines
    #[tracing::instrument(skip(self, cart, gateway), fields(cart_id = %cart.id, event_id = %cart.event_id))]
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        customer_id: CustomerId,
        gateway: &dyn PaymentGateway,
    ) -> Result<Receipt> {
        let result = self.checkout_inner(cart, customer_id, gateway).await;
        match &result {
            Ok(receipt) => metrics::record_checkout_completed(receipt.total),
            Err(TicketingError::PaymentFailure { .. }) => metrics::record_checkout_declined(),
            Err(error) => metrics::record_checkout_failed(error.kind()),
        }
        result
    }

    async fn checkout_inner(
        &self,
        cart: &mut Cart,
        customer_id: CustomerId,
        gateway: &dyn PaymentGateway,
    ) -> Result<Receipt> {
        if cart.payment_processed {
            return Err(TicketingError::StateConflict(ConflictKind::CartAlreadyProcessed(cart.id)));
        }
        if customer_id != cart.customer_id {
            return Err(TicketingError::Validation(format!(
                "Customer {customer_id} does not own cart {}",
                cart.id
            )));
        }
        if cart.is_empty() {
            return Err(TicketingError::Validation(format!("Cart {} is empty", cart.id)));
        }

        let members = cart.tickets.clone();
        let mut sold = Vec::with_capacity(members.len());
        for ticket_id in &members {
            match self.reservations.sell(*ticket_id, cart.id, customer_id).await {
                Ok(ticket) => sold.push(ticket),
                Err(error) => {
                    tracing::warn!(%ticket_id, %error, sold = sold.len(), "Sale failed, reverting checkout");
                    self.revert(cart, &sold).await;
                    return Err(error);
                }
            }
        }

        // Sold prices are final, so this is exactly what the receipt records
        let Some(total) = Money::checked_sum(sold.iter().map(|ticket| ticket.price)) else {
            self.revert(cart, &sold).await;
            return Err(TicketingError::Validation(format!("Total of cart {} overflows", cart.id)));
        };

        // No ticket lock is held past this point
        let transaction = match gateway.process_payment(customer_id, total).await {
            Ok(transaction) => transaction,
            Err(error) => {
                tracing::warn!(%customer_id, total = %total, %error, "Payment declined, reverting checkout");
                self.revert(cart, &sold).await;
                return Err(TicketingError::PaymentFailure {
                    reason: error.to_string(),
                });
            }
        };

        cart.payment_processed = true;
        cart.tickets.clear();

        tracing::info!(
            %customer_id,
            tickets = sold.len(),
            total = %total,
            transaction_id = %transaction.transaction_id,
            "Checkout completed"
        );

        Ok(Receipt {
            cart_id: cart.id,
            customer_id,
            event_id: cart.event_id,
            tickets: sold,
            total,
            transaction_id: transaction.transaction_id,
            paid_at: self.clock.now(),
        })
    }

    /// Put every sold ticket back on hold in `cart`. A ticket whose sale was
    /// changed underneath the checkout (cancelled, say) cannot be held again and
    /// leaves the cart.
    async fn revert(&self, cart: &mut Cart, sold: &[Ticket]) {
        for ticket in sold {
            if let Err(error) = self.reservations.revert_sale(ticket.id, cart.id).await {
                tracing::error!(ticket_id = %ticket.id, cart_id = %cart.id, %error, "Failed to revert sale, dropping ticket from cart");
                cart.tickets.retain(|id| *id != ticket.id);
            }
        }
    }
}
