//! Payment gateway abstraction.
//!
//! The engine treats payment as an external capability: "charge this customer
//! this amount" either succeeds or is declined. Concrete processors (Stripe,
//! `PayPal`, ...) live outside this workspace.

use crate::types::{CustomerId, Money};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentGatewayError {
    /// Payment declined by the processor
    #[error("Payment declined: {reason}")]
    Declined {
        /// Decline reason
        reason: String,
    },
    /// Insufficient funds
    #[error("Insufficient funds")]
    InsufficientFunds,
    /// Gateway timeout
    #[error("Gateway timeout")]
    Timeout,
    /// Other error
    #[error("Payment error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Payment gateway transaction result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Customer charged
    pub customer_id: CustomerId,
    /// Amount charged
    pub amount: Money,
}

/// Payment gateway trait
///
/// Abstraction over payment processors. Implementations must not be called while
/// any ticket lock is held; the cart service guarantees this.
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` to `customer_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the payment is declined or the gateway fails
    fn process_payment(
        &self,
        customer_id: CustomerId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentTransaction>> + Send + '_>>;
}
