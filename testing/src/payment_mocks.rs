//! Mock payment gateway for development and testing.
//!
//! Simulates a processor that approves every charge, declines every charge, or
//! follows a script of outcomes. Every call is recorded so tests can assert on
//! what was charged.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap on lock poisoning

use boxoffice_core::payment::{GatewayResult, PaymentGateway, PaymentGatewayError, PaymentTransaction};
use boxoffice_core::types::{CustomerId, Money};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Approve,
    Decline(String),
    Scripted(Arc<Mutex<VecDeque<bool>>>),
}

/// Mock payment gateway
#[derive(Debug, Clone)]
pub struct MockPaymentGateway {
    behavior: Behavior,
    latency: Option<Duration>,
    calls: Arc<Mutex<Vec<(CustomerId, Money)>>>,
}

impl MockPaymentGateway {
    /// Gateway that approves every charge
    #[must_use]
    pub fn approving() -> Self {
        Self::with_behavior(Behavior::Approve)
    }

    /// Gateway that declines every charge with `reason`
    #[must_use]
    pub fn declining(reason: &str) -> Self {
        Self::with_behavior(Behavior::Decline(reason.to_string()))
    }

    /// Gateway that pops one outcome per call (`true` = approve).
    ///
    /// Once the script runs out every further call is declined.
    #[must_use]
    pub fn scripted(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self::with_behavior(Behavior::Scripted(Arc::new(Mutex::new(
            outcomes.into_iter().collect(),
        ))))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            latency: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Simulate network delay on every call
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every `(customer, amount)` charged so far, approved or not
    #[must_use]
    pub fn calls(&self) -> Vec<(CustomerId, Money)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Result<(), PaymentGatewayError> {
        match &self.behavior {
            Behavior::Approve => Ok(()),
            Behavior::Decline(reason) => Err(PaymentGatewayError::Declined {
                reason: reason.clone(),
            }),
            Behavior::Scripted(script) => match script.lock().unwrap().pop_front() {
                Some(true) => Ok(()),
                Some(false) => Err(PaymentGatewayError::Declined {
                    reason: "scripted decline".to_string(),
                }),
                None => Err(PaymentGatewayError::Other {
                    message: "payment script exhausted".to_string(),
                }),
            },
        }
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::approving()
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn process_payment(
        &self,
        customer_id: CustomerId,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<PaymentTransaction>> + Send + '_>> {
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            self.calls.lock().unwrap().push((customer_id, amount));
            self.next_outcome()?;

            let transaction_id = format!("mock_txn_{}", uuid::Uuid::new_v4());
            tracing::info!(
                %customer_id,
                amount = amount.cents(),
                transaction_id = %transaction_id,
                "Mock payment processed successfully"
            );

            Ok(PaymentTransaction {
                transaction_id,
                customer_id,
                amount,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_payment_success() {
        let gateway = MockPaymentGateway::approving();
        let amount = Money::from_dollars(100);

        let transaction = gateway
            .process_payment(CustomerId::new(1), amount)
            .await
            .unwrap();

        assert_eq!(transaction.amount, amount);
        assert!(transaction.transaction_id.starts_with("mock_txn_"));
        assert_eq!(gateway.calls(), vec![(CustomerId::new(1), amount)]);
    }

    #[tokio::test]
    async fn test_mock_payment_declined() {
        let gateway = MockPaymentGateway::declining("card expired");
        let result = gateway
            .process_payment(CustomerId::new(1), Money::from_dollars(5))
            .await;
        assert_eq!(
            result,
            Err(PaymentGatewayError::Declined {
                reason: "card expired".to_string()
            })
        );
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let gateway = MockPaymentGateway::scripted([false, true]);
        let customer = CustomerId::new(3);
        assert!(gateway.process_payment(customer, Money::ZERO).await.is_err());
        assert!(gateway.process_payment(customer, Money::ZERO).await.is_ok());
        assert!(gateway.process_payment(customer, Money::ZERO).await.is_err());
    }
}
