//! Business metrics for the ticket inventory engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `boxoffice_tickets_generated_total{tier}` - Tickets created by generation
//! - `boxoffice_holds_total{outcome}` - Hold attempts (`held`, `rejected`)
//! - `boxoffice_releases_total` - Held tickets returned to the pool
//! - `boxoffice_tickets_sold_total` - Tickets sold
//! - `boxoffice_sales_cancelled_total` - Sales reverted by `unsell`
//! - `boxoffice_checkouts_total{status}` - Checkouts (`completed`, `declined`, `failed`)
//! - `boxoffice_revenue_cents_total` - Revenue from completed checkouts
//!
//! ## Gauges
//! - `boxoffice_tickets_available{event_id}` - Available tickets per event

use boxoffice_core::types::{EventId, Money, TicketTier};
use metrics::{describe_counter, describe_gauge};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "boxoffice_tickets_generated_total",
        "Total number of tickets generated, by tier"
    );
    describe_counter!(
        "boxoffice_holds_total",
        "Hold attempts by outcome (held, rejected)"
    );
    describe_counter!(
        "boxoffice_releases_total",
        "Held tickets released back to the available pool"
    );
    describe_counter!("boxoffice_tickets_sold_total", "Total number of tickets sold");
    describe_counter!(
        "boxoffice_sales_cancelled_total",
        "Sales reverted by cancellation"
    );
    describe_counter!(
        "boxoffice_checkouts_total",
        "Checkouts by status (completed, declined, failed)"
    );
    describe_counter!(
        "boxoffice_revenue_cents_total",
        "Total revenue from completed checkouts in cents"
    );
    describe_gauge!(
        "boxoffice_tickets_available",
        "Current number of available tickets per event"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record tickets created for one tier.
pub fn record_tickets_generated(tier: TicketTier, count: u32) {
    if count == 0 {
        return;
    }
    metrics::counter!("boxoffice_tickets_generated_total", "tier" => tier.as_str())
        .increment(u64::from(count));
}

/// Record a hold attempt.
pub fn record_hold(succeeded: bool) {
    let outcome = if succeeded { "held" } else { "rejected" };
    metrics::counter!("boxoffice_holds_total", "outcome" => outcome).increment(1);
}

/// Record a held ticket being released.
pub fn record_release() {
    metrics::counter!("boxoffice_releases_total").increment(1);
}

/// Record a ticket sale.
pub fn record_ticket_sold() {
    metrics::counter!("boxoffice_tickets_sold_total").increment(1);
}

/// Record a cancelled sale.
pub fn record_sale_cancelled() {
    metrics::counter!("boxoffice_sales_cancelled_total").increment(1);
}

/// Record a completed checkout.
pub fn record_checkout_completed(total: Money) {
    metrics::counter!("boxoffice_checkouts_total", "status" => "completed").increment(1);
    metrics::counter!("boxoffice_revenue_cents_total").increment(total.cents());
    tracing::debug!(total_cents = total.cents(), "Recorded checkout_completed metric");
}

/// Record a checkout the payment capability declined.
pub fn record_checkout_declined() {
    metrics::counter!("boxoffice_checkouts_total", "status" => "declined").increment(1);
}

/// Record a checkout that failed before payment.
///
/// # Arguments
///
/// * `reason` - Error kind label (e.g., `state_conflict`)
pub fn record_checkout_failed(reason: &'static str) {
    metrics::counter!("boxoffice_checkouts_total", "status" => "failed", "reason" => reason)
        .increment(1);
}

/// Update available tickets gauge for an event.
pub fn update_tickets_available(event_id: EventId, available: u32) {
    metrics::gauge!("boxoffice_tickets_available", "event_id" => event_id.to_string())
        .set(f64::from(available));
    tracing::debug!(%event_id, available, "Updated tickets_available metric");
}
