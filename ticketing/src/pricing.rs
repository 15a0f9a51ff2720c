//! Tiered dynamic pricing.
//!
//! EARLY_BIRD sells at the base price and VIP at a fixed markup over it. STANDARD
//! is priced by how many whole days remain until the event starts, using the
//! schedule in [`PricingConfig`]. Prices are frozen on the ticket at generation;
//! [`PricingPolicy::current_price`] only quotes.

use crate::config::PricingConfig;
use crate::error::{Result, TicketingError};
use boxoffice_core::types::{EventDate, Money, Ticket, TicketTier};
use chrono::{DateTime, Utc};

/// Pure pricing rules, parameterized by a [`PricingConfig`]
#[derive(Debug, Clone, Default)]
pub struct PricingPolicy {
    config: PricingConfig,
}

impl PricingPolicy {
    /// Creates a policy from a pricing schedule
    #[must_use]
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Returns the schedule in use
    #[must_use]
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Whole days from `now` until the event starts.
    ///
    /// Partial days are truncated toward zero, so an event 23 hours away is
    /// 0 days out. Events in the past yield negative values.
    #[must_use]
    pub fn days_until(event_start: EventDate, now: DateTime<Utc>) -> i64 {
        (event_start.inner() - now).num_days()
    }

    /// STANDARD adjustment in percent for an event `days` away
    #[must_use]
    pub const fn standard_adjustment(&self, days: i64) -> i32 {
        let c = &self.config;
        if days > c.far_threshold_days {
            c.far_adjust_percent
        } else if days > c.near_threshold_days {
            c.near_adjust_percent
        } else if days > c.last_minute_threshold_days {
            c.final_week_adjust_percent
        } else {
            c.last_minute_adjust_percent
        }
    }

    /// STANDARD price for an event starting at `event_start`, evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the schedule holds an adjustment below −100% or the
    /// result overflows.
    pub fn dynamic_standard_price(
        &self,
        base_price: Money,
        event_start: EventDate,
        now: DateTime<Utc>,
    ) -> Result<Money> {
        let days = Self::days_until(event_start, now);
        let percent = self.standard_adjustment(days);
        tracing::trace!(days, percent, base = base_price.cents(), "Computing STANDARD price");
        Self::adjust_price(base_price, percent)
    }

    /// Generation-time price for one tier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on an unusable schedule or overflow.
    pub fn tier_price(
        &self,
        tier: TicketTier,
        base_price: Money,
        event_start: EventDate,
        now: DateTime<Utc>,
    ) -> Result<Money> {
        match tier {
            TicketTier::EarlyBird => Ok(base_price),
            TicketTier::Vip => Self::adjust_price(base_price, self.config.vip_markup_percent),
            TicketTier::Standard => self.dynamic_standard_price(base_price, event_start, now),
        }
    }

    /// Scales `price` by `(1 + percentage / 100)`.
    ///
    /// A percentage of zero returns the price unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `percentage < -100` or the result overflows.
    pub fn adjust_price(price: Money, percentage: i32) -> Result<Money> {
        if percentage < -100 {
            return Err(TicketingError::Validation(format!(
                "Price adjustment of {percentage}% would produce a negative price"
            )));
        }
        if percentage == 0 {
            return Ok(price);
        }
        price.checked_adjust_percent(percentage).ok_or_else(|| {
            TicketingError::Validation(format!("Adjusting {price} by {percentage}% overflows"))
        })
    }

    /// Live quote for a ticket without touching its stored price.
    ///
    /// STANDARD tickets are re-evaluated against the schedule from `base_price`;
    /// EARLY_BIRD and VIP quote their frozen price.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on an unusable schedule or overflow.
    pub fn current_price(
        &self,
        ticket: &Ticket,
        base_price: Money,
        event_start: EventDate,
        now: DateTime<Utc>,
    ) -> Result<Money> {
        match ticket.tier {
            TicketTier::Standard => self.dynamic_standard_price(base_price, event_start, now),
            TicketTier::EarlyBird | TicketTier::Vip => Ok(ticket.price),
        }
    }
}
