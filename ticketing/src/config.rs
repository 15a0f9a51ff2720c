//! Configuration management for the ticketing engine.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The defaults reproduce the standard pricing schedule:
//!
//! | days-to-event (d) | STANDARD adjustment |
//! |---|---|
//! | d > 30 | +10% |
//! | 7 < d ≤ 30 | +20% |
//! | 1 < d ≤ 7 | +50% |
//! | d ≤ 1 | −20% |

use serde::{Deserialize, Serialize};
use std::env;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Pricing schedule
    pub pricing: PricingConfig,
    /// Service-level settings (logging, metrics)
    pub service: ServiceConfig,
}

/// Pricing schedule for generated tickets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Fixed VIP markup over the base price, in percent
    pub vip_markup_percent: i32,
    /// Above this many days out, the far adjustment applies
    pub far_threshold_days: i64,
    /// STANDARD adjustment when the event is more than `far_threshold_days` away
    pub far_adjust_percent: i32,
    /// Above this many days out (and up to the far threshold), the near adjustment applies
    pub near_threshold_days: i64,
    /// STANDARD adjustment between the near and far thresholds
    pub near_adjust_percent: i32,
    /// Above this many days out (and up to the near threshold), the final-week adjustment applies
    pub last_minute_threshold_days: i64,
    /// STANDARD adjustment in the final week
    pub final_week_adjust_percent: i32,
    /// STANDARD adjustment at or below the last-minute threshold
    pub last_minute_adjust_percent: i32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            vip_markup_percent: 50,
            far_threshold_days: 30,
            far_adjust_percent: 10,
            near_threshold_days: 7,
            near_adjust_percent: 20,
            last_minute_threshold_days: 1,
            final_week_adjust_percent: 50,
            last_minute_adjust_percent: -20,
        }
    }
}

impl PricingConfig {
    /// Load the pricing schedule from `PRICING_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vip_markup_percent: parse_env("PRICING_VIP_MARKUP_PERCENT")
                .unwrap_or(defaults.vip_markup_percent),
            far_threshold_days: parse_env("PRICING_FAR_THRESHOLD_DAYS")
                .unwrap_or(defaults.far_threshold_days),
            far_adjust_percent: parse_env("PRICING_FAR_ADJUST_PERCENT")
                .unwrap_or(defaults.far_adjust_percent),
            near_threshold_days: parse_env("PRICING_NEAR_THRESHOLD_DAYS")
                .unwrap_or(defaults.near_threshold_days),
            near_adjust_percent: parse_env("PRICING_NEAR_ADJUST_PERCENT")
                .unwrap_or(defaults.near_adjust_percent),
            last_minute_threshold_days: parse_env("PRICING_LAST_MINUTE_THRESHOLD_DAYS")
                .unwrap_or(defaults.last_minute_threshold_days),
            final_week_adjust_percent: parse_env("PRICING_FINAL_WEEK_ADJUST_PERCENT")
                .unwrap_or(defaults.final_week_adjust_percent),
            last_minute_adjust_percent: parse_env("PRICING_LAST_MINUTE_ADJUST_PERCENT")
                .unwrap_or(defaults.last_minute_adjust_percent),
        }
    }

    /// Check the schedule is usable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found: thresholds must be
    /// strictly decreasing and no adjustment may go below −100%.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.far_threshold_days > self.near_threshold_days
            && self.near_threshold_days > self.last_minute_threshold_days)
        {
            return Err(format!(
                "Pricing thresholds must be strictly decreasing (far {}, near {}, last minute {})",
                self.far_threshold_days, self.near_threshold_days, self.last_minute_threshold_days
            ));
        }

        let adjustments = [
            ("vip_markup_percent", self.vip_markup_percent),
            ("far_adjust_percent", self.far_adjust_percent),
            ("near_adjust_percent", self.near_adjust_percent),
            ("final_week_adjust_percent", self.final_week_adjust_percent),
            ("last_minute_adjust_percent", self.last_minute_adjust_percent),
        ];
        if let Some((name, value)) = adjustments.iter().find(|(_, value)| *value < -100) {
            return Err(format!("{name} must be at least -100 (got {value})"));
        }

        Ok(())
    }
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Whether to install the Prometheus recorder
    pub metrics_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            pricing: PricingConfig::from_env(),
            service: ServiceConfig {
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_enabled: parse_env("METRICS_ENABLED").unwrap_or(true),
            },
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
