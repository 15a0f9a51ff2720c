//! # Box Office Testing
//!
//! Testing utilities and collaborator doubles for the box office engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - An in-memory venue catalog implementing `CapacityProvider`
//! - A configurable mock payment gateway
//!
//! ## Example
//!
//! ```
//! use boxoffice_core::types::{EventId, VenueId};
//! use boxoffice_testing::{InMemoryVenueCatalog, SectionLayout};
//!
//! let catalog = InMemoryVenueCatalog::new();
//! catalog.add_seated_venue(VenueId::new(1), vec![SectionLayout::uniform("Floor", 2, 5)]);
//! catalog.schedule_event(VenueId::new(1), EventId::new(10)).unwrap();
//! assert_eq!(catalog.seats_for_event(EventId::new(10)).len(), 10);
//! ```

pub mod payment_mocks;
pub mod venue_catalog;

use boxoffice_core::environment::Clock;
use chrono::{DateTime, Utc};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Used to check behaviour that depends on "now" changing between calls,
    /// such as price freezing.
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Jump to an absolute time
        pub fn set(&self, time: DateTime<Utc>) {
            if let Ok(mut guard) = self.time.write() {
                *guard = time;
            }
        }

        /// Move forward by `by`
        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut guard) = self.time.write() {
                *guard += by;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .read()
                .map_or_else(|poisoned| *poisoned.into_inner(), |guard| *guard)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// The instant [`test_clock`] is frozen at
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use boxoffice_core::types::{EventDate, EventId, EventInfo, VenueId};
    use chrono::{DateTime, Duration, Utc};

    /// An event at `venue_id` starting `days` whole days after `now`
    #[must_use]
    pub fn event_in_days(
        event_id: EventId,
        venue_id: VenueId,
        now: DateTime<Utc>,
        days: i64,
    ) -> EventInfo {
        EventInfo::new(
            event_id,
            venue_id,
            format!("Test event {event_id}"),
            EventDate::new(now + Duration::days(days)),
        )
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};
pub use payment_mocks::MockPaymentGateway;
pub use venue_catalog::{InMemoryVenueCatalog, RowLayout, SectionLayout};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(test_epoch());
        clock.advance(Duration::days(3));
        assert_eq!(clock.now(), test_epoch() + Duration::days(3));
        clock.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }
}
