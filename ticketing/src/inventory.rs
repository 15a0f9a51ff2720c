//! In-memory ticket inventory store and availability summaries.
//!
//! [`InMemoryTicketStore`] is the default [`TicketStore`] backend. It keeps
//! tickets in a `BTreeMap` so every listing comes back in ascending id order,
//! plus a per-event index for `find_by_event`.

use boxoffice_core::store::{StoreError, TicketStore};
use boxoffice_core::types::{
    CartId, CustomerId, EventId, Money, NewTicket, Ticket, TicketId, TicketState, TicketTier,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

#[derive(Debug)]
struct StoreState {
    tickets: BTreeMap<TicketId, Ticket>,
    by_event: BTreeMap<EventId, BTreeSet<TicketId>>,
    next_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tickets: BTreeMap::new(),
            by_event: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// `BTreeMap`-backed ticket store.
///
/// Ids are assigned from a counter starting at 1 and are never reused, even
/// after a ticket is deleted.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    state: RwLock<StoreState>,
}

impl InMemoryTicketStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tickets currently stored
    pub async fn len(&self) -> usize {
        self.state.read().await.tickets.len()
    }

    /// Whether the store holds no tickets
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.tickets.is_empty()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<Ticket>
    where
        F: Fn(&Ticket) -> bool + Send,
    {
        self.state
            .read()
            .await
            .tickets
            .values()
            .filter(|ticket| predicate(ticket))
            .cloned()
            .collect()
    }
}

impl TicketStore for InMemoryTicketStore {
    fn insert_all(
        &self,
        tickets: Vec<NewTicket>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;

            let count = u64::try_from(tickets.len())
                .map_err(|_| StoreError::Backend("batch too large".to_string()))?;
            if state.next_id.checked_add(count).is_none() {
                return Err(StoreError::Backend("ticket id space exhausted".to_string()));
            }

            let mut stored = Vec::with_capacity(tickets.len());
            for new in tickets {
                let id = TicketId::new(state.next_id);
                state.next_id += 1;
                let ticket = Ticket::from_new(id, new);
                state.by_event.entry(ticket.event_id).or_default().insert(id);
                state.tickets.insert(id, ticket.clone());
                stored.push(ticket);
            }

            tracing::trace!(count = stored.len(), "Inserted tickets");
            Ok(stored)
        })
    }

    fn save(&self, ticket: Ticket) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let slot = state
                .tickets
                .get_mut(&ticket.id)
                .ok_or(StoreError::NotFound(ticket.id))?;
            if slot.event_id != ticket.event_id {
                return Err(StoreError::Backend(format!(
                    "ticket {} cannot move from event {} to event {}",
                    ticket.id, slot.event_id, ticket.event_id
                )));
            }
            *slot = ticket;
            Ok(())
        })
    }

    fn find_by_id(
        &self,
        id: TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().await.tickets.get(&id).cloned()) })
    }

    fn find_by_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let tickets: Vec<Ticket> = state
                .by_event
                .get(&event_id)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| state.tickets.get(id).cloned())
                        .collect()
                })
                .unwrap_or_default();
            Ok(tickets)
        })
    }

    fn find_by_cart(
        &self,
        cart_id: CartId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.filtered(|t| t.cart_id() == Some(cart_id)).await) })
    }

    fn find_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self
                .filtered(|t| t.customer_id() == Some(customer_id))
                .await)
        })
    }

    fn delete(&self, id: TicketId) -> Pin<Box<dyn Future<Output = Result<Ticket, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let ticket = state.tickets.remove(&id).ok_or(StoreError::NotFound(id))?;
            if let Some(ids) = state.by_event.get_mut(&ticket.event_id) {
                ids.remove(&id);
                if ids.is_empty() {
                    state.by_event.remove(&ticket.event_id);
                }
            }
            Ok(ticket)
        })
    }

    fn all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Ticket>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.state.read().await.tickets.values().cloned().collect()) })
    }
}

// ============================================================================
// Availability Summary
// ============================================================================

/// Ticket counts for one tier of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    /// Tickets free to hold
    pub available: u32,
    /// Tickets held by carts
    pub held: u32,
    /// Tickets sold
    pub sold: u32,
}

impl TierCounts {
    /// All tickets of the tier
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.available + self.held + self.sold
    }
}

/// Point-in-time availability for an event's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    /// Event summarized
    pub event_id: EventId,
    /// Counts per tier, in [`TicketTier::ALL`] order
    pub tiers: BTreeMap<TicketTier, TierCounts>,
    /// Gross revenue of sold tickets
    pub sold_revenue: Money,
}

impl InventorySummary {
    /// Summarizes `tickets`, ignoring any that belong to another event
    #[must_use]
    pub fn for_event(event_id: EventId, tickets: &[Ticket]) -> Self {
        let mut tiers: BTreeMap<TicketTier, TierCounts> =
            TicketTier::ALL.iter().map(|tier| (*tier, TierCounts::default())).collect();
        let mut revenue_cents: u64 = 0;

        for ticket in tickets.iter().filter(|t| t.event_id == event_id) {
            let counts = tiers.entry(ticket.tier).or_default();
            match ticket.state() {
                TicketState::Available => counts.available += 1,
                TicketState::Held => counts.held += 1,
                TicketState::Sold => {
                    counts.sold += 1;
                    revenue_cents = revenue_cents.saturating_add(ticket.price.cents());
                }
            }
        }

        Self {
            event_id,
            tiers,
            sold_revenue: Money::from_cents(revenue_cents),
        }
    }

    /// Counts for one tier
    #[must_use]
    pub fn tier(&self, tier: TicketTier) -> TierCounts {
        self.tiers.get(&tier).copied().unwrap_or_default()
    }

    /// Available tickets across every tier
    #[must_use]
    pub fn available(&self) -> u32 {
        self.tiers.values().map(|c| c.available).sum()
    }

    /// Held tickets across every tier
    #[must_use]
    pub fn held(&self) -> u32 {
        self.tiers.values().map(|c| c.held).sum()
    }

    /// Sold tickets across every tier
    #[must_use]
    pub fn sold(&self) -> u32 {
        self.tiers.values().map(|c| c.sold).sum()
    }

    /// Every ticket generated for the event
    #[must_use]
    pub fn total(&self) -> u32 {
        self.tiers.values().map(TierCounts::total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boxoffice_core::types::TicketStatus;
    use boxoffice_testing::test_epoch;

    fn new_ticket(event: u64, tier: TicketTier, dollars: u64) -> NewTicket {
        NewTicket {
            event_id: EventId::new(event),
            seat_id: None,
            tier,
            price: Money::from_dollars(dollars),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ascending_ids() {
        let store = InMemoryTicketStore::new();
        let first = store
            .insert_all(vec![
                new_ticket(1, TicketTier::Vip, 150),
                new_ticket(1, TicketTier::Standard, 110),
            ])
            .await
            .unwrap();
        let second = store
            .insert_all(vec![new_ticket(2, TicketTier::EarlyBird, 100)])
            .await
            .unwrap();

        let ids: Vec<u64> = first.iter().chain(&second).map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(first.iter().all(|t| t.state() == TicketState::Available));
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_queries() {
        let store = InMemoryTicketStore::new();
        let tickets = store
            .insert_all(vec![
                new_ticket(1, TicketTier::Standard, 110),
                new_ticket(2, TicketTier::Standard, 110),
                new_ticket(1, TicketTier::Standard, 110),
            ])
            .await
            .unwrap();

        let mut held = tickets[0].clone();
        held.status = TicketStatus::Held {
            cart_id: CartId::new(5),
        };
        store.save(held).await.unwrap();

        let mut sold = tickets[1].clone();
        sold.status = TicketStatus::Sold {
            customer_id: CustomerId::new(8),
            purchased_at: test_epoch(),
        };
        store.save(sold).await.unwrap();

        let event_one: Vec<u64> = store
            .find_by_event(EventId::new(1))
            .await
            .unwrap()
            .iter()
            .map(|t| t.id.value())
            .collect();
        assert_eq!(event_one, vec![1, 3]);
        assert_eq!(store.find_by_cart(CartId::new(5)).await.unwrap().len(), 1);
        assert_eq!(
            store.find_by_customer(CustomerId::new(8)).await.unwrap()[0].id,
            TicketId::new(2)
        );
        assert!(store.find_by_id(TicketId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_delete_unknown_ticket() {
        let store = InMemoryTicketStore::new();
        let ghost = Ticket::from_new(TicketId::new(7), new_ticket(1, TicketTier::Vip, 150));
        assert_eq!(store.save(ghost).await, Err(StoreError::NotFound(TicketId::new(7))));
        assert_eq!(
            store.delete(TicketId::new(7)).await,
            Err(StoreError::NotFound(TicketId::new(7)))
        );
    }

    #[tokio::test]
    async fn test_delete_removes_from_event_index() {
        let store = InMemoryTicketStore::new();
        let tickets = store
            .insert_all(vec![new_ticket(1, TicketTier::Vip, 150)])
            .await
            .unwrap();
        store.delete(tickets[0].id).await.unwrap();
        assert!(store.find_by_event(EventId::new(1)).await.unwrap().is_empty());
        assert!(store.is_empty().await);

        let again = store
            .insert_all(vec![new_ticket(1, TicketTier::Vip, 150)])
            .await
            .unwrap();
        assert_eq!(again[0].id, TicketId::new(2));
    }

    #[tokio::test]
    async fn test_all_spans_events_in_id_order() {
        let store = InMemoryTicketStore::new();
        assert!(store.all().await.unwrap().is_empty());

        store
            .insert_all(vec![
                new_ticket(2, TicketTier::Standard, 110),
                new_ticket(1, TicketTier::Vip, 150),
            ])
            .await
            .unwrap();
        store
            .insert_all(vec![new_ticket(3, TicketTier::EarlyBird, 100)])
            .await
            .unwrap();
        store.delete(TicketId::new(2)).await.unwrap();

        let all = store.all().await.unwrap();
        let ids: Vec<u64> = all.iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(all[0].event_id, EventId::new(2));
        assert_eq!(all[1].event_id, EventId::new(3));
    }

    #[test]
    fn test_summary_counts_and_revenue() {
        let mut tickets: Vec<Ticket> = [
            (TicketTier::EarlyBird, 100),
            (TicketTier::Vip, 150),
            (TicketTier::Standard, 110),
            (TicketTier::Standard, 110),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (tier, dollars))| {
            Ticket::from_new(TicketId::new(i as u64 + 1), new_ticket(1, tier, dollars))
        })
        .collect();
        tickets[1].status = TicketStatus::Sold {
            customer_id: CustomerId::new(1),
            purchased_at: test_epoch(),
        };
        tickets[2].status = TicketStatus::Held {
            cart_id: CartId::new(1),
        };

        let summary = InventorySummary::for_event(EventId::new(1), &tickets);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.available(), 2);
        assert_eq!(summary.held(), 1);
        assert_eq!(summary.sold(), 1);
        assert_eq!(summary.tier(TicketTier::Vip).sold, 1);
        assert_eq!(summary.tier(TicketTier::Standard).total(), 2);
        assert_eq!(summary.sold_revenue, Money::from_dollars(150));

        let other = InventorySummary::for_event(EventId::new(2), &tickets);
        assert_eq!(other.total(), 0);
    }
}
