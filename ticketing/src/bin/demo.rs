//! Box Office Demo
//!
//! Walks the ticket inventory lifecycle end to end against in-memory
//! collaborators:
//! - Ticket generation for a 10-seat venue with tiered pricing
//! - A checkout the payment gateway approves
//! - A checkout the payment gateway declines (tickets stay held)
//! - Prometheus metrics rendered at the end
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,ticketing=debug cargo run --bin demo
//! ```

use boxoffice_core::environment::SystemClock;
use boxoffice_core::types::{CustomerId, EventId, Money, Ticket, VenueId};
use boxoffice_testing::helpers::event_in_days;
use boxoffice_testing::{InMemoryVenueCatalog, MockPaymentGateway, SectionLayout};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use ticketing::{BoxOffice, Config, GenerationRequest, TicketingError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_ticket(ticket: &Ticket) {
    println!(
        "   #{:<3} {:<10} {:>8}  seat {:<4} {}",
        ticket.id,
        ticket.tier.to_string(),
        ticket.price.to_string(),
        ticket
            .seat_id
            .map_or_else(|| "-".to_string(), |seat| seat.to_string()),
        ticket.state()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.service.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus = if config.service.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ticketing::metrics::register_business_metrics();
        Some(handle)
    } else {
        None
    };

    println!("\n🎫 ============================================");
    println!("   Box Office - Live Demo");
    println!("============================================\n");

    // ========== Setup ==========

    let venue_id = VenueId::new(1);
    let event_id = EventId::new(1);
    let catalog = InMemoryVenueCatalog::new();
    catalog.add_seated_venue(venue_id, vec![SectionLayout::uniform("Orchestra", 2, 5)]);
    catalog.schedule_event(venue_id, event_id)?;

    let office = BoxOffice::in_memory(config, Arc::new(catalog.clone()), Arc::new(SystemClock))?;
    let event = event_in_days(event_id, venue_id, Utc::now(), 40);

    println!("📋 Event: {} at venue {venue_id}", event.name);
    println!("   Starts: {} (40 days out)", event.starts_at);
    println!("   Capacity: 10 seats\n");

    // Step 1: Generate inventory
    println!("1️⃣  Generating 2 EARLY_BIRD, 1 VIP, 3 STANDARD at base $100.00...");
    let tickets = office
        .generator
        .generate(&event, GenerationRequest::new(Money::from_dollars(100), 2, 1, 3))
        .await?;
    tickets.iter().for_each(print_ticket);
    let free_seats = catalog
        .seats_for_event(event_id)
        .iter()
        .filter(|seat| seat.is_free())
        .count();
    println!("   ✓ {} tickets generated, {free_seats} seats left unassigned\n", tickets.len());

    // Step 2: Approved checkout
    println!("2️⃣  Alice buys both EARLY_BIRD tickets and the VIP ticket...");
    let alice = CustomerId::new(1);
    let mut alice_cart = office.carts.open(alice, event_id);
    for ticket in &tickets[..3] {
        office.carts.add_ticket(&mut alice_cart, ticket.id).await?;
    }
    println!("   Cart total: {}", office.carts.calculate_total(&alice_cart).await?);

    let receipt = office
        .carts
        .checkout(&mut alice_cart, alice, &MockPaymentGateway::approving())
        .await?;
    println!(
        "   ✓ Paid {} (transaction {})",
        receipt.total, receipt.transaction_id
    );
    println!("   ✓ Seats reserved: {}", catalog.reserved_seat_count(event_id));
    println!("   Receipt:\n{}\n", serde_json::to_string_pretty(&receipt)?);

    // Step 3: Declined checkout
    println!("3️⃣  Bob tries two STANDARD tickets with an expired card...");
    let bob = CustomerId::new(2);
    let mut bob_cart = office.carts.open(bob, event_id);
    for ticket in &tickets[3..5] {
        office.carts.add_ticket(&mut bob_cart, ticket.id).await?;
    }

    match office
        .carts
        .checkout(&mut bob_cart, bob, &MockPaymentGateway::declining("card expired"))
        .await
    {
        Err(TicketingError::PaymentFailure { reason }) => {
            println!("   ✗ Payment failed: {reason}");
        }
        other => println!("   ? Unexpected outcome: {other:?}"),
    }
    for ticket_id in bob_cart.tickets() {
        print_ticket(&office.reservations.ticket(*ticket_id).await?);
    }
    println!("   ✓ Tickets still held in Bob's cart, seats reserved: {}", catalog.reserved_seat_count(event_id));

    office.carts.clear(&mut bob_cart).await?;
    println!("   ✓ Bob abandons the cart, tickets released\n");

    // Step 4: Availability
    println!("4️⃣  Availability:");
    let summary = office.availability(event_id).await?;
    for (tier, counts) in &summary.tiers {
        println!(
            "   {:<10} available {}  held {}  sold {}",
            tier.to_string(),
            counts.available,
            counts.held,
            counts.sold
        );
    }
    println!("   Revenue: {}\n", summary.sold_revenue);

    if let Some(handle) = prometheus {
        println!("📊 Metrics:\n");
        println!("{}", handle.render());
    }

    println!("============================================");
    println!("   Demo complete");
    println!("============================================\n");

    Ok(())
}
