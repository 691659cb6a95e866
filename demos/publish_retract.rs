//! Publish and retract an order, watching the topic as a worker would
//!
//! Usage:
//!   cargo run --example publish_retract
//!
//! Optional:
//!   ORDER_BROADCAST_NOTIFY=after_commit  # Notify after commit (default: before_commit)
//!   RUST_LOG=order_broadcast=debug       # Show queued operations

use std::sync::Arc;

use order_broadcast::codec::{JsonCodec, OrderCodec};
use order_broadcast::keys::RegionTopics;
use order_broadcast::notify::BroadcastNotifier;
use order_broadcast::store::InMemoryStore;
use order_broadcast::types::Order;
use order_broadcast::{Config, OrderPublisher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("order_broadcast=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    println!("=== Order Broadcast Demo ({}) ===\n", config.notify_policy());

    let notifier = Arc::new(BroadcastNotifier::default());
    let mut workers = notifier.subscribe_topic("msk");

    let topics = RegionTopics::new().with_alias("Moscow", "msk");
    let publisher =
        OrderPublisher::with_config(InMemoryStore::new(), Arc::clone(&notifier), config)
            .with_topic_resolver(topics);

    // Worker side: print every event on the topic
    let listener = tokio::spawn(async move {
        let mut seen = 0;
        while let Some(event) = workers.recv().await {
            let order = JsonCodec.decode(&event.payload)?;
            println!(
                "[{}] order {} from {} is {:?}",
                event.topic, order.id, order.userkod, order.status
            );
            seen += 1;
            if seen == 3 {
                break;
            }
        }
        Ok::<_, order_broadcast::Error>(seen)
    });

    let plumbing = Order::new(1, "ab-cd", "Moscow").with_description("Leaking tap");
    let wiring = Order::new(2, "ef-gh", "Moscow").with_description("Replace socket");

    publisher.publish(&plumbing).await?;
    publisher.publish(&wiring).await?;

    println!("\nActive in msk:");
    for order in publisher.topic_orders("msk").await? {
        println!("  #{} {}", order.id, order.description.unwrap_or_default());
    }

    let rejected = publisher.retract(&plumbing).await?;
    println!("\nRetracted #{} -> {:?}", rejected.id, rejected.status);

    println!("Active for ab-cd: {}", publisher.customer_orders("ab-cd").await?.len());
    println!("Active in msk: {}\n", publisher.topic_orders("msk").await?.len());

    let seen = listener.await??;
    println!("\nWorker saw {} events", seen);

    Ok(())
}
