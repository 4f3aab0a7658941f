use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events that downstream consumers (e.g. a notification service) may
/// observe. This core only publishes the facts; delivery is someone else's
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),
    StockMovementRecorded {
        product_id: Uuid,
        movement_type: String,
        quantity_delta: i32,
        stock_after: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and logs each event. Runs for the lifetime of
/// the process as a background task.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "event: order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, %old_status, %new_status, "event: order status changed");
            }
            Event::OrderCancelled(order_id) => {
                info!(order_id = %order_id, "event: order cancelled");
            }
            Event::StockMovementRecorded {
                product_id,
                movement_type,
                quantity_delta,
                stock_after,
            } => {
                info!(
                    product_id = %product_id,
                    %movement_type,
                    quantity_delta,
                    stock_after,
                    "event: stock movement recorded"
                );
            }
        }
    }
}
