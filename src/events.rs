use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::mpsc;
use tracing::error;
use uuid::Uuid;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

// Events that can occur during a checkout. Consumers subscribe to the
// receiving end of the channel; notifications ride the same pipe so the
// toast surface is just another subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutOpened {
        session_id: Uuid,
        branch_id: String,
    },
    CheckoutClosed {
        session_id: Uuid,
    },
    CartCleared {
        reason: String,
    },
    CouponApplied {
        code: String,
        discount: Decimal,
    },
    CouponRemoved {
        code: String,
    },
    BranchConflict {
        cart_branch: String,
        browsing_branch: String,
    },
    OrderCreated {
        order_id: String,
    },
    PaymentInitiated {
        order_id: String,
        amount_minor: i64,
    },
    PaymentSucceeded {
        order_id: String,
    },
    PaymentFailed {
        order_id: Option<String>,
        reason: String,
    },
    Notification {
        message: String,
        severity: Severity,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Convenience constructor for tests and headless use: the receiving end
    /// is drained by a background task and dropped.
    pub fn discarding() -> Self {
        let (tx, mut rx) = mpsc::channel(64);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        Self { sender: tx }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("{}", e);
        }
    }

    /// Fire-and-forget user notification.
    pub async fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.send_or_log(Event::Notification {
            message: message.into(),
            severity,
        })
        .await;
    }
}
