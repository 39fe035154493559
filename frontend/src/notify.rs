use std::time::Duration;

use tokio::time::Instant;

pub const NEW_ROUTE_FOUND: &str = "New optimal route found";
pub const CALCULATING_ROUTE: &str = "Calculating the best route";

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub expires_at: Instant,
}

/// Transient banner messages. Purely informational.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn notify(&mut self, message: &str) {
        tracing::info!("{message}");
        self.current = Some(Notification {
            message: message.to_string(),
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// The live notification, if it has not expired by `now`.
    pub fn current(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| now < n.expires_at)
    }

    pub fn expire(&mut self, now: Instant) {
        if self.current.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
