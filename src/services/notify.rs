use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

/// Transient messages for the presentation to show without blocking the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// A search failed in transport
    MoviesUnavailable,
    /// The selected movie has no platform video
    NoTrailer,
    /// The video listing could not be fetched
    TrailerLookupFailed,
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::MoviesUnavailable => "Could not load movies",
            Notification::NoTrailer => "No trailer available for this movie",
            Notification::TrailerLookupFailed => "Failed to fetch trailer info",
        }
    }
}

/// Fan-out of notifications; sending never fails even with no listeners
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, notification: Notification) {
        tracing::debug!(?notification, "Notification raised");
        // No receivers is fine: nobody is displaying notifications
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
