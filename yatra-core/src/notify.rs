use async_trait::async_trait;
use tokio::sync::Mutex;
use yatra_shared::BookingEvent;

/// Fire-and-forget outbound events. Callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Writes events to the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, event: &BookingEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(topic = event.topic(), key = %event.key(), "event: {:?}", event);
        Ok(())
    }
}

/// Keeps published events in memory
#[derive(Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<BookingEvent>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().await.clone()
    }

    pub async fn topics(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(|e| e.topic()).collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, event: &BookingEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
