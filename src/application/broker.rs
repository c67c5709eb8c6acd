// Broker trait for publishing simulated readings
use crate::domain::connection::{ConnectionState, ConnectionStatus};
use async_trait::async_trait;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("not connected to broker")]
    NotConnected,
    #[error("transport rejected message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Broker: Send + Sync {
    /// Watch channel tracking the session state
    fn status(&self) -> watch::Receiver<ConnectionStatus>;

    fn state(&self) -> ConnectionState {
        self.status().borrow().state
    }

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Fire-and-forget delivery; no acknowledgement is awaited
    fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;

    /// Tear down the session. Safe to call more than once.
    async fn disconnect(&self);
}
