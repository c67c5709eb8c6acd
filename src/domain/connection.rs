// Broker connection state as observed by the simulator
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a session ended up `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// Local teardown.
    Closed,
    /// The handshake never completed.
    Failed,
    /// An established session dropped.
    Lost,
}

/// Published on the connection manager's watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub cause: Option<DisconnectCause>,
    /// Transport error text for the last failure or loss.
    pub reason: Option<String>,
}

impl ConnectionStatus {
    pub fn connecting() -> Self {
        Self {
            state: ConnectionState::Connecting,
            cause: None,
            reason: None,
        }
    }

    pub fn connected() -> Self {
        Self {
            state: ConnectionState::Connected,
            cause: None,
            reason: None,
        }
    }

    pub fn closed() -> Self {
        Self::disconnected(DisconnectCause::Closed, None)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::disconnected(DisconnectCause::Failed, Some(reason.into()))
    }

    pub fn lost(reason: impl Into<String>) -> Self {
        Self::disconnected(DisconnectCause::Lost, Some(reason.into()))
    }

    fn disconnected(cause: DisconnectCause, reason: Option<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cause: Some(cause),
            reason,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("connection closed")
    }
}
