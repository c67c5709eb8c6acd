// In-memory fakes for the broker and unit source traits
use crate::application::broker::{Broker, PublishError};
use crate::application::unit_source::UnitSource;
use crate::domain::connection::ConnectionStatus;
use crate::domain::unit::UnitRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

pub struct RecordingBroker {
    status: watch::Sender<ConnectionStatus>,
    sent: Mutex<Vec<(String, String)>>,
    rejected: Mutex<HashSet<String>>,
    disconnects: AtomicUsize,
}

impl RecordingBroker {
    pub fn with_status(status: ConnectionStatus) -> Self {
        let (status, _) = watch::channel(status);
        Self {
            status,
            sent: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn connected() -> Self {
        Self::with_status(ConnectionStatus::connected())
    }

    pub fn disconnected() -> Self {
        Self::with_status(ConnectionStatus::closed())
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    pub fn reject_topic(&self, topic: &str) {
        self.rejected.lock().unwrap().insert(topic.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_topics(&self) -> Vec<String> {
        self.sent().into_iter().map(|(topic, _)| topic).collect()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for RecordingBroker {
    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if !self.status.borrow().is_connected() {
            return Err(PublishError::NotConnected);
        }
        if self.rejected.lock().unwrap().contains(topic) {
            return Err(PublishError::Rejected("request queue full".to_string()));
        }
        let payload = String::from_utf8(payload).unwrap();
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(ConnectionStatus::closed());
    }
}

pub enum StaticUnitSource {
    Records(Vec<UnitRecord>),
    Failing(String),
    Pending,
}

impl StaticUnitSource {
    pub fn records(entries: &[(&str, Option<&str>)]) -> Self {
        Self::Records(
            entries
                .iter()
                .map(|(id, name)| UnitRecord {
                    unit_id: Some(id.to_string()),
                    name: name.map(str::to_string),
                    unit_name: None,
                })
                .collect(),
        )
    }

    pub fn failing(message: &str) -> Self {
        Self::Failing(message.to_string())
    }
}

#[async_trait]
impl UnitSource for StaticUnitSource {
    async fn fetch_units(&self) -> anyhow::Result<Vec<UnitRecord>> {
        match self {
            Self::Records(records) => Ok(records.clone()),
            Self::Failing(message) => anyhow::bail!("{}", message),
            Self::Pending => std::future::pending().await,
        }
    }
}
