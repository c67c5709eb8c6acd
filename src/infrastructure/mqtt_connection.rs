// Broker session over MQTT (websocket or TCP) using rumqttc
use crate::application::broker::{Broker, PublishError};
use crate::domain::connection::ConnectionStatus;
use crate::infrastructure::config::{BrokerSettings, TransportKind};
use async_trait::async_trait;
use rand::Rng;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, Transport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const REQUEST_CAPACITY: usize = 32;
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);
const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// One outbound session. There is no automatic reconnect: once the event
/// loop reports an error the session stays `Disconnected`.
pub struct MqttConnection {
    client: AsyncClient,
    status: Arc<watch::Sender<ConnectionStatus>>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttConnection {
    /// Start the handshake in the background and return immediately.
    pub fn connect(settings: &BrokerSettings) -> Self {
        let client_id = client_id(&settings.client_id_prefix);
        let options = mqtt_options(settings, &client_id);
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (status, _) = watch::channel(ConnectionStatus::connecting());
        let status = Arc::new(status);

        tracing::info!(
            "Connecting to broker {} as {}",
            settings.broker_address(),
            client_id
        );
        let task = tokio::spawn(drive(eventloop, status.clone()));

        Self {
            client,
            status,
            event_loop: Mutex::new(Some(task)),
        }
    }
}

#[async_trait]
impl Broker for MqttConnection {
    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if !self.status.borrow().is_connected() {
            return Err(PublishError::NotConnected);
        }

        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| PublishError::Rejected(e.to_string()))
    }

    async fn disconnect(&self) {
        let task = self.event_loop.lock().ok().and_then(|mut guard| guard.take());
        let Some(mut task) = task else {
            return;
        };

        let connected = self.status.borrow().is_connected();
        if connected {
            if let Err(e) = self.client.disconnect().await {
                tracing::debug!("Disconnect request failed: {}", e);
            }
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
                tracing::debug!("Event loop still running after disconnect, aborting");
            }
        }

        task.abort();
        self.status.send_replace(ConnectionStatus::closed());
        tracing::info!("Disconnected from broker");
    }
}

impl Drop for MqttConnection {
    fn drop(&mut self) {
        if let Some(task) = self.event_loop.get_mut().ok().and_then(Option::take) {
            task.abort();
        }
    }
}

async fn drive(mut eventloop: EventLoop, status: Arc<watch::Sender<ConnectionStatus>>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("Connected to broker");
                status.send_replace(ConnectionStatus::connected());
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::warn!("Broker closed the session");
                status.send_replace(ConnectionStatus::lost("broker closed the session"));
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let was_connected = status.borrow().is_connected();
                let next = if was_connected {
                    tracing::warn!("Connection lost: {}", e);
                    ConnectionStatus::lost(e.to_string())
                } else {
                    tracing::warn!("Connection failed: {}", e);
                    ConnectionStatus::failed(e.to_string())
                };
                status.send_replace(next);
                break;
            }
        }
    }
}

fn client_id(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{}{:06x}", prefix, suffix)
}

fn mqtt_options(settings: &BrokerSettings, client_id: &str) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, settings.broker_address(), settings.port);
    options.set_keep_alive(Duration::from_secs(
        settings.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS),
    ));
    options.set_clean_session(true);

    if let Some(username) = &settings.username {
        options.set_credentials(username, settings.password.clone().unwrap_or_default());
    }

    options.set_transport(transport(settings));
    options
}

fn transport(settings: &BrokerSettings) -> Transport {
    match (settings.transport, settings.use_tls) {
        (TransportKind::Websocket, false) => Transport::Ws,
        (TransportKind::Websocket, true) => Transport::wss_with_default_config(),
        (TransportKind::Tcp, false) => Transport::Tcp,
        (TransportKind::Tcp, true) => Transport::tls_with_default_config(),
    }
}
