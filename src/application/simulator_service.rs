// Simulator service - one task owning sensor state, scheduler and unit directory
use crate::application::activity_log::ActivityLog;
use crate::application::broker::Broker;
use crate::application::publish_batch::{BatchReport, PublishBatch};
use crate::application::publish_scheduler::{PublishScheduler, SchedulerState, TriggerError};
use crate::application::sensor_state::{SensorError, SensorReading, SensorState};
use crate::application::unit_directory::{DirectoryOrigin, SelectError, UnitDirectory};
use crate::application::unit_source::UnitSource;
use crate::domain::connection::{ConnectionState, ConnectionStatus, DisconnectCause};
use crate::domain::unit::TargetUnit;
use crate::infrastructure::config::PublishSettings;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulatorError {
    #[error("simulator service has stopped")]
    Stopped,
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Trigger(#[from] TriggerError),
    #[error(transparent)]
    Select(#[from] SelectError),
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulatorStatus {
    pub connection: ConnectionState,
    pub scheduler: SchedulerState,
    pub auto_send: bool,
    pub interval_ms: u64,
    pub directory_loaded: bool,
    pub directory_origin: Option<DirectoryOrigin>,
    pub active_unit: Option<TargetUnit>,
    pub units: Vec<TargetUnit>,
    pub sensors: Vec<SensorReading>,
    pub log: Vec<String>,
}

enum Command {
    SetValue {
        name: String,
        value: f64,
        reply: oneshot::Sender<Result<SensorReading, SensorError>>,
    },
    ResetAll {
        reply: oneshot::Sender<Vec<SensorReading>>,
    },
    SetAutoSend {
        enabled: bool,
        reply: oneshot::Sender<SimulatorStatus>,
    },
    SendOnce {
        reply: oneshot::Sender<Result<BatchReport, TriggerError>>,
    },
    SelectUnit {
        unit_id: String,
        reply: oneshot::Sender<Result<TargetUnit, SelectError>>,
    },
    Status {
        reply: oneshot::Sender<SimulatorStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to the simulator task.
#[derive(Clone)]
pub struct SimulatorHandle {
    commands: mpsc::Sender<Command>,
}

impl SimulatorHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SimulatorError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SimulatorError::Stopped)?;
        rx.await.map_err(|_| SimulatorError::Stopped)
    }

    pub async fn set_value(&self, name: &str, value: f64) -> Result<SensorReading, SimulatorError> {
        let name = name.to_string();
        Ok(self
            .request(|reply| Command::SetValue { name, value, reply })
            .await??)
    }

    pub async fn reset_all(&self) -> Result<Vec<SensorReading>, SimulatorError> {
        self.request(|reply| Command::ResetAll { reply }).await
    }

    pub async fn set_auto_send(&self, enabled: bool) -> Result<SimulatorStatus, SimulatorError> {
        self.request(|reply| Command::SetAutoSend { enabled, reply })
            .await
    }

    pub async fn send_once(&self) -> Result<BatchReport, SimulatorError> {
        Ok(self.request(|reply| Command::SendOnce { reply }).await??)
    }

    pub async fn select_unit(&self, unit_id: &str) -> Result<TargetUnit, SimulatorError> {
        let unit_id = unit_id.to_string();
        Ok(self
            .request(|reply| Command::SelectUnit { unit_id, reply })
            .await??)
    }

    pub async fn status(&self) -> Result<SimulatorStatus, SimulatorError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Stop the task and release the broker session. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| Command::Shutdown { reply }).await;
    }
}

pub struct SimulatorService {
    broker: Arc<dyn Broker>,
    sensors: SensorState,
    directory: Option<UnitDirectory>,
    scheduler: PublishScheduler,
    activity: ActivityLog,
    namespace: String,
    broadcast_on_reset: bool,
    connection: Option<ConnectionStatus>,
}

impl SimulatorService {
    pub fn new(settings: &PublishSettings, broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            sensors: SensorState::new(),
            directory: None,
            scheduler: PublishScheduler::new(
                Duration::from_millis(settings.interval_ms),
                settings.auto_send,
            ),
            activity: ActivityLog::default(),
            namespace: settings.topic_namespace.clone(),
            broadcast_on_reset: settings.broadcast_on_reset,
            connection: None,
        }
    }

    /// Start the event loop and the one-shot directory load.
    pub fn spawn(self, source: Arc<dyn UnitSource>) -> (SimulatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (directory_tx, directory_rx) = oneshot::channel();

        let loader = tokio::spawn(async move {
            let directory = UnitDirectory::load(source.as_ref()).await;
            let _ = directory_tx.send(directory);
        });

        let task = tokio::spawn(self.run(rx, directory_rx, loader));
        (SimulatorHandle { commands: tx }, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut directory_rx: oneshot::Receiver<UnitDirectory>,
        loader: JoinHandle<()>,
    ) {
        let mut status_rx = self.broker.status();
        let initial = status_rx.borrow_and_update().clone();
        self.on_connection(initial);

        let mut status_open = true;
        let mut directory_pending = true;
        let mut shutdown_reply = None;

        loop {
            let deadline = self.scheduler.deadline();

            // Order matters: state changes and commands are applied before a due tick.
            tokio::select! {
                biased;

                changed = status_rx.changed(), if status_open => {
                    let status = match changed {
                        Ok(()) => status_rx.borrow_and_update().clone(),
                        Err(_) => {
                            status_open = false;
                            let reason = "connection manager closed";
                            if self.is_connected() {
                                ConnectionStatus::lost(reason)
                            } else {
                                ConnectionStatus::failed(reason)
                            }
                        }
                    };
                    self.on_connection(status);
                }

                loaded = &mut directory_rx, if directory_pending => {
                    directory_pending = false;
                    match loaded {
                        Ok(directory) => self.on_directory(directory),
                        Err(_) => {
                            tracing::warn!("Unit directory loader ended without a result");
                            self.on_directory(UnitDirectory::error_fallback());
                        }
                    }
                }

                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => break,
                },

                _ = sleep_until(deadline), if deadline.is_some() => self.on_tick(),
            }
        }

        loader.abort();
        self.broker.disconnect().await;
        tracing::info!("Simulator stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetValue { name, value, reply } => {
                let result = self
                    .sensors
                    .set_named(&name, value)
                    .map(|(sensor, stored)| SensorReading::new(sensor, stored));
                if let Err(e) = &result {
                    tracing::debug!("Rejected sensor update: {}", e);
                }
                let _ = reply.send(result);
            }
            Command::ResetAll { reply } => {
                self.reset_all();
                let _ = reply.send(self.sensors.snapshot().readings());
            }
            Command::SetAutoSend { enabled, reply } => {
                self.scheduler.set_auto_send(enabled, Instant::now());
                self.record(if enabled {
                    "Auto-send enabled"
                } else {
                    "Auto-send paused"
                });
                let _ = reply.send(self.status());
            }
            Command::SendOnce { reply } => {
                let result = self.trigger(PublishScheduler::begin_manual);
                if let Err(e) = &result {
                    self.record_warning(format!("Send skipped: {}", e));
                }
                let _ = reply.send(result);
            }
            Command::SelectUnit { unit_id, reply } => {
                let result = match self.directory.as_mut() {
                    Some(directory) => directory.select(&unit_id).cloned(),
                    None => Err(SelectError::NotLoaded),
                };
                match &result {
                    Ok(unit) => {
                        self.record(format!("Selected {} ({})", unit.id, unit.display_name))
                    }
                    Err(e) => tracing::debug!("Rejected unit selection: {}", e),
                }
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn reset_all(&mut self) {
        self.sensors.reset_all();
        self.record("Resetting values...");

        if self.broadcast_on_reset {
            if let Err(e) = self.trigger(PublishScheduler::begin_out_of_band) {
                self.record_warning(format!("Reset broadcast skipped: {}", e));
            }
        }
    }

    fn on_connection(&mut self, status: ConnectionStatus) {
        if self.connection.as_ref() == Some(&status) {
            return;
        }

        let was_connected = self.is_connected();
        match (status.state, status.cause) {
            (ConnectionState::Connected, _) => self.record("Connected to Broker"),
            (ConnectionState::Disconnected, Some(DisconnectCause::Lost)) => {
                // The watch channel may have folded the ConnAck into this update
                if !was_connected {
                    self.record("Connected to Broker");
                }
                self.record_warning(format!("Lost: {}", status.reason_text()));
            }
            (ConnectionState::Disconnected, Some(DisconnectCause::Failed)) => {
                self.record_warning(format!("Fail: {}", status.reason_text()))
            }
            _ => {}
        }

        self.scheduler
            .set_connected(status.is_connected(), Instant::now());
        self.connection = Some(status);
    }

    fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(ConnectionStatus::is_connected)
    }

    fn on_directory(&mut self, directory: UnitDirectory) {
        let active = directory.active().clone();
        self.directory = Some(directory);
        self.record(format!("Selected {} ({})", active.id, active.display_name));
    }

    fn on_tick(&mut self) {
        let now = Instant::now();
        if !self.scheduler.begin_tick(now) {
            return;
        }

        match self.active_unit_id() {
            Some(unit_id) => {
                self.publish(&unit_id);
            }
            None => {
                self.record_warning("Tick skipped: unit directory still loading");
                self.scheduler.finish(now);
            }
        }
    }

    fn trigger(
        &mut self,
        begin: impl FnOnce(&mut PublishScheduler) -> Result<(), TriggerError>,
    ) -> Result<BatchReport, TriggerError> {
        let unit_id = self.active_unit_id().ok_or(TriggerError::NoActiveUnit)?;
        begin(&mut self.scheduler)?;
        Ok(self.publish(&unit_id))
    }

    // Callers must have moved the scheduler into `Publishing`.
    fn publish(&mut self, unit_id: &str) -> BatchReport {
        let snapshot = self.sensors.snapshot();
        let report =
            PublishBatch::build(&self.namespace, unit_id, &snapshot).deliver(self.broker.as_ref());

        if report.is_clean() {
            self.record(format!("Sent to {}", unit_id));
        } else {
            for failure in &report.failures {
                self.record_warning(format!("Send failed {}: {}", failure.topic, failure.error));
            }
        }

        self.scheduler.finish(Instant::now());
        report
    }

    fn active_unit_id(&self) -> Option<String> {
        self.directory.as_ref().map(|d| d.active().id.clone())
    }

    fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.activity.record(message);
    }

    fn record_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.activity.record(message);
    }

    fn status(&self) -> SimulatorStatus {
        SimulatorStatus {
            connection: self
                .connection
                .as_ref()
                .map_or(ConnectionState::Disconnected, |c| c.state),
            scheduler: self.scheduler.state(),
            auto_send: self.scheduler.auto_send(),
            interval_ms: self.scheduler.interval().as_millis() as u64,
            directory_loaded: self.directory.is_some(),
            directory_origin: self.directory.as_ref().map(UnitDirectory::origin),
            active_unit: self.directory.as_ref().map(|d| d.active().clone()),
            units: self
                .directory
                .as_ref()
                .map(|d| d.units().to_vec())
                .unwrap_or_default(),
            sensors: self.sensors.snapshot().readings(),
            log: self.activity.lines(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
