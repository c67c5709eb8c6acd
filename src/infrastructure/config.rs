use anyhow::Context;
use serde::Deserialize;

/// Port of the HTTP service that serves the unit directory, next to the broker.
const DIRECTORY_PORT: u16 = 1880;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SimulatorConfig {
    pub broker: BrokerSettings,
    pub publish: PublishSettings,
    pub directory: DirectorySettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Websocket,
    Tcp,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub transport: TransportKind,
    pub ws_path: String,
    pub client_id_prefix: String,
    pub keep_alive_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9001,
            username: None,
            password: None,
            use_tls: false,
            transport: TransportKind::Websocket,
            ws_path: "/mqtt".to_string(),
            client_id_prefix: "sim_".to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl BrokerSettings {
    /// Broker address in the form rumqttc expects for the chosen transport.
    pub fn broker_address(&self) -> String {
        match self.transport {
            TransportKind::Tcp => self.host.clone(),
            TransportKind::Websocket => {
                let scheme = if self.use_tls { "wss" } else { "ws" };
                let path = if self.ws_path.starts_with('/') {
                    self.ws_path.clone()
                } else {
                    format!("/{}", self.ws_path)
                };
                format!("{}://{}:{}{}", scheme, self.host, self.port, path)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PublishSettings {
    pub interval_ms: u64,
    pub auto_send: bool,
    pub topic_namespace: String,
    /// Publish the baseline values right after a reset.
    pub broadcast_on_reset: bool,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            auto_send: true,
            topic_namespace: "gnt".to_string(),
            broadcast_on_reset: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DirectorySettings {
    pub base_url: Option<String>,
    pub units_path: String,
    pub timeout_ms: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            base_url: None,
            units_path: "villages/status".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.broker.host.trim().is_empty() {
            anyhow::bail!("broker.host must not be empty");
        }
        if self.broker.port == 0 {
            anyhow::bail!("broker.port must not be 0");
        }
        if self.publish.interval_ms == 0 {
            anyhow::bail!("publish.interval_ms must be greater than 0");
        }
        if self.publish.topic_namespace.trim().is_empty() {
            anyhow::bail!("publish.topic_namespace must not be empty");
        }
        Ok(())
    }

    pub fn directory_base_url(&self) -> String {
        self.directory
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.broker.host, DIRECTORY_PORT))
    }
}

/// Load `config/simulator.*` (optional) with `SIM_` environment overrides,
/// e.g. `SIM_BROKER__HOST=broker.lan`.
pub fn load_simulator_config() -> anyhow::Result<SimulatorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/simulator").required(false))
        .add_source(environment())
        .build()?;

    finish(settings)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SIM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub fn parse_simulator_config(toml: &str) -> anyhow::Result<SimulatorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    finish(settings)
}

fn finish(settings: config::Config) -> anyhow::Result<SimulatorConfig> {
    let config: SimulatorConfig = settings
        .try_deserialize()
        .context("Invalid simulator configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = parse_simulator_config("").unwrap();

        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 9001);
        assert_eq!(config.broker.transport, TransportKind::Websocket);
        assert_eq!(config.publish.interval_ms, 5000);
        assert!(config.publish.auto_send);
        assert!(!config.publish.broadcast_on_reset);
        assert_eq!(config.directory.units_path, "villages/status");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.directory_base_url(), "http://localhost:1880");
    }

    #[test]
    fn test_file_overrides() {
        let config = parse_simulator_config(
            r#"
            [broker]
            host = "broker.lan"
            port = 8083
            username = "sim"
            password = "secret"
            use_tls = true

            [publish]
            interval_ms = 10000
            broadcast_on_reset = true

            [directory]
            base_url = "http://units.lan:8000"
            "#,
        )
        .unwrap();

        assert_eq!(config.broker.username.as_deref(), Some("sim"));
        assert_eq!(config.publish.interval_ms, 10000);
        assert!(config.publish.broadcast_on_reset);
        assert_eq!(config.publish.topic_namespace, "gnt");
        assert_eq!(config.directory_base_url(), "http://units.lan:8000");
        assert_eq!(config.broker.broker_address(), "wss://broker.lan:8083/mqtt");
    }

    #[test]
    fn test_environment_overrides_file() {
        let vars: config::Map<String, String> = [
            ("SIM_PUBLISH__INTERVAL_MS", "10000"),
            ("SIM_BROKER__HOST", "broker.lan"),
            ("SIM_PUBLISH__AUTO_SEND", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[publish]\ninterval_ms = 2000\n",
                config::FileFormat::Toml,
            ))
            .add_source(environment().source(Some(vars)))
            .build()
            .unwrap();
        let config = finish(settings).unwrap();

        assert_eq!(config.publish.interval_ms, 10000);
        assert!(!config.publish.auto_send);
        assert_eq!(config.broker.host, "broker.lan");
        assert_eq!(config.broker.port, 9001);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = parse_simulator_config("[publish]\ninterval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_broker_address_per_transport() {
        let mut broker = BrokerSettings {
            ws_path: "ws".to_string(),
            ..BrokerSettings::default()
        };
        assert_eq!(broker.broker_address(), "ws://localhost:9001/ws");

        broker.transport = TransportKind::Tcp;
        assert_eq!(broker.broker_address(), "localhost");
    }
}
