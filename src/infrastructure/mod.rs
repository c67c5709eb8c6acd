// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod http_unit_source;
pub mod mqtt_connection;
