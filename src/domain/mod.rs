// Domain layer - Sensors, units and connection state
pub mod connection;
pub mod sensor;
pub mod unit;
