// Application layer - Sensor state, scheduling and the simulator service
pub mod activity_log;
pub mod broker;
pub mod publish_batch;
pub mod publish_scheduler;
pub mod sensor_state;
pub mod simulator_service;
pub mod unit_directory;
pub mod unit_source;

#[cfg(test)]
pub mod testing;
