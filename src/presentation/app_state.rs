// Application state for HTTP handlers
use crate::application::simulator_service::SimulatorHandle;

#[derive(Clone)]
pub struct AppState {
    pub simulator: SimulatorHandle,
}
