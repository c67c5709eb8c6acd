// Mapping of simulator errors onto HTTP responses
use crate::application::publish_scheduler::TriggerError;
use crate::application::sensor_state::SensorError;
use crate::application::simulator_service::SimulatorError;
use crate::application::unit_directory::SelectError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] SimulatorError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            SimulatorError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            SimulatorError::Sensor(SensorError::UnknownSensor(_)) => StatusCode::NOT_FOUND,
            SimulatorError::Sensor(SensorError::InvalidValue { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SimulatorError::Select(SelectError::UnknownUnit(_)) => StatusCode::NOT_FOUND,
            SimulatorError::Select(SelectError::NotLoaded) => StatusCode::CONFLICT,
            SimulatorError::Trigger(TriggerError::AutoModeActive | TriggerError::Busy) => {
                StatusCode::CONFLICT
            }
            SimulatorError::Trigger(TriggerError::NotConnected | TriggerError::NoActiveUnit) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
