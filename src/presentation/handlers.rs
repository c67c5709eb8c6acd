// HTTP request handlers for the simulator control panel
use crate::application::publish_batch::BatchReport;
use crate::application::sensor_state::SensorReading;
use crate::application::simulator_service::SimulatorStatus;
use crate::domain::unit::TargetUnit;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SensorValueRequest {
    pub value: f64,
}

#[derive(Deserialize)]
pub struct AutoSendRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SelectUnitRequest {
    pub unit_id: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimulatorStatus>, ApiError> {
    Ok(Json(state.simulator.status().await?))
}

/// Directory entries; empty while the directory is still loading
pub async fn list_units(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TargetUnit>>, ApiError> {
    Ok(Json(state.simulator.status().await?.units))
}

pub async fn select_unit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectUnitRequest>,
) -> Result<Json<TargetUnit>, ApiError> {
    Ok(Json(state.simulator.select_unit(&request.unit_id).await?))
}

pub async fn set_sensor(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SensorValueRequest>,
) -> Result<Json<SensorReading>, ApiError> {
    Ok(Json(state.simulator.set_value(&name, request.value).await?))
}

pub async fn reset_sensors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
    Ok(Json(state.simulator.reset_all().await?))
}

pub async fn set_auto_send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AutoSendRequest>,
) -> Result<Json<SimulatorStatus>, ApiError> {
    Ok(Json(state.simulator.set_auto_send(request.enabled).await?))
}

/// Manual "send once"; rejected while auto-send is active
pub async fn publish_once(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchReport>, ApiError> {
    Ok(Json(state.simulator.send_once().await?))
}
