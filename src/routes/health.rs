//! Health check endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since startup
    pub uptime: f64,
    pub environment: String,
    pub version: &'static str,
    pub services: ServiceStatus,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub background_removal: &'static str,
    pub image_conversion: &'static str,
    pub image_editing: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        uptime: state.uptime().as_secs_f64(),
        environment: state.config().environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        services: ServiceStatus {
            background_removal: "operational",
            image_conversion: "operational",
            image_editing: "operational",
        },
    })
}
