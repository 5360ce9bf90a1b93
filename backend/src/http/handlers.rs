//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! tracking or log service for business logic.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;

use super::dto::{
    CameraStatisticsResponse, DateQuery, DayHistoryResponse, DayLogsResponse, DeleteLogResponse,
    EntryResponse, EventTypeQuery, ExitResponse, GateEvent, HealthResponse,
    HourlyStatisticsResponse, LogDraft, LogEdit, LogPage, LogQuery, OccupancySummary,
    ParkingLogEntry, Vehicle, VehicleHistoryResponse, VehicleListResponse,
    ENTRY_RECORD_NOT_FOUND, VEHICLE_ALREADY_INSIDE,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{parse_date, EventType, LogId};
use crate::services::{EntryDecision, ExitDecision};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn date_param(query: &DateQuery) -> Result<Option<NaiveDate>, AppError> {
    match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("date must be YYYY-MM-DD, got '{}'", raw))),
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Gate events
// =============================================================================

/// POST /vehicle/entry
///
/// 201 when the vehicle entered, 400 with the existing record when it is already inside.
pub async fn vehicle_entry(
    State(state): State<AppState>,
    body: Result<Json<GateEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let Json(event) = body?;
    let (status, response) = match state.tracker.handle_entry(&event).await? {
        EntryDecision::Entered(vehicle) => (
            StatusCode::CREATED,
            EntryResponse {
                success: true,
                code: None,
                message: "Vehicle entered".to_string(),
                vehicle,
            },
        ),
        EntryDecision::AlreadyInside(vehicle) => (
            StatusCode::BAD_REQUEST,
            EntryResponse {
                success: false,
                code: Some(VEHICLE_ALREADY_INSIDE.to_string()),
                message: "Vehicle is already inside".to_string(),
                vehicle,
            },
        ),
    };
    Ok((status, Json(response)))
}

/// POST /vehicle/exit
///
/// 200 with the stay duration, or 404 when the plate has no open entry.
pub async fn vehicle_exit(
    State(state): State<AppState>,
    body: Result<Json<GateEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<ExitResponse>), AppError> {
    let Json(event) = body?;
    let (status, response) = match state.tracker.handle_exit(&event).await? {
        ExitDecision::Exited {
            vehicle,
            duration_minutes,
        } => (
            StatusCode::OK,
            ExitResponse {
                allowed: true,
                code: None,
                message: "Vehicle may exit".to_string(),
                vehicle: Some(vehicle),
                duration: Some(duration_minutes),
            },
        ),
        ExitDecision::NotAllowed => (
            StatusCode::NOT_FOUND,
            ExitResponse {
                allowed: false,
                code: Some(ENTRY_RECORD_NOT_FOUND.to_string()),
                message: "No entry record found for this vehicle".to_string(),
                vehicle: None,
                duration: None,
            },
        ),
    };
    Ok((status, Json(response)))
}

// =============================================================================
// Vehicle queries
// =============================================================================

/// GET /vehicle/inside
pub async fn vehicles_inside(State(state): State<AppState>) -> HandlerResult<VehicleListResponse> {
    let vehicles = state.tracker.vehicles_inside().await?;
    Ok(Json(VehicleListResponse {
        total: vehicles.len(),
        vehicles,
    }))
}

/// GET /vehicle/history/today?date=YYYY-MM-DD
pub async fn history_today(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> HandlerResult<DayHistoryResponse> {
    let Query(query) = query?;
    let (window, vehicles) = state.tracker.history_for_day(date_param(&query)?).await?;
    Ok(Json(DayHistoryResponse {
        date: window.date_string(),
        total: vehicles.len(),
        vehicles,
    }))
}

/// GET /vehicle/{license_plate}
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(license_plate): Path<String>,
) -> HandlerResult<Vehicle> {
    state
        .tracker
        .find_vehicle(&license_plate)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Vehicle {} not found",
                license_plate.trim().to_uppercase()
            ))
        })
}

/// GET /vehicle/{license_plate}/history
pub async fn vehicle_history(
    State(state): State<AppState>,
    Path(license_plate): Path<String>,
) -> HandlerResult<VehicleHistoryResponse> {
    let (plate, logs) = state.tracker.vehicle_history(&license_plate).await?;
    Ok(Json(VehicleHistoryResponse {
        license_plate: plate.into_inner(),
        total: logs.len(),
        logs,
    }))
}

/// GET /vehicle/statistics/hourly?date=YYYY-MM-DD
pub async fn hourly_statistics(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> HandlerResult<HourlyStatisticsResponse> {
    let Query(query) = query?;
    let (window, statistics) = state.tracker.hourly_statistics(date_param(&query)?).await?;
    Ok(Json(HourlyStatisticsResponse {
        date: window.date_string(),
        statistics,
    }))
}

/// GET /vehicle/statistics/summary
pub async fn statistics_summary(State(state): State<AppState>) -> HandlerResult<OccupancySummary> {
    Ok(Json(state.tracker.summary().await?))
}

// =============================================================================
// Parking log administration
// =============================================================================

/// GET /parking-logs
pub async fn list_logs(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> HandlerResult<LogPage> {
    let Query(query) = query?;
    Ok(Json(state.logs.list(&query).await?))
}

/// POST /parking-logs
pub async fn create_log(
    State(state): State<AppState>,
    body: Result<Json<LogDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ParkingLogEntry>), AppError> {
    let Json(draft) = body?;
    let created = state.logs.create(draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /parking-logs/{id}
pub async fn get_log(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> HandlerResult<ParkingLogEntry> {
    let Path(id) = id?;
    Ok(Json(state.logs.get(LogId::new(id)).await?))
}

/// PUT /parking-logs/{id}
pub async fn update_log(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<LogEdit>, JsonRejection>,
) -> HandlerResult<ParkingLogEntry> {
    let Path(id) = id?;
    let Json(edit) = body?;
    Ok(Json(state.logs.update(LogId::new(id), edit).await?))
}

/// DELETE /parking-logs/{id}
///
/// Deleting an entry log also reports how long the vehicle had been parked.
pub async fn delete_log(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> HandlerResult<DeleteLogResponse> {
    let Path(id) = id?;
    let deleted = state.logs.delete(LogId::new(id)).await?;
    Ok(Json(DeleteLogResponse {
        message: "Parking log deleted".to_string(),
        log: deleted.log,
        deleted_at: deleted.deleted_at,
        parking_duration: deleted.parking_duration,
    }))
}

/// GET /parking-logs/today?eventType=
pub async fn today_logs(
    State(state): State<AppState>,
    query: Result<Query<EventTypeQuery>, QueryRejection>,
) -> HandlerResult<DayLogsResponse> {
    let Query(query) = query?;
    let (window, logs) = state.logs.today(query.event_type.as_deref()).await?;
    Ok(Json(DayLogsResponse {
        date: window.date_string(),
        total: logs.len(),
        logs,
    }))
}

/// GET /parking-logs/entry/{license_plate}/latest
pub async fn latest_entry_log(
    State(state): State<AppState>,
    Path(license_plate): Path<String>,
) -> HandlerResult<ParkingLogEntry> {
    Ok(Json(state.logs.latest(&license_plate, EventType::Entry).await?))
}

/// GET /parking-logs/exit/{license_plate}/latest
pub async fn latest_exit_log(
    State(state): State<AppState>,
    Path(license_plate): Path<String>,
) -> HandlerResult<ParkingLogEntry> {
    Ok(Json(state.logs.latest(&license_plate, EventType::Exit).await?))
}

/// GET /parking-logs/statistics/camera
pub async fn camera_statistics(
    State(state): State<AppState>,
) -> HandlerResult<CameraStatisticsResponse> {
    Ok(Json(CameraStatisticsResponse {
        statistics: state.logs.camera_statistics().await?,
    }))
}
