//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies reuse the service input types; everything here is the
//! response envelope around domain records. All bodies are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::models::{LogPage, PageInfo, ParkingLogEntry, Vehicle};
pub use crate::services::{
    CameraStat, GateEvent, HourlyStat, LogDraft, LogEdit, LogQuery, OccupancySummary,
    ParkingDuration,
};

pub const VEHICLE_ALREADY_INSIDE: &str = "VEHICLE_ALREADY_INSIDE";
pub const ENTRY_RECORD_NOT_FOUND: &str = "ENTRY_RECORD_NOT_FOUND";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// `?date=YYYY-MM-DD`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// `?eventType=entry|exit`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeQuery {
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    pub vehicle: Vehicle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitResponse {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    pub vehicle: Option<Vehicle>,
    /// Minutes parked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleListResponse {
    pub total: usize,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayHistoryResponse {
    pub date: String,
    pub total: usize,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleHistoryResponse {
    pub license_plate: String,
    pub total: usize,
    pub logs: Vec<ParkingLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyStatisticsResponse {
    pub date: String,
    pub statistics: Vec<HourlyStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayLogsResponse {
    pub date: String,
    pub total: usize,
    pub logs: Vec<ParkingLogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraStatisticsResponse {
    pub statistics: Vec<CameraStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLogResponse {
    pub message: String,
    pub log: ParkingLogEntry,
    pub deleted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_duration: Option<ParkingDuration>,
}
