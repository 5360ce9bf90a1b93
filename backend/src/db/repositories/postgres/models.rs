use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{parking_logs, vehicles};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    format_duration, EventType, LicensePlate, LogId, NewParkingLog, ParkingLogEntry, Vehicle,
    VehicleStatus,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = vehicles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // created_at is only read by ad-hoc queries
pub struct VehicleRow {
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: String,
    pub entry_image_path: Option<String>,
    pub exit_image_path: Option<String>,
    pub duration_minutes: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full set of columns written when a vehicle (re-)enters.
///
/// `treat_none_as_null` makes the upsert clear the exit columns of a re-opened record.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = vehicles)]
#[diesel(treat_none_as_null = true)]
pub struct VehicleEntryRow {
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: String,
    pub entry_image_path: Option<String>,
    pub exit_image_path: Option<String>,
    pub duration_minutes: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = vehicles)]
pub struct VehicleExitChangeset {
    pub exit_time: DateTime<Utc>,
    pub status: String,
    pub exit_image_path: Option<String>,
    pub duration_minutes: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = parking_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ParkingLogRow {
    pub log_id: i64,
    pub license_plate: String,
    pub event_type: String,
    pub recorded_at: DateTime<Utc>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = parking_logs)]
#[diesel(treat_none_as_null = true)]
pub struct ParkingLogWriteRow {
    pub license_plate: String,
    pub event_type: String,
    pub recorded_at: DateTime<Utc>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

impl VehicleEntryRow {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            license_plate: vehicle.license_plate.as_str().to_string(),
            entry_time: vehicle.entry_time,
            exit_time: vehicle.exit_time,
            status: vehicle.status.as_str().to_string(),
            entry_image_path: vehicle.entry_image_path.clone(),
            exit_image_path: vehicle.exit_image_path.clone(),
            duration_minutes: vehicle.duration,
            updated_at: vehicle.updated_at,
        }
    }
}

impl From<&NewParkingLog> for ParkingLogWriteRow {
    fn from(log: &NewParkingLog) -> Self {
        Self {
            license_plate: log.license_plate.as_str().to_string(),
            event_type: log.event_type.as_str().to_string(),
            recorded_at: log.timestamp,
            camera_id: log.camera_id.clone(),
            card_id: log.card_id.clone(),
            image_path: log.image_path.clone(),
            confidence: log.confidence,
            ocr_confidence: log.ocr_confidence,
        }
    }
}

impl From<&ParkingLogEntry> for ParkingLogWriteRow {
    fn from(log: &ParkingLogEntry) -> Self {
        Self {
            license_plate: log.license_plate.as_str().to_string(),
            event_type: log.event_type.as_str().to_string(),
            recorded_at: log.timestamp,
            camera_id: log.camera_id.clone(),
            card_id: log.card_id.clone(),
            image_path: log.image_path.clone(),
            confidence: log.confidence,
            ocr_confidence: log.ocr_confidence,
        }
    }
}

fn stored_plate(raw: &str) -> RepositoryResult<LicensePlate> {
    LicensePlate::parse(raw)
        .ok_or_else(|| RepositoryError::store(format!("Stored plate is empty: {:?}", raw)))
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = RepositoryError;

    fn try_from(row: VehicleRow) -> RepositoryResult<Self> {
        let status = VehicleStatus::parse(&row.status).ok_or_else(|| {
            RepositoryError::store(format!("Unknown vehicle status: {}", row.status))
        })?;
        Ok(Vehicle {
            license_plate: stored_plate(&row.license_plate)?,
            entry_time: row.entry_time,
            exit_time: row.exit_time,
            status,
            entry_image_path: row.entry_image_path,
            exit_image_path: row.exit_image_path,
            duration: row.duration_minutes,
            duration_formatted: row.duration_minutes.map(format_duration),
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ParkingLogRow> for ParkingLogEntry {
    type Error = RepositoryError;

    fn try_from(row: ParkingLogRow) -> RepositoryResult<Self> {
        let event_type = EventType::parse(&row.event_type).ok_or_else(|| {
            RepositoryError::store(format!("Unknown event type: {}", row.event_type))
        })?;
        Ok(ParkingLogEntry {
            id: LogId::new(row.log_id),
            license_plate: stored_plate(&row.license_plate)?,
            event_type,
            timestamp: row.recorded_at,
            camera_id: row.camera_id,
            card_id: row.card_id,
            image_path: row.image_path,
            confidence: row.confidence,
            ocr_confidence: row.ocr_confidence,
            created_at: row.created_at,
        })
    }
}
