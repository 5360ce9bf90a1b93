//! Vehicle entry/exit reconciliation.
//!
//! [`VehicleTracker`] decides whether a plate seen at a gate is a new entry, a
//! duplicate entry, a valid exit or a rejected exit. The decision and the write are
//! delegated to the repository as one conditional operation, so two racing gate
//! events for the same plate cannot both succeed.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::statistics::{hourly_histogram, summarize, HourlyStat, OccupancySummary};
use super::validation::{
    check_confidence, optional_text, require_plate, require_text, require_window,
};
use crate::db::repository::{
    EntryOutcome, ExitOutcome, FullRepository, RepositoryResult, VehicleEntry, VehicleExit,
};
use crate::models::{
    DayWindow, EventType, LicensePlate, LogFilter, NewParkingLog, ParkingLogEntry, Vehicle,
};

/// A plate observation reported by a gate kiosk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateEvent {
    pub license_plate: Option<String>,
    pub image_path: Option<String>,
    pub camera_id: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

impl GateEvent {
    pub fn new(license_plate: impl Into<String>, camera_id: impl Into<String>) -> Self {
        Self {
            license_plate: Some(license_plate.into()),
            camera_id: Some(camera_id.into()),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = Some(image_path.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64, ocr_confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self.ocr_confidence = Some(ocr_confidence);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecision {
    Entered(Vehicle),
    /// Rejected; the existing record is returned unchanged.
    AlreadyInside(Vehicle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitDecision {
    Exited {
        vehicle: Vehicle,
        duration_minutes: f64,
    },
    /// No vehicle with this plate is inside.
    NotAllowed,
}

struct CheckedEvent {
    plate: LicensePlate,
    image_path: Option<String>,
    log: NewParkingLog,
}

#[derive(Clone)]
pub struct VehicleTracker {
    repository: Arc<dyn FullRepository>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl VehicleTracker {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            repository,
            clock,
            offset,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Window for `date`, or for the current local day when `None`.
    pub fn day_window(&self, date: Option<NaiveDate>) -> RepositoryResult<DayWindow> {
        let window = match date {
            Some(date) => DayWindow::for_date(date, self.offset),
            None => DayWindow::containing(self.clock.now(), self.offset),
        };
        require_window(window, "date", "day_window")
    }

    fn check(
        &self,
        event: &GateEvent,
        event_type: EventType,
        operation: &str,
    ) -> RepositoryResult<CheckedEvent> {
        let plate = require_plate(event.license_plate.as_deref(), operation)?;
        let camera_id = require_text(event.camera_id.as_deref(), "cameraId", operation)?;
        let confidence = check_confidence(event.confidence, "confidence", operation)?;
        let ocr_confidence = check_confidence(event.ocr_confidence, "ocrConfidence", operation)?;
        let image_path = optional_text(event.image_path.as_deref());

        let log = NewParkingLog {
            license_plate: plate.clone(),
            event_type,
            timestamp: self.clock.now(),
            camera_id: Some(camera_id),
            card_id: None,
            image_path: image_path.clone(),
            confidence,
            ocr_confidence,
        };
        Ok(CheckedEvent {
            plate,
            image_path,
            log,
        })
    }

    pub async fn handle_entry(&self, event: &GateEvent) -> RepositoryResult<EntryDecision> {
        let checked = self.check(event, EventType::Entry, "handle_entry")?;
        let camera = checked.log.camera_id.clone().unwrap_or_default();

        let outcome = self
            .repository
            .record_entry(VehicleEntry {
                license_plate: checked.plate.clone(),
                at: checked.log.timestamp,
                image_path: checked.image_path,
                log: checked.log,
            })
            .await
            .map_err(|e| e.with_operation("handle_entry"))?;

        match outcome {
            EntryOutcome::Recorded { vehicle, log } => {
                info!(
                    plate = %vehicle.license_plate,
                    camera = %camera,
                    log_id = %log.id,
                    "vehicle entered"
                );
                Ok(EntryDecision::Entered(vehicle))
            }
            EntryOutcome::AlreadyInside(vehicle) => {
                warn!(
                    plate = %vehicle.license_plate,
                    camera = %camera,
                    since = %vehicle.entry_time.to_rfc3339(),
                    "entry rejected: vehicle already inside"
                );
                Ok(EntryDecision::AlreadyInside(vehicle))
            }
        }
    }

    pub async fn handle_exit(&self, event: &GateEvent) -> RepositoryResult<ExitDecision> {
        let checked = self.check(event, EventType::Exit, "handle_exit")?;
        let camera = checked.log.camera_id.clone().unwrap_or_default();
        let plate = checked.plate.clone();

        let outcome = self
            .repository
            .record_exit(VehicleExit {
                license_plate: checked.plate,
                at: checked.log.timestamp,
                image_path: checked.image_path,
                log: checked.log,
            })
            .await
            .map_err(|e| e.with_operation("handle_exit"))?;

        match outcome {
            ExitOutcome::Recorded {
                vehicle,
                duration_minutes,
                log,
            } => {
                info!(
                    plate = %vehicle.license_plate,
                    camera = %camera,
                    log_id = %log.id,
                    minutes = duration_minutes,
                    "vehicle exited"
                );
                Ok(ExitDecision::Exited {
                    vehicle,
                    duration_minutes,
                })
            }
            ExitOutcome::NotInside => {
                warn!(plate = %plate, camera = %camera, "exit rejected: no entry record");
                Ok(ExitDecision::NotAllowed)
            }
        }
    }

    /// Vehicles currently inside, most recent entry first.
    pub async fn vehicles_inside(&self) -> RepositoryResult<Vec<Vehicle>> {
        debug!("listing vehicles inside");
        self.repository.list_vehicles_inside().await
    }

    /// Vehicles that entered during the given local day, most recent first.
    pub async fn history_for_day(
        &self,
        date: Option<NaiveDate>,
    ) -> RepositoryResult<(DayWindow, Vec<Vehicle>)> {
        let window = self.day_window(date)?;
        debug!(date = %window.date_string(), "loading day history");
        let vehicles = self
            .repository
            .list_vehicles_entered_between(window.start, window.end)
            .await?;
        Ok((window, vehicles))
    }

    pub async fn find_vehicle(&self, raw_plate: &str) -> RepositoryResult<Option<Vehicle>> {
        let plate = require_plate(Some(raw_plate), "find_vehicle")?;
        self.repository.find_vehicle(&plate).await
    }

    /// Every log for the plate, most recent first.
    pub async fn vehicle_history(
        &self,
        raw_plate: &str,
    ) -> RepositoryResult<(LicensePlate, Vec<ParkingLogEntry>)> {
        let plate = require_plate(Some(raw_plate), "vehicle_history")?;
        let filter = LogFilter {
            license_plate: Some(plate.clone()),
            ..Default::default()
        };
        let logs = self.repository.find_logs(&filter).await?;
        Ok((plate, logs))
    }

    pub async fn hourly_statistics(
        &self,
        date: Option<NaiveDate>,
    ) -> RepositoryResult<(DayWindow, Vec<HourlyStat>)> {
        let window = self.day_window(date)?;
        let filter = LogFilter {
            start: Some(window.start),
            end: Some(window.end),
            ..Default::default()
        };
        let logs = self.repository.find_logs(&filter).await?;
        Ok((window, hourly_histogram(&logs, self.offset)))
    }

    pub async fn count_inside(&self) -> RepositoryResult<u64> {
        self.repository.count_vehicles_inside().await
    }

    /// Occupancy right now plus today's entry/exit totals.
    pub async fn summary(&self) -> RepositoryResult<OccupancySummary> {
        let inside = self.count_inside().await?;
        let (_, today) = self.history_for_day(None).await?;
        Ok(summarize(inside, &today))
    }
}
