//! Administrative management of the parking log.
//!
//! Creation and edits go through the same normalization and confidence checks as
//! gate events. Card uniqueness is enforced by the repository.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::Clock;
use super::statistics::{camera_statistics, CameraStat};
use super::validation::{
    check_confidence, optional_text, parse_event_type, require_plate, require_window,
};
use crate::db::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::models::{
    format_duration, parse_date, DayWindow, EventType, LogFilter, LogId, LogPage, NewParkingLog,
    Pagination, ParkingLogEntry, ParkingLogPatch, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};

/// Body of an administrative create.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDraft {
    pub license_plate: Option<String>,
    pub event_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

/// Body of an administrative update; absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEdit {
    pub license_plate: Option<String>,
    pub event_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

/// Raw listing parameters as received on the query string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub card_id: Option<String>,
    pub license_plate: Option<String>,
    pub camera_id: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Elapsed time between an entry log and its deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingDuration {
    pub milliseconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub formatted: String,
}

impl ParkingDuration {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let milliseconds = (end - start).num_milliseconds().max(0);
        let minutes = milliseconds / 60_000;
        Self {
            milliseconds,
            minutes,
            hours: minutes / 60,
            formatted: format_duration(minutes as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedLog {
    pub log: ParkingLogEntry,
    pub deleted_at: DateTime<Utc>,
    /// Present only for entry logs.
    pub parking_duration: Option<ParkingDuration>,
}

fn not_found(id: LogId, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Parking log {} not found", id),
        ErrorContext::new(operation)
            .with_entity("parking_log")
            .with_entity_id(id),
    )
}

#[derive(Clone)]
pub struct ParkingLogService {
    repository: Arc<dyn FullRepository>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl ParkingLogService {
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

    /// Turn raw query parameters into a validated filter and page.
    ///
    /// Date bounds accept RFC 3339 instants or `YYYY-MM-DD`; a bare date starts
    /// at local midnight for `startDate` and runs to the end of the local day for
    /// `endDate`.
    pub fn build_filter(&self, query: &LogQuery) -> RepositoryResult<(LogFilter, Pagination)> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(RepositoryError::validation_with_context(
                "page must be at least 1",
                ErrorContext::new("list_logs").with_entity("page"),
            ));
        }
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(RepositoryError::validation_with_context(
                format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
                ErrorContext::new("list_logs").with_entity("limit"),
            ));
        }

        let license_plate = match optional_text(query.license_plate.as_deref()) {
            Some(raw) => Some(require_plate(Some(&raw), "list_logs")?),
            None => None,
        };
        let event_type = match optional_text(query.event_type.as_deref()) {
            Some(raw) => Some(parse_event_type(&raw, "list_logs")?),
            None => None,
        };
        let start = self.parse_bound(query.start_date.as_deref(), "startDate", false)?;
        let end = self.parse_bound(query.end_date.as_deref(), "endDate", true)?;

        let filter = LogFilter {
            license_plate,
            card_id: optional_text(query.card_id.as_deref()),
            camera_id: optional_text(query.camera_id.as_deref()),
            event_type,
            start,
            end,
        };
        Ok((filter, Pagination { page, limit }))
    }

    fn parse_bound(
        &self,
        raw: Option<&str>,
        field: &str,
        end_of_day: bool,
    ) -> RepositoryResult<Option<DateTime<Utc>>> {
        let Some(raw) = optional_text(raw) else {
            return Ok(None);
        };
        if let Ok(instant) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(instant.with_timezone(&Utc)));
        }
        match parse_date(&raw) {
            Some(date) => {
                let window =
                    require_window(DayWindow::for_date(date, self.offset), field, "list_logs")?;
                Ok(Some(if end_of_day { window.end } else { window.start }))
            }
            None => Err(RepositoryError::validation_with_context(
                format!("{} must be YYYY-MM-DD or an RFC 3339 timestamp", field),
                ErrorContext::new("list_logs")
                    .with_entity(field)
                    .with_details(raw),
            )),
        }
    }

    pub async fn list(&self, query: &LogQuery) -> RepositoryResult<LogPage> {
        let (filter, page) = self.build_filter(query)?;
        debug!(?filter, page = page.page, limit = page.limit, "listing parking logs");
        self.repository.list_logs(&filter, page).await
    }

    pub async fn get(&self, id: LogId) -> RepositoryResult<ParkingLogEntry> {
        self.repository
            .get_log(id)
            .await?
            .ok_or_else(|| not_found(id, "get_log"))
    }

    pub async fn create(&self, draft: LogDraft) -> RepositoryResult<ParkingLogEntry> {
        let operation = "create_log";
        let license_plate = require_plate(draft.license_plate.as_deref(), operation)?;
        let event_type = match optional_text(draft.event_type.as_deref()) {
            Some(raw) => parse_event_type(&raw, operation)?,
            None => {
                return Err(RepositoryError::validation_with_context(
                    "eventType is required",
                    ErrorContext::new(operation).with_entity("eventType"),
                ))
            }
        };

        let log = NewParkingLog {
            license_plate,
            event_type,
            timestamp: draft.timestamp.unwrap_or_else(|| self.clock.now()),
            camera_id: optional_text(draft.camera_id.as_deref()),
            card_id: optional_text(draft.card_id.as_deref()),
            image_path: optional_text(draft.image_path.as_deref()),
            confidence: check_confidence(draft.confidence, "confidence", operation)?,
            ocr_confidence: check_confidence(draft.ocr_confidence, "ocrConfidence", operation)?,
        };

        let created = self.repository.create_log(log).await?;
        info!(
            log_id = %created.id,
            plate = %created.license_plate,
            event = %created.event_type,
            "parking log created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: LogId, edit: LogEdit) -> RepositoryResult<ParkingLogEntry> {
        let operation = "update_log";
        let license_plate = match edit.license_plate.as_deref() {
            Some(raw) => Some(require_plate(Some(raw), operation)?),
            None => None,
        };
        let event_type = match edit.event_type.as_deref() {
            Some(raw) => Some(parse_event_type(raw, operation)?),
            None => None,
        };
        let patch = ParkingLogPatch {
            license_plate,
            event_type,
            timestamp: edit.timestamp,
            camera_id: optional_text(edit.camera_id.as_deref()),
            card_id: optional_text(edit.card_id.as_deref()),
            image_path: optional_text(edit.image_path.as_deref()),
            confidence: check_confidence(edit.confidence, "confidence", operation)?,
            ocr_confidence: check_confidence(edit.ocr_confidence, "ocrConfidence", operation)?,
        };

        let updated = self
            .repository
            .update_log(id, patch)
            .await?
            .ok_or_else(|| not_found(id, operation))?;
        info!(log_id = %id, "parking log updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: LogId) -> RepositoryResult<DeletedLog> {
        let log = self
            .repository
            .delete_log(id)
            .await?
            .ok_or_else(|| not_found(id, "delete_log"))?;
        let deleted_at = self.clock.now();
        let parking_duration = (log.event_type == EventType::Entry)
            .then(|| ParkingDuration::between(log.timestamp, deleted_at));
        info!(log_id = %id, plate = %log.license_plate, "parking log deleted");
        Ok(DeletedLog {
            log,
            deleted_at,
            parking_duration,
        })
    }

    /// Logs recorded during the current local day, optionally of one type.
    pub async fn today(
        &self,
        event_type: Option<&str>,
    ) -> RepositoryResult<(DayWindow, Vec<ParkingLogEntry>)> {
        let event_type = match optional_text(event_type) {
            Some(raw) => Some(parse_event_type(&raw, "today_logs")?),
            None => None,
        };
        let window = require_window(
            DayWindow::containing(self.clock.now(), self.offset),
            "date",
            "today_logs",
        )?;
        let filter = LogFilter {
            event_type,
            start: Some(window.start),
            end: Some(window.end),
            ..Default::default()
        };
        let logs = self.repository.find_logs(&filter).await?;
        Ok((window, logs))
    }

    /// Most recent log of `event_type` for the plate.
    pub async fn latest(
        &self,
        raw_plate: &str,
        event_type: EventType,
    ) -> RepositoryResult<ParkingLogEntry> {
        let plate = require_plate(Some(raw_plate), "latest_log")?;
        let filter = LogFilter {
            license_plate: Some(plate.clone()),
            event_type: Some(event_type),
            ..Default::default()
        };
        let logs = self.repository.find_logs(&filter).await?;
        logs.into_iter().next().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("No {} log for {}", event_type, plate),
                ErrorContext::new("latest_log")
                    .with_entity("parking_log")
                    .with_entity_id(plate),
            )
        })
    }

    pub async fn camera_statistics(&self) -> RepositoryResult<Vec<CameraStat>> {
        let logs = self.repository.find_logs(&LogFilter::default()).await?;
        Ok(camera_statistics(&logs))
    }
}
