use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vehicle::LicensePlate;

/// Kind of observation recorded in the parking log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Entry,
    Exit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Entry => "entry",
            EventType::Exit => "exit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "entry" => Some(EventType::Entry),
            "exit" => Some(EventType::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-assigned log identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub i64);

impl LogId {
    pub fn new(value: i64) -> Self {
        LogId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persisted entry/exit observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingLogEntry {
    pub id: LogId,
    pub license_plate: LicensePlate,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A log entry about to be written; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewParkingLog {
    pub license_plate: LicensePlate,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

impl NewParkingLog {
    pub fn into_entry(self, id: LogId, created_at: DateTime<Utc>) -> ParkingLogEntry {
        ParkingLogEntry {
            id,
            license_plate: self.license_plate,
            event_type: self.event_type,
            timestamp: self.timestamp,
            camera_id: self.camera_id,
            card_id: self.card_id,
            image_path: self.image_path,
            confidence: self.confidence,
            ocr_confidence: self.ocr_confidence,
            created_at,
        }
    }
}

/// Administrative correction of an existing log. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParkingLogPatch {
    pub license_plate: Option<LicensePlate>,
    pub event_type: Option<EventType>,
    pub timestamp: Option<DateTime<Utc>>,
    pub camera_id: Option<String>,
    pub card_id: Option<String>,
    pub image_path: Option<String>,
    pub confidence: Option<f64>,
    pub ocr_confidence: Option<f64>,
}

impl ParkingLogPatch {
    pub fn apply(&self, entry: &mut ParkingLogEntry) {
        if let Some(plate) = &self.license_plate {
            entry.license_plate = plate.clone();
        }
        if let Some(event_type) = self.event_type {
            entry.event_type = event_type;
        }
        if let Some(timestamp) = self.timestamp {
            entry.timestamp = timestamp;
        }
        if let Some(camera_id) = &self.camera_id {
            entry.camera_id = Some(camera_id.clone());
        }
        if let Some(card_id) = &self.card_id {
            entry.card_id = Some(card_id.clone());
        }
        if let Some(image_path) = &self.image_path {
            entry.image_path = Some(image_path.clone());
        }
        if let Some(confidence) = self.confidence {
            entry.confidence = Some(confidence);
        }
        if let Some(ocr_confidence) = self.ocr_confidence {
            entry.ocr_confidence = Some(ocr_confidence);
        }
    }
}

/// Filter for administrative log listings. Time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub license_plate: Option<LicensePlate>,
    pub card_id: Option<String>,
    pub camera_id: Option<String>,
    pub event_type: Option<EventType>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn matches(&self, entry: &ParkingLogEntry) -> bool {
        if let Some(plate) = &self.license_plate {
            if &entry.license_plate != plate {
                return false;
            }
        }
        if let Some(card_id) = &self.card_id {
            if entry.card_id.as_deref() != Some(card_id.as_str()) {
                return false;
            }
        }
        if let Some(camera_id) = &self.camera_id {
            if entry.camera_id.as_deref() != Some(camera_id.as_str()) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if entry.event_type != event_type {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.timestamp > end {
                return false;
            }
        }
        true
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 500;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Page metadata returned with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl PageInfo {
    pub fn new(pagination: Pagination, total: u64) -> Self {
        let limit = u64::from(pagination.limit.max(1));
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub logs: Vec<ParkingLogEntry>,
    pub pagination: PageInfo,
}

/// Ordering used by every "most recent first" log listing.
pub fn newest_first(a: &ParkingLogEntry, b: &ParkingLogEntry) -> std::cmp::Ordering {
    b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id))
}

/// The log currently holding `card_id`, if the card is in use.
///
/// A card is in use while its most recent log (ignoring `exclude`) is an entry.
pub fn card_holder<'a, I>(
    logs: I,
    card_id: &str,
    exclude: Option<LogId>,
) -> Option<&'a ParkingLogEntry>
where
    I: IntoIterator<Item = &'a ParkingLogEntry>,
{
    logs.into_iter()
        .filter(|log| Some(log.id) != exclude)
        .filter(|log| log.card_id.as_deref() == Some(card_id))
        .min_by(|a, b| newest_first(a, b))
        .filter(|latest| latest.event_type == EventType::Entry)
}
