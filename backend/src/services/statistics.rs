//! Traffic and occupancy aggregates.
//!
//! Pure functions over already-fetched records; callers pick the day window.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::models::{local_hour, EventType, ParkingLogEntry, Vehicle, VehicleStatus};

/// Log count for one `(hour, eventType)` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyStat {
    pub hour: u32,
    pub event_type: EventType,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySummary {
    pub current_vehicles_inside: u64,
    pub today_entry: u64,
    pub today_exit: u64,
    pub today_total: u64,
}

/// Aggregates for one `(cameraId, eventType)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStat {
    pub camera_id: Option<String>,
    pub event_type: EventType,
    pub count: u64,
    pub avg_confidence: Option<f64>,
    pub avg_ocr_confidence: Option<f64>,
}

/// Group logs by local hour-of-day and event type, ascending by hour (entry before exit).
///
/// Empty buckets are omitted.
pub fn hourly_histogram(logs: &[ParkingLogEntry], offset: FixedOffset) -> Vec<HourlyStat> {
    let mut buckets: BTreeMap<(u32, EventType), u64> = BTreeMap::new();
    for log in logs {
        *buckets
            .entry((local_hour(log.timestamp, offset), log.event_type))
            .or_default() += 1;
    }
    buckets
        .into_iter()
        .map(|((hour, event_type), count)| HourlyStat {
            hour,
            event_type,
            count,
        })
        .collect()
}

/// `today` is every vehicle whose entry falls in the current day window.
pub fn summarize(currently_inside: u64, today: &[Vehicle]) -> OccupancySummary {
    let exited = today
        .iter()
        .filter(|v| v.status == VehicleStatus::Out)
        .count() as u64;
    OccupancySummary {
        current_vehicles_inside: currently_inside,
        today_entry: today.len() as u64,
        today_exit: exited,
        today_total: today.len() as u64,
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    n: u64,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// Per-camera counts and mean confidences, sorted by camera then event type.
///
/// Logs without a camera form their own group, listed first. Averages skip
/// absent values and are `None` when a group has none.
pub fn camera_statistics(logs: &[ParkingLogEntry]) -> Vec<CameraStat> {
    let mut groups: BTreeMap<(Option<String>, EventType), (u64, Mean, Mean)> = BTreeMap::new();
    for log in logs {
        let (count, confidence, ocr) = groups
            .entry((log.camera_id.clone(), log.event_type))
            .or_default();
        *count += 1;
        confidence.add(log.confidence);
        ocr.add(log.ocr_confidence);
    }
    groups
        .into_iter()
        .map(|((camera_id, event_type), (count, confidence, ocr))| CameraStat {
            camera_id,
            event_type,
            count,
            avg_confidence: confidence.value(),
            avg_ocr_confidence: ocr.value(),
        })
        .collect()
}
