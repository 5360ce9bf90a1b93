use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized license plate (trimmed, uppercase).
///
/// Every boundary that accepts a plate string goes through [`LicensePlate::parse`],
/// so two spellings of the same plate always map to the same record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicensePlate(String);

impl LicensePlate {
    /// Normalize a raw plate string. Returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LicensePlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LicensePlate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Occupancy status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    In,
    Out,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::In => "in",
            VehicleStatus::Out => "out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in" => Some(VehicleStatus::In),
            "out" => Some(VehicleStatus::Out),
            _ => None,
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live (or most recent) occupancy record for one plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub license_plate: LicensePlate,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
    pub entry_image_path: Option<String>,
    pub exit_image_path: Option<String>,
    /// Minutes parked, set on exit.
    pub duration: Option<f64>,
    pub duration_formatted: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Fresh record for a vehicle that just entered.
    pub fn entered(
        license_plate: LicensePlate,
        at: DateTime<Utc>,
        entry_image_path: Option<String>,
    ) -> Self {
        Self {
            license_plate,
            entry_time: at,
            exit_time: None,
            status: VehicleStatus::In,
            entry_image_path,
            exit_image_path: None,
            duration: None,
            duration_formatted: None,
            updated_at: at,
        }
    }

    pub fn is_inside(&self) -> bool {
        self.status == VehicleStatus::In
    }

    /// Transition `in -> out`, returning the computed stay in minutes.
    pub fn mark_exited(&mut self, at: DateTime<Utc>, exit_image_path: Option<String>) -> f64 {
        let minutes = stay_minutes(self.entry_time, at);
        self.exit_time = Some(at);
        self.status = VehicleStatus::Out;
        self.exit_image_path = exit_image_path;
        self.duration = Some(minutes);
        self.duration_formatted = Some(format_duration(minutes));
        self.updated_at = at;
        minutes
    }
}

/// Stay length in (fractional) minutes, clamped at zero.
pub fn stay_minutes(entry: DateTime<Utc>, exit: DateTime<Utc>) -> f64 {
    let millis = (exit - entry).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}

/// Render minutes as `"{h}h {m}m"`.
pub fn format_duration(minutes: f64) -> String {
    let whole = minutes.max(0.0).floor() as i64;
    format!("{}h {}m", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plate_normalization() {
        let plate = LicensePlate::parse("  30a-12345 ").unwrap();
        assert_eq!(plate.as_str(), "30A-12345");
        assert!(LicensePlate::parse("   ").is_none());
        assert!(LicensePlate::parse("").is_none());
    }

    #[test]
    fn test_status_round_trip_strings() {
        assert_eq!(VehicleStatus::parse("in"), Some(VehicleStatus::In));
        assert_eq!(VehicleStatus::parse("out"), Some(VehicleStatus::Out));
        assert_eq!(VehicleStatus::parse("IN"), None);
        assert_eq!(VehicleStatus::Out.to_string(), "out");
    }

    #[test]
    fn test_mark_exited_sets_duration() {
        let entry = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut vehicle = Vehicle::entered(LicensePlate::parse("29a-67890").unwrap(), entry, None);

        let minutes = vehicle.mark_exited(exit, Some("/images/exit.jpg".to_string()));

        assert_eq!(minutes, 90.0);
        assert_eq!(vehicle.status, VehicleStatus::Out);
        assert_eq!(vehicle.exit_time, Some(exit));
        assert_eq!(vehicle.duration_formatted.as_deref(), Some("1h 30m"));
    }

    #[test]
    fn test_stay_minutes_never_negative() {
        let later = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(stay_minutes(later, earlier), 0.0);
        assert_eq!(stay_minutes(later, later), 0.0);
    }

    #[test]
    fn test_vehicle_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let vehicle = Vehicle::entered(LicensePlate::parse("51f-11111").unwrap(), at, None);
        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["licensePlate"], "51F-11111");
        assert_eq!(json["status"], "in");
        assert!(json["exitTime"].is_null());
        assert!(json["duration"].is_null());
    }
}
