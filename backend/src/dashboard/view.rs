//! What the dashboard shows, derived from one pair of snapshots.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::client::{resolve_image_url, InsideSnapshot, TodaySnapshot};
use crate::models::{Vehicle, VehicleStatus};

/// Number of rows in the "recent entries" list.
pub const RECENT_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub date: String,
    pub inside: Vec<Vehicle>,
    pub today: Vec<Vehicle>,
    pub latest_entry: Option<Vehicle>,
    pub latest_exit: Option<Vehicle>,
    pub refreshed_at: DateTime<Utc>,
}

impl DashboardView {
    /// Both lists arrive most-recent-first from the server and are used as-is.
    ///
    /// Image paths are rewritten against `origin`.
    pub fn from_snapshots(
        origin: &str,
        inside: InsideSnapshot,
        today: TodaySnapshot,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let date = today.date;
        let inside: Vec<Vehicle> = inside
            .vehicles
            .into_iter()
            .map(|v| with_resolved_images(origin, v))
            .collect();
        let today: Vec<Vehicle> = today
            .vehicles
            .into_iter()
            .map(|v| with_resolved_images(origin, v))
            .collect();

        let latest_entry = today.first().cloned();
        let latest_exit = today
            .iter()
            .find(|v| v.status == VehicleStatus::Out)
            .cloned();

        Self {
            date,
            inside,
            today,
            latest_entry,
            latest_exit,
            refreshed_at,
        }
    }

    pub fn recent_entries(&self) -> &[Vehicle] {
        &self.today[..self.today.len().min(RECENT_ENTRIES)]
    }

    /// Plain-text rendering for a terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Parking {} | inside: {} | today: {} | refreshed {}",
            self.date,
            self.inside.len(),
            self.today.len(),
            self.refreshed_at.format("%H:%M:%S")
        );
        let _ = writeln!(out, "Latest entry: {}", describe(self.latest_entry.as_ref(), false));
        let _ = writeln!(out, "Latest exit:  {}", describe(self.latest_exit.as_ref(), true));
        let _ = writeln!(out, "Recent entries:");
        for vehicle in self.recent_entries() {
            let _ = writeln!(
                out,
                "  {:<12} {}  {}",
                vehicle.license_plate.as_str(),
                vehicle.entry_time.format("%H:%M:%S"),
                vehicle.status
            );
        }
        out
    }
}

fn with_resolved_images(origin: &str, mut vehicle: Vehicle) -> Vehicle {
    vehicle.entry_image_path = vehicle
        .entry_image_path
        .map(|p| resolve_image_url(origin, &p));
    vehicle.exit_image_path = vehicle
        .exit_image_path
        .map(|p| resolve_image_url(origin, &p));
    vehicle
}

fn describe(vehicle: Option<&Vehicle>, exit: bool) -> String {
    let Some(v) = vehicle else {
        return "-".to_string();
    };
    let (at, image) = if exit {
        (v.exit_time.unwrap_or(v.entry_time), v.exit_image_path.as_deref())
    } else {
        (v.entry_time, v.entry_image_path.as_deref())
    };
    let mut line = format!("{} at {}", v.license_plate, at.format("%H:%M:%S"));
    if let (true, Some(duration)) = (exit, &v.duration_formatted) {
        let _ = write!(line, " ({})", duration);
    }
    if let Some(image) = image {
        let _ = write!(line, " [{}]", image);
    }
    line
}
