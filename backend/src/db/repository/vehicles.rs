//! Vehicle record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{LicensePlate, NewParkingLog, ParkingLogEntry, Vehicle};

/// A vehicle arriving at the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEntry {
    pub license_plate: LicensePlate,
    pub at: DateTime<Utc>,
    pub image_path: Option<String>,
    /// Log entry written together with the vehicle record.
    pub log: NewParkingLog,
}

/// A vehicle leaving through the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleExit {
    pub license_plate: LicensePlate,
    pub at: DateTime<Utc>,
    pub image_path: Option<String>,
    pub log: NewParkingLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// The record was created or re-opened and the entry log appended.
    Recorded {
        vehicle: Vehicle,
        log: ParkingLogEntry,
    },
    /// The plate is already inside; nothing was written.
    AlreadyInside(Vehicle),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    /// The record was closed and the exit log appended.
    Recorded {
        vehicle: Vehicle,
        duration_minutes: f64,
        log: ParkingLogEntry,
    },
    /// No record with `status = in` exists for the plate; nothing was written.
    NotInside,
}

/// Repository trait for vehicle occupancy records.
///
/// `record_entry` and `record_exit` are conditional writes keyed by
/// `(plate, expected prior status)`: the status check, the record mutation and the
/// log append happen as one atomic step, so two racing calls for the same plate
/// can never both succeed.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Check that the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Open (or re-open) the occupancy record unless the plate is already inside.
    async fn record_entry(&self, entry: VehicleEntry) -> RepositoryResult<EntryOutcome>;

    /// Close the occupancy record if, and only if, the plate is currently inside.
    async fn record_exit(&self, exit: VehicleExit) -> RepositoryResult<ExitOutcome>;

    /// Fetch the record for a plate regardless of status.
    async fn find_vehicle(&self, plate: &LicensePlate) -> RepositoryResult<Option<Vehicle>>;

    /// All vehicles with `status = in`, most recent entry first.
    async fn list_vehicles_inside(&self) -> RepositoryResult<Vec<Vehicle>>;

    /// Vehicles whose `entry_time` lies in `[start, end]`, most recent entry first.
    async fn list_vehicles_entered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Vehicle>>;

    /// Number of vehicles with `status = in`.
    async fn count_vehicles_inside(&self) -> RepositoryResult<u64>;
}
