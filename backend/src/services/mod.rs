//! Service layer between the HTTP handlers and the repositories.
//!
//! Services own input validation, the clock and the facility time zone; the
//! repositories only ever see normalized, validated values.

pub mod clock;
pub mod parking_logs;
pub mod statistics;
pub mod tracking;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use parking_logs::{
    DeletedLog, LogDraft, LogEdit, LogQuery, ParkingDuration, ParkingLogService,
};
pub use statistics::{CameraStat, HourlyStat, OccupancySummary};
pub use tracking::{EntryDecision, ExitDecision, GateEvent, VehicleTracker};
