//! Application state for the HTTP server.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::db::repository::FullRepository;
use crate::services::{Clock, ParkingLogService, SystemClock, VehicleTracker};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backend handle, used directly only for health checks
    pub repository: Arc<dyn FullRepository>,
    pub tracker: VehicleTracker,
    pub logs: ParkingLogService,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            tracker: VehicleTracker::new(repository.clone(), clock.clone(), offset),
            logs: ParkingLogService::new(repository.clone(), clock, offset),
            repository,
        }
    }

    /// State backed by the wall clock.
    pub fn with_system_clock(repository: Arc<dyn FullRepository>, offset: FixedOffset) -> Self {
        Self::new(repository, Arc::new(SystemClock), offset)
    }
}
