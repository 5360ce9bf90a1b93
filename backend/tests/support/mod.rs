#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use parking_tracker::db::repositories::LocalRepository;
use parking_tracker::db::repository::FullRepository;
use parking_tracker::services::{Clock, ManualClock, ParkingLogService, VehicleTracker};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to process-global env
/// vars across tests running in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// 2024-05-01 08:00:00 UTC.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Services over a fresh in-memory store with a hand-driven clock.
pub struct Harness {
    pub repo: Arc<LocalRepository>,
    pub clock: Arc<ManualClock>,
    pub tracker: VehicleTracker,
    pub logs: ParkingLogService,
}

impl Harness {
    pub fn new(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        let repo = Arc::new(LocalRepository::new());
        let clock = Arc::new(ManualClock::new(start));
        let shared = repo.clone() as Arc<dyn FullRepository>;
        Self {
            tracker: VehicleTracker::new(shared.clone(), clock.clone(), offset),
            logs: ParkingLogService::new(shared, clock.clone(), offset),
            repo,
            clock,
        }
    }

    pub fn at_morning() -> Self {
        Self::new(morning(), utc())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn repository(&self) -> Arc<dyn FullRepository> {
        self.repo.clone() as Arc<dyn FullRepository>
    }
}
