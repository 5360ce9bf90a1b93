//! In-memory repository for unit testing and local development.
//!
//! Both stores live behind one `RwLock`, so every conditional write (entry, exit,
//! card-checked log create/update) observes and mutates a consistent snapshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::db::repository::{
    EntryOutcome, ErrorContext, ExitOutcome, ParkingLogRepository, RepositoryError,
    RepositoryResult, VehicleEntry, VehicleExit, VehicleRepository,
};
use crate::models::{
    card_holder, newest_first, EventType, LicensePlate, LogFilter, LogId, LogPage, NewParkingLog,
    PageInfo, Pagination, ParkingLogEntry, ParkingLogPatch, Vehicle,
};

#[derive(Debug, Default)]
struct LocalState {
    vehicles: HashMap<LicensePlate, Vehicle>,
    logs: BTreeMap<LogId, ParkingLogEntry>,
    next_log_id: i64,
}

impl LocalState {
    fn append(&mut self, log: NewParkingLog) -> ParkingLogEntry {
        self.next_log_id += 1;
        let id = LogId::new(self.next_log_id);
        let entry = log.into_entry(id, Utc::now());
        self.logs.insert(id, entry.clone());
        entry
    }

    fn ensure_card_free(
        &self,
        log: &ParkingLogEntry,
        exclude: Option<LogId>,
    ) -> RepositoryResult<()> {
        if log.event_type != EventType::Entry {
            return Ok(());
        }
        let Some(card_id) = log.card_id.as_deref() else {
            return Ok(());
        };
        match card_holder(self.logs.values(), card_id, exclude) {
            Some(holder) => Err(card_in_use(card_id, holder)),
            None => Ok(()),
        }
    }
}

fn card_in_use(card_id: &str, holder: &ParkingLogEntry) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!("Card {} already in use", card_id),
        ErrorContext::new("check_card")
            .with_entity("card")
            .with_entity_id(card_id)
            .with_details(format!(
                "registered for vehicle {} at {}",
                holder.license_plate,
                holder.timestamp.to_rfc3339()
            )),
    )
}

/// In-memory implementation of both parking stores.
#[derive(Debug, Clone, Default)]
pub struct LocalRepository {
    state: Arc<RwLock<LocalState>>,
    unavailable: Arc<AtomicBool>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage: while set, every operation fails with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self, operation: &str) -> RepositoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::connection_with_context(
                "local repository unavailable",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    pub fn vehicle_count(&self) -> usize {
        self.state.read().vehicles.len()
    }

    pub fn log_count(&self) -> usize {
        self.state.read().logs.len()
    }
}

#[async_trait]
impl VehicleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }

    async fn record_entry(&self, entry: VehicleEntry) -> RepositoryResult<EntryOutcome> {
        self.check_available("record_entry")?;
        let mut state = self.state.write();

        if let Some(existing) = state.vehicles.get(&entry.license_plate) {
            if existing.is_inside() {
                return Ok(EntryOutcome::AlreadyInside(existing.clone()));
            }
        }

        let vehicle = Vehicle::entered(entry.license_plate.clone(), entry.at, entry.image_path);
        state.vehicles.insert(entry.license_plate, vehicle.clone());
        let log = state.append(entry.log);

        Ok(EntryOutcome::Recorded { vehicle, log })
    }

    async fn record_exit(&self, exit: VehicleExit) -> RepositoryResult<ExitOutcome> {
        self.check_available("record_exit")?;
        let mut state = self.state.write();

        let Some(vehicle) = state
            .vehicles
            .get_mut(&exit.license_plate)
            .filter(|v| v.is_inside())
        else {
            return Ok(ExitOutcome::NotInside);
        };

        let duration_minutes = vehicle.mark_exited(exit.at, exit.image_path);
        let vehicle = vehicle.clone();
        let log = state.append(exit.log);

        Ok(ExitOutcome::Recorded {
            vehicle,
            duration_minutes,
            log,
        })
    }

    async fn find_vehicle(&self, plate: &LicensePlate) -> RepositoryResult<Option<Vehicle>> {
        self.check_available("find_vehicle")?;
        Ok(self.state.read().vehicles.get(plate).cloned())
    }

    async fn list_vehicles_inside(&self) -> RepositoryResult<Vec<Vehicle>> {
        self.check_available("list_vehicles_inside")?;
        let state = self.state.read();
        let mut vehicles: Vec<Vehicle> = state
            .vehicles
            .values()
            .filter(|v| v.is_inside())
            .cloned()
            .collect();
        sort_by_entry_desc(&mut vehicles);
        Ok(vehicles)
    }

    async fn list_vehicles_entered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Vehicle>> {
        self.check_available("list_vehicles_entered_between")?;
        let state = self.state.read();
        let mut vehicles: Vec<Vehicle> = state
            .vehicles
            .values()
            .filter(|v| v.entry_time >= start && v.entry_time <= end)
            .cloned()
            .collect();
        sort_by_entry_desc(&mut vehicles);
        Ok(vehicles)
    }

    async fn count_vehicles_inside(&self) -> RepositoryResult<u64> {
        self.check_available("count_vehicles_inside")?;
        let state = self.state.read();
        Ok(state.vehicles.values().filter(|v| v.is_inside()).count() as u64)
    }
}

fn sort_by_entry_desc(vehicles: &mut [Vehicle]) {
    vehicles.sort_by(|a, b| {
        b.entry_time
            .cmp(&a.entry_time)
            .then_with(|| a.license_plate.cmp(&b.license_plate))
    });
}

#[async_trait]
impl ParkingLogRepository for LocalRepository {
    async fn create_log(&self, log: NewParkingLog) -> RepositoryResult<ParkingLogEntry> {
        self.check_available("create_log")?;
        let mut state = self.state.write();

        // Validate against a provisional entry before assigning an id.
        let provisional = log.clone().into_entry(LogId::new(0), Utc::now());
        state.ensure_card_free(&provisional, None)?;

        Ok(state.append(log))
    }

    async fn get_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.check_available("get_log")?;
        Ok(self.state.read().logs.get(&id).cloned())
    }

    async fn list_logs(&self, filter: &LogFilter, page: Pagination) -> RepositoryResult<LogPage> {
        self.check_available("list_logs")?;
        let mut matching = self.find_logs(filter).await?;
        let total = matching.len() as u64;

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let logs: Vec<ParkingLogEntry> = if offset >= matching.len() {
            Vec::new()
        } else {
            matching
                .drain(offset..)
                .take(page.limit as usize)
                .collect()
        };

        Ok(LogPage {
            logs,
            pagination: PageInfo::new(page, total),
        })
    }

    async fn find_logs(&self, filter: &LogFilter) -> RepositoryResult<Vec<ParkingLogEntry>> {
        self.check_available("find_logs")?;
        let state = self.state.read();
        let mut logs: Vec<ParkingLogEntry> = state
            .logs
            .values()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        logs.sort_by(newest_first);
        Ok(logs)
    }

    async fn update_log(
        &self,
        id: LogId,
        patch: ParkingLogPatch,
    ) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.check_available("update_log")?;
        let mut state = self.state.write();

        let Some(current) = state.logs.get(&id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        patch.apply(&mut updated);

        let card_changed = updated.card_id != current.card_id;
        let event_changed = updated.event_type != current.event_type;
        if card_changed || event_changed {
            state.ensure_card_free(&updated, Some(id))?;
        }

        state.logs.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.check_available("delete_log")?;
        Ok(self.state.write().logs.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn plate(raw: &str) -> LicensePlate {
        LicensePlate::parse(raw).unwrap()
    }

    fn log(raw_plate: &str, event_type: EventType, at: DateTime<Utc>) -> NewParkingLog {
        NewParkingLog {
            license_plate: plate(raw_plate),
            event_type,
            timestamp: at,
            camera_id: Some("CAM01".to_string()),
            card_id: None,
            image_path: None,
            confidence: None,
            ocr_confidence: None,
        }
    }

    fn entry(raw_plate: &str, at: DateTime<Utc>) -> VehicleEntry {
        VehicleEntry {
            license_plate: plate(raw_plate),
            at,
            image_path: Some("/images/in.jpg".to_string()),
            log: log(raw_plate, EventType::Entry, at),
        }
    }

    fn exit(raw_plate: &str, at: DateTime<Utc>) -> VehicleExit {
        VehicleExit {
            license_plate: plate(raw_plate),
            at,
            image_path: Some("/images/out.jpg".to_string()),
            log: log(raw_plate, EventType::Exit, at),
        }
    }

    #[tokio::test]
    async fn test_entry_then_duplicate_entry() {
        let repo = LocalRepository::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let first = repo.record_entry(entry("30A-12345", t0)).await.unwrap();
        assert!(matches!(first, EntryOutcome::Recorded { .. }));

        let second = repo
            .record_entry(entry("30A-12345", t0 + Duration::minutes(5)))
            .await
            .unwrap();
        match second {
            EntryOutcome::AlreadyInside(v) => assert_eq!(v.entry_time, t0),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(repo.log_count(), 1);
    }

    #[tokio::test]
    async fn test_exit_without_entry_writes_nothing() {
        let repo = LocalRepository::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        let outcome = repo.record_exit(exit("30A-12345", t0)).await.unwrap();
        assert_eq!(outcome, ExitOutcome::NotInside);
        assert_eq!(repo.log_count(), 0);
        assert_eq!(repo.vehicle_count(), 0);
    }

    #[tokio::test]
    async fn test_reentry_reopens_record() {
        let repo = LocalRepository::new();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        repo.record_entry(entry("30A-12345", t0)).await.unwrap();
        repo.record_exit(exit("30A-12345", t0 + Duration::hours(1)))
            .await
            .unwrap();
        let again = repo
            .record_entry(entry("30A-12345", t0 + Duration::hours(2)))
            .await
            .unwrap();

        let EntryOutcome::Recorded { vehicle, .. } = again else {
            panic!("re-entry should be recorded");
        };
        assert!(vehicle.is_inside());
        assert!(vehicle.exit_time.is_none());
        assert!(vehicle.exit_image_path.is_none());
        assert!(vehicle.duration.is_none());
        assert_eq!(repo.vehicle_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_repository_fails() {
        let repo = LocalRepository::new();
        repo.set_unavailable(true);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.list_vehicles_inside().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
