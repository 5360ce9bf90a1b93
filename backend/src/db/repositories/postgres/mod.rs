//! Postgres repository implementation using Diesel.
//!
//! Implements both parking stores against the `vehicles` and `parking_logs` tables
//! created by the embedded migrations.
//!
//! Connections come from an r2d2 pool; migrations run once when the pool is
//! built. Blocking diesel calls run on `spawn_blocking` and are retried with
//! exponential backoff while the failure is a connection error.
//!
//! ## Concurrency
//!
//! Entry and exit are conditional writes executed in one transaction together with
//! the log append. Entry relies on `INSERT .. ON CONFLICT DO NOTHING` followed by an
//! `UPDATE .. WHERE status = 'out'`; exit locks the `in` row with `FOR UPDATE`.
//! Card checks serialize on `pg_advisory_xact_lock(hashtext(card_id))`.
//!
//! Settings come from [`crate::db::RepositoryConfig`], which owns the `[postgres]`
//! file section and the `PG_*` environment overrides.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    EntryOutcome, ErrorContext, ExitOutcome, ParkingLogRepository, RepositoryError,
    RepositoryResult, VehicleEntry, VehicleExit, VehicleRepository,
};
use crate::models::{
    EventType, LicensePlate, LogFilter, LogId, LogPage, NewParkingLog, PageInfo, Pagination,
    ParkingLogEntry, ParkingLogPatch, Vehicle, VehicleStatus,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Pool and retry settings, built by [`crate::db::RepositoryConfig::to_postgres_config`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::store_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// The closure is re-run from scratch on each attempt, so it must own its inputs.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::store("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::store_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn insert_log(conn: &mut PgConnection, log: &NewParkingLog) -> RepositoryResult<ParkingLogEntry> {
    let row: ParkingLogRow = diesel::insert_into(parking_logs::table)
        .values(ParkingLogWriteRow::from(log))
        .returning(ParkingLogRow::as_returning())
        .get_result(conn)
        .map_err(map_diesel_error)?;
    row.try_into()
}

/// Reject an entry log whose card is still held by another vehicle.
///
/// Takes a transaction-scoped advisory lock on the card so concurrent writers for
/// the same card are serialized until commit.
fn ensure_card_free(
    conn: &mut PgConnection,
    event_type: EventType,
    card_id: Option<&str>,
    exclude: Option<LogId>,
) -> RepositoryResult<()> {
    if event_type != EventType::Entry {
        return Ok(());
    }
    let Some(card_id) = card_id else {
        return Ok(());
    };

    sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind::<Text, _>(card_id)
        .execute(conn)
        .map_err(map_diesel_error)?;

    let mut query = parking_logs::table
        .filter(parking_logs::card_id.eq(card_id))
        .into_boxed::<Pg>();
    if let Some(exclude) = exclude {
        query = query.filter(parking_logs::log_id.ne(exclude.value()));
    }
    let latest: Option<ParkingLogRow> = query
        .order((parking_logs::recorded_at.desc(), parking_logs::log_id.desc()))
        .select(ParkingLogRow::as_select())
        .first(conn)
        .optional()
        .map_err(map_diesel_error)?;

    match latest {
        Some(holder) if holder.event_type == EventType::Entry.as_str() => {
            Err(RepositoryError::conflict_with_context(
                format!("Card {} already in use", card_id),
                ErrorContext::new("check_card")
                    .with_entity("card")
                    .with_entity_id(card_id)
                    .with_details(format!(
                        "registered for vehicle {} at {}",
                        holder.license_plate,
                        holder.recorded_at.to_rfc3339()
                    )),
            ))
        }
        _ => Ok(()),
    }
}

fn filtered_logs(filter: &LogFilter) -> parking_logs::BoxedQuery<'static, Pg> {
    let mut query = parking_logs::table.into_boxed::<Pg>();
    if let Some(plate) = &filter.license_plate {
        query = query.filter(parking_logs::license_plate.eq(plate.as_str().to_string()));
    }
    if let Some(card_id) = &filter.card_id {
        query = query.filter(parking_logs::card_id.eq(card_id.clone()));
    }
    if let Some(camera_id) = &filter.camera_id {
        query = query.filter(parking_logs::camera_id.eq(camera_id.clone()));
    }
    if let Some(event_type) = filter.event_type {
        query = query.filter(parking_logs::event_type.eq(event_type.as_str()));
    }
    if let Some(start) = filter.start {
        query = query.filter(parking_logs::recorded_at.ge(start));
    }
    if let Some(end) = filter.end {
        query = query.filter(parking_logs::recorded_at.le(end));
    }
    query
}

fn rows_to_vehicles(rows: Vec<VehicleRow>) -> RepositoryResult<Vec<Vehicle>> {
    rows.into_iter().map(Vehicle::try_from).collect()
}

fn rows_to_logs(rows: Vec<ParkingLogRow>) -> RepositoryResult<Vec<ParkingLogEntry>> {
    rows.into_iter().map(ParkingLogEntry::try_from).collect()
}

#[async_trait]
impl VehicleRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn record_entry(&self, entry: VehicleEntry) -> RepositoryResult<EntryOutcome> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let fresh = Vehicle::entered(
                    entry.license_plate.clone(),
                    entry.at,
                    entry.image_path.clone(),
                );
                let row = VehicleEntryRow::from_vehicle(&fresh);

                let inserted: Option<VehicleRow> = diesel::insert_into(vehicles::table)
                    .values(&row)
                    .on_conflict(vehicles::license_plate)
                    .do_nothing()
                    .returning(VehicleRow::as_returning())
                    .get_result(tx)
                    .optional()
                    .map_err(map_diesel_error)?;

                let recorded = match inserted {
                    Some(row) => Some(row),
                    None => diesel::update(
                        vehicles::table
                            .filter(vehicles::license_plate.eq(entry.license_plate.as_str()))
                            .filter(vehicles::status.eq(VehicleStatus::Out.as_str())),
                    )
                    .set(&row)
                    .returning(VehicleRow::as_returning())
                    .get_result(tx)
                    .optional()
                    .map_err(map_diesel_error)?,
                };

                let Some(recorded) = recorded else {
                    let existing: VehicleRow = vehicles::table
                        .find(entry.license_plate.as_str())
                        .select(VehicleRow::as_select())
                        .first(tx)
                        .map_err(map_diesel_error)?;
                    return Ok(EntryOutcome::AlreadyInside(existing.try_into()?));
                };

                let log = insert_log(tx, &entry.log)?;
                Ok(EntryOutcome::Recorded {
                    vehicle: recorded.try_into()?,
                    log,
                })
            })
        })
        .await
    }

    async fn record_exit(&self, exit: VehicleExit) -> RepositoryResult<ExitOutcome> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current: Option<VehicleRow> = vehicles::table
                    .filter(vehicles::license_plate.eq(exit.license_plate.as_str()))
                    .filter(vehicles::status.eq(VehicleStatus::In.as_str()))
                    .select(VehicleRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()
                    .map_err(map_diesel_error)?;

                let Some(current) = current else {
                    return Ok(ExitOutcome::NotInside);
                };

                let mut vehicle: Vehicle = current.try_into()?;
                let duration_minutes = vehicle.mark_exited(exit.at, exit.image_path.clone());

                let changes = VehicleExitChangeset {
                    exit_time: exit.at,
                    status: VehicleStatus::Out.as_str().to_string(),
                    exit_image_path: vehicle.exit_image_path.clone(),
                    duration_minutes,
                    updated_at: vehicle.updated_at,
                };
                diesel::update(vehicles::table.find(exit.license_plate.as_str()))
                    .set(&changes)
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                let log = insert_log(tx, &exit.log)?;
                Ok(ExitOutcome::Recorded {
                    vehicle,
                    duration_minutes,
                    log,
                })
            })
        })
        .await
    }

    async fn find_vehicle(&self, plate: &LicensePlate) -> RepositoryResult<Option<Vehicle>> {
        let plate = plate.as_str().to_string();
        self.with_conn(move |conn| {
            vehicles::table
                .find(&plate)
                .select(VehicleRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Vehicle::try_from)
                .transpose()
        })
        .await
    }

    async fn list_vehicles_inside(&self) -> RepositoryResult<Vec<Vehicle>> {
        self.with_conn(|conn| {
            let rows = vehicles::table
                .filter(vehicles::status.eq(VehicleStatus::In.as_str()))
                .order((vehicles::entry_time.desc(), vehicles::license_plate.asc()))
                .select(VehicleRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows_to_vehicles(rows)
        })
        .await
    }

    async fn list_vehicles_entered_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Vehicle>> {
        self.with_conn(move |conn| {
            let rows = vehicles::table
                .filter(vehicles::entry_time.between(start, end))
                .order((vehicles::entry_time.desc(), vehicles::license_plate.asc()))
                .select(VehicleRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows_to_vehicles(rows)
        })
        .await
    }

    async fn count_vehicles_inside(&self) -> RepositoryResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = vehicles::table
                .filter(vehicles::status.eq(VehicleStatus::In.as_str()))
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

#[async_trait]
impl ParkingLogRepository for PostgresRepository {
    async fn create_log(&self, log: NewParkingLog) -> RepositoryResult<ParkingLogEntry> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                ensure_card_free(tx, log.event_type, log.card_id.as_deref(), None)?;
                insert_log(tx, &log)
            })
        })
        .await
    }

    async fn get_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.with_conn(move |conn| {
            parking_logs::table
                .find(id.value())
                .select(ParkingLogRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(ParkingLogEntry::try_from)
                .transpose()
        })
        .await
    }

    async fn list_logs(&self, filter: &LogFilter, page: Pagination) -> RepositoryResult<LogPage> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let total: i64 = filtered_logs(&filter)
                .count()
                .get_result(conn)
                .map_err(map_diesel_error)?;

            let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
            let rows = filtered_logs(&filter)
                .order((parking_logs::recorded_at.desc(), parking_logs::log_id.desc()))
                .offset(offset)
                .limit(i64::from(page.limit))
                .select(ParkingLogRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            Ok(LogPage {
                logs: rows_to_logs(rows)?,
                pagination: PageInfo::new(page, total.max(0) as u64),
            })
        })
        .await
    }

    async fn find_logs(&self, filter: &LogFilter) -> RepositoryResult<Vec<ParkingLogEntry>> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let rows = filtered_logs(&filter)
                .order((parking_logs::recorded_at.desc(), parking_logs::log_id.desc()))
                .select(ParkingLogRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;
            rows_to_logs(rows)
        })
        .await
    }

    async fn update_log(
        &self,
        id: LogId,
        patch: ParkingLogPatch,
    ) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current: Option<ParkingLogRow> = parking_logs::table
                    .find(id.value())
                    .select(ParkingLogRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()
                    .map_err(map_diesel_error)?;
                let Some(current) = current else {
                    return Ok(None);
                };

                let current: ParkingLogEntry = current.try_into()?;
                let mut updated = current.clone();
                patch.apply(&mut updated);

                if updated.card_id != current.card_id || updated.event_type != current.event_type {
                    ensure_card_free(tx, updated.event_type, updated.card_id.as_deref(), Some(id))?;
                }

                let row: ParkingLogRow = diesel::update(parking_logs::table.find(id.value()))
                    .set(ParkingLogWriteRow::from(&updated))
                    .returning(ParkingLogRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                Ok(Some(row.try_into()?))
            })
        })
        .await
    }

    async fn delete_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>> {
        self.with_conn(move |conn| {
            diesel::delete(parking_logs::table.find(id.value()))
                .returning(ParkingLogRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(ParkingLogEntry::try_from)
                .transpose()
        })
        .await
    }
}
