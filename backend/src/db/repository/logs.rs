//! Parking event log store.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    LogFilter, LogId, LogPage, NewParkingLog, Pagination, ParkingLogEntry, ParkingLogPatch,
};

/// Repository trait for the append-only parking log.
///
/// Besides the normal append performed by vehicle entry/exit, the log supports
/// administrative create/update/delete. Writes that carry a `card_id` enforce card
/// uniqueness: a card is in use while its most recent log is an entry, and an
/// entry log for a card in use is rejected with [`RepositoryError::Conflict`].
///
/// [`RepositoryError::Conflict`]: super::RepositoryError::Conflict
#[async_trait]
pub trait ParkingLogRepository: Send + Sync {
    /// Append an administrative log entry.
    async fn create_log(&self, log: NewParkingLog) -> RepositoryResult<ParkingLogEntry>;

    async fn get_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>>;

    /// Filtered, paginated listing, most recent first.
    async fn list_logs(&self, filter: &LogFilter, page: Pagination) -> RepositoryResult<LogPage>;

    /// Every log matching `filter`, most recent first, without pagination.
    async fn find_logs(&self, filter: &LogFilter) -> RepositoryResult<Vec<ParkingLogEntry>>;

    /// Apply an administrative correction. Returns `None` when `id` does not exist.
    async fn update_log(
        &self,
        id: LogId,
        patch: ParkingLogPatch,
    ) -> RepositoryResult<Option<ParkingLogEntry>>;

    /// Hard-delete a log. Returns the removed entry, or `None` when `id` does not exist.
    async fn delete_log(&self, id: LogId) -> RepositoryResult<Option<ParkingLogEntry>>;
}
