//! Storage for vehicle occupancy records and the parking event log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers / dashboard                              │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Services (crate::services)                             │
//! │  - entry/exit validation and logging                    │
//! │  - statistics and admin log management                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/)                        │
//! └───────────┬───────────────────────────────┬─────────────┘
//!             │                               │
//!   ┌─────────▼─────────┐           ┌─────────▼─────────┐
//!   │ LocalRepository   │           │ PostgresRepository│
//!   │ (in-memory)       │           │ (diesel, feature) │
//!   └───────────────────┘           └───────────────────┘
//! ```
//!
//! The repository handle is built once at startup with [`RepositoryFactory`] and
//! passed explicitly to the services; there is no process-wide singleton.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{PostgresSettings, RepositoryConfig, RepositorySettings};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    EntryOutcome, ErrorContext, ExitOutcome, FullRepository, ParkingLogRepository,
    RepositoryError, RepositoryResult, VehicleEntry, VehicleExit, VehicleRepository,
};
