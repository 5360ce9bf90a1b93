//! Repository traits for the two parking stores.
//!
//! The vehicle store and the parking-log store are separate traits so either can be
//! mocked on its own; [`FullRepository`] bundles them for the application state.

mod error;
mod logs;
mod vehicles;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use logs::ParkingLogRepository;
pub use vehicles::{EntryOutcome, ExitOutcome, VehicleEntry, VehicleExit, VehicleRepository};

/// Everything the application needs from a storage backend.
pub trait FullRepository: VehicleRepository + ParkingLogRepository {}

impl<T> FullRepository for T where T: VehicleRepository + ParkingLogRepository {}
