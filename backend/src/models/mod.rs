//! Domain types shared by the stores, the tracking service and the HTTP layer.

pub mod parking_log;
pub mod time;
pub mod vehicle;

pub use parking_log::*;
pub use time::*;
pub use vehicle::*;
