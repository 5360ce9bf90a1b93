//! # Parking Tracker
//!
//! Vehicle entry/exit tracking for a parking facility.
//!
//! Gate cameras report plate reads at the entrance and the exit. The crate
//! decides whether each event is accepted, keeps the current state of every
//! vehicle, appends an audit log of gate events and derives occupancy and
//! traffic statistics for a local calendar day.
//!
//! ## Architecture
//!
//! - [`models`]: Domain types (plates, vehicles, parking logs, day windows)
//! - [`db`]: Repository traits with in-memory and PostgreSQL backends
//! - [`services`]: Entry/exit decisions, statistics and log administration
//! - [`config`]: `parking.toml` plus environment overrides
//! - [`http`]: Axum REST API (feature `http-server`)
//! - [`dashboard`]: Polling dashboard client (feature `dashboard`)

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

#[cfg(feature = "dashboard")]
pub mod dashboard;
