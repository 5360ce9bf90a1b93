//! Polling dashboard.
//!
//! Periodically fetches the vehicles currently inside and today's history
//! from a running API server and renders a [`DashboardView`]. A failed poll
//! is logged and the previous view is kept, so a restart of the server only
//! makes the dashboard go stale for a few cycles.

pub mod client;
pub mod view;

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use client::{resolve_image_url, DashboardClient, InsideSnapshot, TodaySnapshot};
pub use view::{DashboardView, RECENT_ENTRIES};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid API origin '{0}': expected an http:// or https:// URL")]
    InvalidOrigin(String),
}

pub struct Dashboard {
    client: DashboardClient,
    interval: Duration,
    view: Option<DashboardView>,
}

impl Dashboard {
    pub fn new(client: DashboardClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            view: None,
        }
    }

    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    /// Fetch both snapshots and rebuild the view.
    ///
    /// On failure the previous view stays in place and the error is returned.
    pub async fn refresh(&mut self) -> Result<&DashboardView, DashboardError> {
        let (inside, today) =
            tokio::try_join!(self.client.fetch_inside(), self.client.fetch_today())?;
        let view = DashboardView::from_snapshots(self.client.origin(), inside, today, Utc::now());
        debug!(
            inside = view.inside.len(),
            today = view.today.len(),
            "Dashboard refreshed"
        );
        Ok(self.view.insert(view))
    }

    /// Poll until `shutdown` flips to `true`, calling `on_view` after every successful refresh.
    ///
    /// The first poll happens immediately.
    pub async fn run<F>(&mut self, mut shutdown: watch::Receiver<bool>, mut on_view: F)
    where
        F: FnMut(&DashboardView),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh().await {
                        Ok(view) => on_view(view),
                        Err(e) => warn!(error = %e, "Dashboard poll failed; keeping previous view"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
