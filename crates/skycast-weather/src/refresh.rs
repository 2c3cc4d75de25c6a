//! Periodic dashboard and detail refresh.
//!
//! Each loop runs on its own task and publishes to a `watch` channel. Once
//! its handle is stopped (or dropped) a loop never publishes again, even if
//! a fetch was already in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::service::WeatherService;
use crate::types::{LocationDetail, WeatherSnapshot};

/// What a dashboard should display
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Loading,
    Ready(Vec<WeatherSnapshot>),
    /// Every location failed
    NoData,
}

/// What a detail view should display
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Ready(Box<LocationDetail>),
    Failed,
}

/// Owns a running refresh loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct RefreshHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            token,
            task: Some(task),
        }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the loop and wait for its task to exit.
    pub async fn join(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Refresh task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Load the dashboard now, then every `period`, and again whenever the
/// location lists or the unit system change.
pub fn spawn_dashboard_refresh(
    service: Arc<WeatherService>,
    period: Duration,
) -> (RefreshHandle, watch::Receiver<DashboardState>) {
    let (tx, rx) = watch::channel(DashboardState::Loading);
    let token = CancellationToken::new();
    let stop = token.clone();

    let task = tokio::spawn(async move {
        let mut interval = ticker(period);
        let mut locations = service.locations().subscribe();
        let mut units = service.units().subscribe();

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = interval.tick() => {}
                changed = locations.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    tracing::debug!("Location lists changed; reloading dashboard");
                    interval.reset();
                }
                changed = units.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    tracing::debug!("Unit system changed; reloading dashboard");
                    interval.reset();
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                outcome = service.fetch_dashboard() => outcome,
            };

            if stop.is_cancelled() {
                break;
            }

            tracing::info!(
                "Dashboard refreshed: {} locations",
                outcome.snapshots.len()
            );
            let state = if outcome.all_failed {
                DashboardState::NoData
            } else {
                DashboardState::Ready(outcome.snapshots)
            };
            tx.send_replace(state);
        }

        tracing::debug!("Dashboard refresh stopped");
    });

    (RefreshHandle::new(token, task), rx)
}

/// Load one location's detail now, then every `period` and after unit
/// switches.
pub fn spawn_detail_refresh(
    service: Arc<WeatherService>,
    id: u64,
    period: Duration,
) -> (RefreshHandle, watch::Receiver<DetailState>) {
    let (tx, rx) = watch::channel(DetailState::Loading);
    let token = CancellationToken::new();
    let stop = token.clone();

    let task = tokio::spawn(async move {
        let mut interval = ticker(period);
        let mut units = service.units().subscribe();

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = interval.tick() => {}
                changed = units.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    interval.reset();
                }
            }

            let detail = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                detail = service.fetch_detail(id) => detail,
            };

            if stop.is_cancelled() {
                break;
            }

            tracing::info!("Detail refreshed for location {}", id);
            let state = match detail {
                Some(detail) => DetailState::Ready(Box::new(detail)),
                None => DetailState::Failed,
            };
            tx.send_replace(state);
        }

        tracing::debug!("Detail refresh for location {} stopped", id);
    });

    (RefreshHandle::new(token, task), rx)
}
