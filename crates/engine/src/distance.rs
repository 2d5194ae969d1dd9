//! Debounced, batched distance calculation.
//!
//! Centralizes observer-to-target distance computation so UI elements do
//! not each run their own timer. Calculations within the debounce window
//! are coalesced into the next tick; a tick computes every pending target
//! concurrently, with no ordering guarantee among them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use geo::{HaversineDistance, Point};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info};
use uuid::Uuid;

use domain::models::Coordinate;

use crate::config::DistanceConfig;

/// Invoked with each completed distance result. Results may arrive out of
/// submission order; the callback is responsible for marshaling back onto
/// the owning context.
pub type DistanceCallback = Arc<dyn Fn(DistanceUpdate) + Send + Sync>;

/// One completed observer-to-target distance.
#[derive(Debug, Clone, Copy)]
pub struct DistanceUpdate {
    pub target_id: Uuid,
    pub meters: f64,
}

struct TargetEntry {
    target: Coordinate,
    observer: Option<Coordinate>,
    on_update: DistanceCallback,
}

#[derive(Default)]
struct State {
    targets: HashMap<Uuid, TargetEntry>,
    pending: HashSet<Uuid>,
    /// Last observer position seen by any calculation request.
    observer: Option<Coordinate>,
    last_calculation: Option<Instant>,
}

/// Debounced distance scheduler with a periodic batch ticker.
pub struct DistanceScheduler {
    state: Arc<Mutex<State>>,
    shutdown_tx: watch::Sender<bool>,
    ticker: JoinHandle<()>,
    debounce: Duration,
}

impl DistanceScheduler {
    /// Starts the scheduler and its ticker task.
    pub fn new(config: DistanceConfig) -> Self {
        let debounce = Duration::from_millis(config.debounce_ms);
        let state: Arc<Mutex<State>> = Arc::default();

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let ticker_state = Arc::clone(&state);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(debounce);
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        run_batch(&ticker_state).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Distance scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            state,
            shutdown_tx,
            ticker,
            debounce,
        }
    }

    /// Registers a target and triggers one immediate calculation if the
    /// observer position is already known.
    pub fn start_monitoring(
        &self,
        target_id: Uuid,
        coordinate: Coordinate,
        on_update: DistanceCallback,
    ) {
        let observer = {
            let mut state = lock(&self.state);
            let observer = state.observer;
            state.targets.insert(
                target_id,
                TargetEntry {
                    target: coordinate,
                    observer,
                    on_update,
                },
            );
            observer
        };
        if observer.is_some() {
            spawn_calculation(Arc::clone(&self.state), target_id);
        }
    }

    /// Deregisters a target, dropping any calculation still pending for it.
    pub fn stop_monitoring(&self, target_id: Uuid) {
        let mut state = lock(&self.state);
        state.targets.remove(&target_id);
        state.pending.remove(&target_id);
    }

    /// Requests a distance calculation for a target.
    ///
    /// Computes immediately (off the owning context) when the target is
    /// newly registered or the debounce interval has elapsed since the last
    /// global calculation. Otherwise the coordinates are stored and the
    /// target joins the pending set for the next tick.
    pub fn request_calculation(
        &self,
        target_id: Uuid,
        observer: Coordinate,
        target: Coordinate,
        on_update: DistanceCallback,
    ) {
        let compute_now = {
            let mut state = lock(&self.state);
            state.observer = Some(observer);

            let newly_registered = !state.targets.contains_key(&target_id);
            state.targets.insert(
                target_id,
                TargetEntry {
                    target,
                    observer: Some(observer),
                    on_update,
                },
            );

            let debounce_elapsed = state
                .last_calculation
                .map(|at| at.elapsed() >= self.debounce)
                .unwrap_or(true);

            if newly_registered || debounce_elapsed {
                state.last_calculation = Some(Instant::now());
                true
            } else {
                state.pending.insert(target_id);
                false
            }
        };

        if compute_now {
            spawn_calculation(Arc::clone(&self.state), target_id);
        }
    }

    /// Number of targets waiting for the next tick.
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Stops the ticker. Pending targets are dropped.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for DistanceScheduler {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        self.ticker.abort();
    }
}

fn lock(state: &Arc<Mutex<State>>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Haversine great-circle distance in meters.
fn distance_meters(observer: Coordinate, target: Coordinate) -> f64 {
    let a = Point::new(observer.longitude, observer.latitude);
    let b = Point::new(target.longitude, target.latitude);
    a.haversine_distance(&b)
}

/// Computes one target off the owning context and applies the callback.
/// A target deregistered mid-flight has its stale result dropped silently.
fn spawn_calculation(state: Arc<Mutex<State>>, target_id: Uuid) -> JoinHandle<()> {
    tokio::spawn(compute_one(state, target_id))
}

async fn compute_one(state: Arc<Mutex<State>>, target_id: Uuid) {
    let pair = {
        let state = lock(&state);
        state
            .targets
            .get(&target_id)
            .and_then(|entry| entry.observer.map(|observer| (observer, entry.target)))
    };
    let Some((observer, target)) = pair else {
        return;
    };

    let meters = distance_meters(observer, target);

    let callback = {
        let state = lock(&state);
        state
            .targets
            .get(&target_id)
            .map(|entry| Arc::clone(&entry.on_update))
    };
    if let Some(on_update) = callback {
        debug!(target_id = %target_id, meters, "Distance updated");
        on_update(DistanceUpdate { target_id, meters });
    }
}

/// Drains the pending set and computes every pending target concurrently,
/// recording the new last-calculation time once the whole batch completes.
async fn run_batch(state: &Arc<Mutex<State>>) {
    let pending: Vec<Uuid> = {
        let mut guard = lock(state);
        guard.pending.drain().collect()
    };
    if pending.is_empty() {
        return;
    }

    let mut tasks = JoinSet::new();
    for target_id in pending {
        tasks.spawn(compute_one(Arc::clone(state), target_id));
    }
    while tasks.join_next().await.is_some() {}

    lock(state).last_calculation = Some(Instant::now());
}
