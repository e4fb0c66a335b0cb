//! Fixed-interval combat driver
//!
//! A single task ticks the arena on a timer. Each tick runs every active
//! combat's round to completion before the next tick can start.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::arena::Arena;

/// Why the driver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStop {
    /// No combat left to run
    Idle,
    /// Shutdown was signalled
    Shutdown,
    /// The tick limit was reached
    RoundLimit,
}

/// Summary of a driver run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    pub ticks: u32,
    pub rounds: usize,
    pub resolved: usize,
    pub stop: DriverStop,
}

/// Tick the arena every `interval` until no combats remain, shutdown is
/// signalled, or `max_ticks` ticks have run
pub async fn run_driver(
    arena: &mut Arena,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    max_ticks: Option<u32>,
) -> DriverSummary {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut summary = DriverSummary {
        ticks: 0,
        rounds: 0,
        resolved: 0,
        stop: DriverStop::Idle,
    };

    info!(interval_ms = interval.as_millis() as u64, "combat driver started");
    loop {
        if *shutdown.borrow() {
            summary.stop = DriverStop::Shutdown;
            break;
        }
        if !arena.has_active_combats() {
            summary.stop = DriverStop::Idle;
            break;
        }
        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            summary.stop = DriverStop::RoundLimit;
            break;
        }

        tokio::select! {
            _ = timer.tick() => {
                let tick = arena.tick();
                summary.ticks += 1;
                summary.rounds += tick.rounds.len();
                summary.resolved += tick.resolutions.len();
                debug!(tick = summary.ticks, rounds = tick.rounds.len(), "driver tick");
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    summary.stop = DriverStop::Shutdown;
                    break;
                }
            }
        }
    }

    info!(
        ticks = summary.ticks,
        rounds = summary.rounds,
        resolved = summary.resolved,
        stop = ?summary.stop,
        "combat driver stopped"
    );
    summary
}
