use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::state::{OverlaySnapshot, ScanSession, ScanStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Owns the periodic staleness sweep. Dropping the ticker cancels the task,
/// so the sweep can never outlive the session that started it.
pub struct SweepTicker {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl SweepTicker {
    pub fn spawn(
        state: Arc<Mutex<ScanSession>>,
        snapshots: Arc<watch::Sender<OverlaySnapshot>>,
        interval: Duration,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(
            state,
            snapshots,
            interval,
            cancel_token.clone(),
        ));

        Self {
            handle: Some(handle),
            cancel_token,
        }
    }

    /// Cancels the sweep and waits for the task to finish its current tick.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel_token.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.context("sweep task failed to join"),
            None => Ok(()),
        }
    }
}

impl Drop for SweepTicker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn sweep_loop(
    state: Arc<Mutex<ScanSession>>,
    snapshots: Arc<watch::Sender<OverlaySnapshot>>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("sweep loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let mut guard = state.lock().await;
                if guard.status() != ScanStatus::Scanning {
                    break;
                }

                let now = Instant::now().into_std();
                let removed = guard.sweep(now);
                if removed > 0 {
                    log_debug!(
                        "swept {} stale detection(s), {} still active",
                        removed,
                        guard.active_records().len()
                    );
                    snapshots.send_replace(guard.snapshot(now));
                }
            }
        }
    }
}
