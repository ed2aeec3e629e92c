use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    time::Instant,
};
use uuid::Uuid;

use crate::detection::{DetectionRecord, IgnoreReason, IngestOutcome, ScanEvent};
use crate::geometry::Size;
use crate::settings::ScannerSettings;
use crate::utils::logging::debug_mode_from_env;

use super::state::{OverlaySnapshot, ScanSession, ScanStatus};
use super::sweep::SweepTicker;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Single owner of the scan session. The detection callback, the layout
/// callback and the sweep task all go through the same lock, so no two
/// mutations of the cache ever interleave.
#[derive(Clone)]
pub struct ScanController {
    state: Arc<Mutex<ScanSession>>,
    sweeper: Arc<Mutex<Option<SweepTicker>>>,
    snapshots: Arc<watch::Sender<OverlaySnapshot>>,
    sweep_interval: Duration,
}

impl ScanController {
    pub fn new(settings: &ScannerSettings) -> Self {
        let session = ScanSession::new(settings).with_geometry_trace(debug_mode_from_env());
        let (snapshots, _) = watch::channel(OverlaySnapshot::default());

        Self {
            state: Arc::new(Mutex::new(session)),
            sweeper: Arc::new(Mutex::new(None)),
            snapshots: Arc::new(snapshots),
            sweep_interval: settings.sweep_interval(),
        }
    }

    /// Receiver the rendering layer re-reads on every refresh.
    pub fn subscribe(&self) -> watch::Receiver<OverlaySnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn start(&self) -> Result<String> {
        let session_id = {
            let mut state = self.state.lock().await;
            if state.status() == ScanStatus::Scanning {
                bail!("scan session already active");
            }
            let session_id = Uuid::new_v4().to_string();
            state.begin(session_id.clone(), Utc::now());
            self.publish(&state);
            session_id
        };

        self.spawn_sweeper().await;
        log_info!("scan session {} started", session_id);
        Ok(session_id)
    }

    /// Stops the sweep, then drops every detection and the layout. Safe to
    /// call when nothing is running.
    pub async fn stop(&self) -> Result<()> {
        // The ticker must be gone before the state is torn down.
        self.cancel_sweeper().await?;

        let mut state = self.state.lock().await;
        if state.status() == ScanStatus::Idle {
            return Ok(());
        }

        let session_id = state.session_id().unwrap_or_default().to_string();
        let unique = state.unique_count();
        state.end();
        self.publish(&state);
        log_info!(
            "scan session {} stopped after {} unique code(s)",
            session_id,
            unique
        );
        Ok(())
    }

    /// Detection callback from the platform scanner.
    pub async fn ingest(&self, event: &ScanEvent) -> IngestOutcome {
        let mut state = self.state.lock().await;
        if state.status() != ScanStatus::Scanning {
            log_debug!("detection arrived while idle; dropping");
            return IngestOutcome::Ignored(IgnoreReason::SessionInactive);
        }

        let now = Instant::now().into_std();
        let outcome = state.ingest_event(event, now);
        if let IngestOutcome::Inserted { first_ever: true } = outcome {
            log_info!(
                "new code {:?} ({} unique)",
                event.data.as_deref().unwrap_or_default(),
                state.unique_count()
            );
        }
        if !matches!(outcome, IngestOutcome::Ignored(_)) {
            self.snapshots.send_replace(state.snapshot(now));
        }
        outcome
    }

    /// Layout callback for the camera preview.
    pub async fn set_camera_layout(&self, layout: Size) {
        let mut state = self.state.lock().await;
        state.set_camera_layout(layout);
        log_debug!("camera layout {}x{}", layout.width, layout.height);
        self.publish(&state);
    }

    pub async fn snapshot(&self) -> OverlaySnapshot {
        let state = self.state.lock().await;
        state.snapshot(Instant::now().into_std())
    }

    pub async fn active_records(&self) -> Vec<DetectionRecord> {
        self.state.lock().await.active_records().to_vec()
    }

    pub async fn unique_count(&self) -> usize {
        self.state.lock().await.unique_count()
    }

    pub async fn status(&self) -> ScanStatus {
        self.state.lock().await.status()
    }

    async fn spawn_sweeper(&self) {
        let mut sweeper = self.sweeper.lock().await;
        *sweeper = Some(SweepTicker::spawn(
            self.state.clone(),
            self.snapshots.clone(),
            self.sweep_interval,
        ));
    }

    async fn cancel_sweeper(&self) -> Result<()> {
        let ticker = self.sweeper.lock().await.take();
        match ticker {
            Some(ticker) => ticker.shutdown().await,
            None => Ok(()),
        }
    }

    fn publish(&self, state: &ScanSession) {
        self.snapshots
            .send_replace(state.snapshot(Instant::now().into_std()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn settings() -> ScannerSettings {
        ScannerSettings {
            screen: Size::new(1000.0, 2000.0),
            ..ScannerSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn record_expires_after_timeout_plus_sweep() {
        let controller = ScanController::new(&settings());
        controller.start().await.unwrap();
        controller.ingest(&ScanEvent::new("ABC")).await;

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(controller.active_records().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert!(controller.active_records().await.is_empty());
        assert_eq!(controller.unique_count().await, 1);

        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_tracking_keeps_code_alive() {
        let controller = ScanController::new(&settings());
        controller.start().await.unwrap();
        controller
            .set_camera_layout(Size::new(1000.0, 2000.0))
            .await;

        for step in 0..10u32 {
            let shift = f64::from(step);
            let event = ScanEvent::new("ABC").with_bounds(Rect::new(10.0 + shift, 20.0, 30.0, 40.0));
            controller.ingest(&event).await;
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let records = controller.active_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hits, 10);
        assert_eq!(records[0].screen_rect, Rect::new(1020.0, 19.0, 40.0, 30.0));

        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ingest_while_idle_is_ignored() {
        let controller = ScanController::new(&settings());
        assert_eq!(
            controller.ingest(&ScanEvent::new("ABC")).await,
            IngestOutcome::Ignored(IgnoreReason::SessionInactive)
        );

        controller.start().await.unwrap();
        controller.ingest(&ScanEvent::new("ABC")).await;
        controller.stop().await.unwrap();

        assert_eq!(controller.status().await, ScanStatus::Idle);
        assert_eq!(controller.unique_count().await, 0);
        assert_eq!(
            controller.ingest(&ScanEvent::new("ABC")).await,
            IngestOutcome::Ignored(IgnoreReason::SessionInactive)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_rejected() {
        let controller = ScanController::new(&settings());
        controller.start().await.unwrap();
        assert!(controller.start().await.is_err());
        controller.stop().await.unwrap();
        controller.stop().await.unwrap();
        assert!(controller.start().await.is_ok());
        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_ingest_and_sweep() {
        let controller = ScanController::new(&settings());
        let mut rx = controller.subscribe();
        controller.start().await.unwrap();

        controller.ingest(&ScanEvent::new("ABC")).await;
        assert!(rx.has_changed().unwrap());
        {
            let snapshot = rx.borrow_and_update();
            assert_eq!(snapshot.unique_count, 1);
            assert_eq!(snapshot.codes.len(), 1);
        }

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.codes.is_empty());
        assert_eq!(snapshot.unique_count, 1);

        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_sweep() {
        let controller = ScanController::new(&settings());
        let rx = controller.subscribe();
        controller.start().await.unwrap();
        controller.ingest(&ScanEvent::new("ABC")).await;
        controller.stop().await.unwrap();

        let version_after_stop = rx.borrow().clone();
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(*rx.borrow(), version_after_stop);
        assert_eq!(rx.borrow().status, ScanStatus::Idle);
    }
}
