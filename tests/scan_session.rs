use std::time::Duration;

use matrixscan_lib::geometry::{Point, Rect, Size};
use matrixscan_lib::mapper::DEFAULT_SCREEN_RECT;
use matrixscan_lib::overlay::{rasterize, OverlayFrame, OverlayStyle};
use matrixscan_lib::session::{ScanController, ScanStatus};
use matrixscan_lib::settings::ScannerSettings;
use matrixscan_lib::{IngestOutcome, ScanEvent};

fn settings() -> ScannerSettings {
    ScannerSettings {
        screen: Size::new(1000.0, 2000.0),
        ..ScannerSettings::default()
    }
}

fn datamatrix(value: &str, rect: Rect) -> ScanEvent {
    let mut event = ScanEvent::new(value).with_bounds(rect);
    event.symbology = Some("datamatrix".into());
    event
}

#[tokio::test(start_paused = true)]
async fn screen_lifecycle_end_to_end() {
    let controller = ScanController::new(&settings());
    let mut rx = controller.subscribe();

    controller.start().await.unwrap();

    // First frame lands before the preview has been measured.
    let early = datamatrix("ABC", Rect::new(10.0, 20.0, 30.0, 40.0));
    assert_eq!(
        controller.ingest(&early).await,
        IngestOutcome::Inserted { first_ever: true }
    );
    assert_eq!(
        controller.active_records().await[0].screen_rect,
        DEFAULT_SCREEN_RECT
    );

    controller.set_camera_layout(Size::new(1000.0, 2000.0)).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        controller
            .ingest(&datamatrix("ABC", Rect::new(10.0, 20.0, 30.0, 40.0)))
            .await,
        IngestOutcome::Updated
    );

    let records = controller.active_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].screen_rect, Rect::new(1020.0, 10.0, 40.0, 30.0));
    assert_eq!(
        records[0].last_seen_at - records[0].first_seen_at,
        Duration::from_millis(500)
    );

    // A second code seen only through its corner points.
    let cornered = ScanEvent::new("DEF").with_corner_points(vec![
        Point::new(100.0, 200.0),
        Point::new(160.0, 200.0),
        Point::new(160.0, 250.0),
        Point::new(100.0, 250.0),
    ]);
    controller.ingest(&cornered).await;

    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.status, ScanStatus::Scanning);
    assert_eq!(snapshot.unique_count, 2);
    assert_eq!(snapshot.latest.as_deref(), Some("DEF"));
    let def = snapshot.latest_code().unwrap();
    assert_eq!(def.screen_rect, Rect::new(850.0, 100.0, 50.0, 60.0));

    let frame = OverlayFrame::from_snapshot(&snapshot, &OverlayStyle::default());
    assert_eq!(frame.boxes.len(), 2);
    assert_eq!(frame.counter.count, 2);
    assert_eq!(frame.info_lines[0], "Value: DEF");
    let img = rasterize(&frame, &OverlayStyle::default()).unwrap();
    assert_eq!(img.dimensions(), (1000, 2000));

    // Both codes leave the frame; the counter stays.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(controller.active_records().await.is_empty());
    assert_eq!(controller.unique_count().await, 2);

    // Coming back is a new active record but not a new unique code.
    assert_eq!(
        controller
            .ingest(&datamatrix("ABC", Rect::new(1.0, 2.0, 3.0, 4.0)))
            .await,
        IngestOutcome::Inserted { first_ever: false }
    );
    assert_eq!(controller.unique_count().await, 2);

    controller.stop().await.unwrap();
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status, ScanStatus::Idle);
    assert_eq!(snapshot.unique_count, 0);
    assert_eq!(snapshot.camera_layout, Size::default());
}

#[tokio::test(start_paused = true)]
async fn unique_count_matches_distinct_values() {
    let controller = ScanController::new(&settings());
    controller.start().await.unwrap();

    let values = ["A", "B", "A", "C", "A", "B", "D", "", "C"];
    for (step, value) in values.iter().enumerate() {
        controller
            .ingest(&ScanEvent::new(*value).with_bounds(Rect::new(0.0, 0.0, 10.0, 10.0)))
            .await;
        // Long gaps so some codes expire between repeats.
        tokio::time::sleep(Duration::from_millis(700 * step as u64)).await;
    }

    assert_eq!(controller.unique_count().await, 4);
    controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn custom_timeouts_from_settings() {
    let controller = ScanController::new(&ScannerSettings {
        stale_timeout_ms: 500,
        sweep_interval_ms: 50,
        ..settings()
    });
    controller.start().await.unwrap();
    controller.ingest(&ScanEvent::new("A")).await;

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(controller.active_records().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(51)).await;
    assert!(controller.active_records().await.is_empty());

    controller.stop().await.unwrap();
}
