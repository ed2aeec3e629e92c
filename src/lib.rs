mod cli;
pub mod detection;
pub mod geometry;
pub mod host;
pub mod mapper;
pub mod overlay;
pub mod session;
pub mod settings;
mod utils;

use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use cli::{Cli, Commands, SimulateArgs};
use geometry::Size;
use host::{parse_script, replay, simulate, ReplayStats, ScriptLine, SimulatedScanner};
use overlay::{rasterize, write_png, OverlayFrame};
use session::{OverlaySnapshot, ScanController};
use settings::{ScannerSettings, SettingsStore};

pub use detection::{DetectionCache, DetectionRecord, IngestOutcome, ScanEvent};
pub use geometry::Rect;
pub use mapper::map_to_screen;

/// Sensor frame the simulated scanner reports in (landscape back camera).
const SIMULATED_SENSOR: Size = Size {
    width: 1920.0,
    height: 1080.0,
};

enum Workload {
    Replay {
        script: Vec<ScriptLine>,
        linger: Duration,
    },
    Simulate(SimulateArgs),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    stats: &'a ReplayStats,
    snapshot: &'a OverlaySnapshot,
    frame: &'a OverlayFrame,
}

pub fn run() -> Result<()> {
    // RUST_LOG wins when set; otherwise info, or debug for this crate when
    // geometry tracing is on.
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(log::LevelFilter::Info);
        logger.filter_module(
            module_path!(),
            crate_log_level(utils::logging::debug_mode_from_env()),
        );
    }
    logger.init();

    let cli = Cli::parse();

    let store = cli.settings.clone().map(SettingsStore::new).transpose()?;
    let settings = store
        .as_ref()
        .map(SettingsStore::scanner)
        .unwrap_or_default();
    settings.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(execute(cli, settings, store))
}

fn crate_log_level(debug_mode: bool) -> log::LevelFilter {
    if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

async fn execute(cli: Cli, settings: ScannerSettings, store: Option<SettingsStore>) -> Result<()> {
    let workload = match cli.command {
        Commands::Settings(args) => return show_settings(&settings, store.as_ref(), args.save),
        Commands::Replay(args) => Workload::Replay {
            script: load_script(&args.input)?,
            linger: Duration::from_millis(args.linger_ms),
        },
        Commands::Simulate(args) => Workload::Simulate(args),
    };

    let controller = ScanController::new(&settings);
    let follower = cli.follow.then(|| spawn_follower(controller.subscribe()));
    controller.start().await?;

    let stats = match workload {
        Workload::Replay { script, linger } => {
            log::info!("replaying {} script line(s)", script.len());
            let stats = replay(&controller, &script).await;
            if !linger.is_zero() {
                tokio::time::sleep(linger).await;
            }
            stats
        }
        Workload::Simulate(args) => {
            controller
                .set_camera_layout(Size::new(args.camera.0, args.camera.1))
                .await;
            let mut scanner =
                SimulatedScanner::new(args.seed, args.count, args.duration_ms, SIMULATED_SENSOR);
            simulate(
                &controller,
                &mut scanner,
                args.duration_ms,
                Duration::from_millis(args.frame_ms.max(1)),
            )
            .await
        }
    };

    let snapshot = controller.snapshot().await;
    let frame = OverlayFrame::from_snapshot(&snapshot, &settings.overlay);
    if let Some(path) = &cli.png {
        let img = rasterize(&frame, &settings.overlay)?;
        write_png(&img, path)?;
        log::info!("overlay written to {}", path.display());
    }

    let report = RunReport {
        stats: &stats,
        snapshot: &snapshot,
        frame: &frame,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    controller.stop().await?;
    drop(controller);
    if let Some(follower) = follower {
        follower.await.context("snapshot follower failed to join")?;
    }
    Ok(())
}

fn show_settings(
    settings: &ScannerSettings,
    store: Option<&SettingsStore>,
    save: bool,
) -> Result<()> {
    if save {
        let store = store.ok_or_else(|| anyhow!("--save needs --settings PATH"))?;
        store.update(settings.clone())?;
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn load_script(input: &str) -> Result<Vec<ScriptLine>> {
    if input == "-" {
        return parse_script(io::stdin().lock());
    }
    let path = PathBuf::from(input);
    let file =
        File::open(&path).with_context(|| format!("failed to open script {}", path.display()))?;
    parse_script(BufReader::new(file))
}

/// Prints every published snapshot until the controller goes away.
fn spawn_follower(mut rx: watch::Receiver<OverlaySnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let line = serde_json::to_string(&*rx.borrow_and_update());
            match line {
                Ok(line) => println!("{line}"),
                Err(err) => log::error!("failed to serialize snapshot: {err}"),
            }
        }
    })
}
