use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "matrixscan",
    version,
    about = "Drive the data-matrix scanning overlay from recorded or simulated detections"
)]
pub struct Cli {
    /// Scanner settings JSON; written by `settings --save`.
    #[arg(long, global = true, env = "MATRIXSCAN_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Write the final overlay frame as a PNG.
    #[arg(long, global = true)]
    pub png: Option<PathBuf>,

    /// Print every published snapshot as a JSON line.
    #[arg(long, global = true)]
    pub follow: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay JSON-lines scanner callbacks from a file, or `-` for stdin.
    Replay(ReplayArgs),
    /// Run a synthetic scanner for a fixed duration.
    Simulate(SimulateArgs),
    /// Print the effective settings.
    Settings(SettingsArgs),
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    pub input: String,

    /// Keep the session open this long after the last line so stale codes
    /// can expire.
    #[arg(long, default_value_t = 0)]
    pub linger_ms: u64,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 5)]
    pub count: usize,

    #[arg(long, default_value_t = 5000)]
    pub duration_ms: u64,

    #[arg(long, default_value_t = 33)]
    pub frame_ms: u64,

    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Preview size reported by the simulated layout pass, as WIDTHxHEIGHT.
    #[arg(long, default_value = "390x844", value_parser = parse_size)]
    pub camera: (f64, f64),
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Persist the effective settings to `--settings`.
    #[arg(long)]
    pub save: bool,
}

fn parse_size(value: &str) -> Result<(f64, f64), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("bad width '{w}'"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("bad height '{h}'"))?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_flags() {
        let cli = Cli::parse_from([
            "matrixscan",
            "--follow",
            "simulate",
            "--count",
            "3",
            "--camera",
            "1080x2340",
        ]);
        assert!(cli.follow);
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.count, 3);
        assert_eq!(args.camera, (1080.0, 2340.0));
        assert_eq!(args.frame_ms, 33);
    }

    #[test]
    fn settings_help_names_the_save_command() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        let help = cmd
            .get_arguments()
            .find(|arg| arg.get_id() == "settings")
            .and_then(|arg| arg.get_help())
            .map(|help| help.to_string())
            .unwrap();
        assert!(help.contains("settings --save"));

        let cli = Cli::parse_from(["matrixscan", "settings", "--save"]);
        let Commands::Settings(args) = cli.command else {
            panic!("expected settings");
        };
        assert!(args.save);
    }

    #[test]
    fn rejects_bad_size() {
        assert!(parse_size("1080").is_err());
        assert!(parse_size("axb").is_err());
    }
}
