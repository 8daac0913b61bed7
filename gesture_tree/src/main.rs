//! gesture_tree: interactive entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gesture_tree::app::{run, AppConfig};
use ornament_core::ScatterPolicy;

#[derive(Parser, Debug)]
#[command(name = "gesture_tree")]
#[command(about = "Hand-gesture driven ornament tree")]
struct Args {
    /// Small tree for slow machines (150 decorations)
    #[arg(long)]
    quick: bool,

    /// Number of decoration particles
    #[arg(long)]
    decorations: Option<usize>,

    /// Seed for layout, scatter and focus picks
    #[arg(long)]
    seed: Option<u64>,

    /// Directory of photos to hang on the tree
    #[arg(long)]
    photos: Option<PathBuf>,

    /// Keep decoration scatter targets when photos are added
    #[arg(long)]
    stable_scatter: bool,

    /// Milliseconds between hand detection cycles
    #[arg(long, default_value = "33")]
    detect_ms: u64,

    /// MediaPipe helper script (prints READY, then one JSON frame per line)
    #[cfg(feature = "mediapipe")]
    #[arg(long)]
    mediapipe: Option<PathBuf>,

    /// Python interpreter for the helper script
    #[cfg(feature = "mediapipe")]
    #[arg(long, default_value = "python3")]
    python: String,
}

impl Args {
    fn into_config(self) -> AppConfig {
        let mut cfg = AppConfig::default();

        if self.quick {
            cfg.choreo.decorations = 150;
        }
        if let Some(n) = self.decorations {
            cfg.choreo.decorations = n;
        }
        if let Some(seed) = self.seed {
            cfg.choreo.seed = seed;
        }
        if self.stable_scatter {
            cfg.choreo.scatter = ScatterPolicy::Stable;
        }
        cfg.photos_dir = self.photos;
        cfg.detection_interval = std::time::Duration::from_millis(self.detect_ms);

        #[cfg(feature = "mediapipe")]
        {
            cfg.mediapipe_script = self.mediapipe;
            cfg.python = self.python;
        }
        cfg
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    #[cfg(feature = "mediapipe")]
    if args.mediapipe.is_some() {
        log::info!("mode: MediaPipe hand tracking");
    } else {
        log::info!("mode: keyboard simulation (pass --mediapipe <SCRIPT> for a camera)");
    }
    #[cfg(not(feature = "mediapipe"))]
    log::info!("mode: keyboard simulation (build with --features mediapipe for a camera)");

    let cfg = args.into_config();
    log::info!(
        "{} decorations, seed {:#x}, {:?} scatter",
        cfg.choreo.decorations, cfg.choreo.seed, cfg.choreo.scatter
    );

    run(cfg)?;
    Ok(())
}
