use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use democonfig::DemoConfig;
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Configuration file picked up from the working directory when no other is named.
pub const DEFAULT_CONFIG_FILE: &str = "demostuff.toml";

pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    if cli.print_config {
        let rendered = config
            .to_toml_string()
            .context("failed to render configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    tracing::info!(
        width = config.window.width,
        height = config.window.height,
        data_dir = %config.assets.data_dir.display(),
        "starting demo"
    );
    let summary = Renderer::new(config).run()?;
    tracing::info!(
        frames = summary.frames,
        simulated_seconds = summary.simulated_seconds,
        wall_clock_ms = summary.wall_clock.as_millis() as u64,
        average_fps = summary.average_fps(),
        "demo finished"
    );
    Ok(())
}

/// Loads the configuration file (if any), applies command-line overrides and
/// validates the result.
pub fn resolve_config(cli: &Cli) -> Result<DemoConfig> {
    let mut config = match config_path(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE)) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            DemoConfig::load(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => DemoConfig::default(),
    };
    apply_overrides(&mut config, cli);
    config
        .validate()
        .context("configuration rejected after applying command-line overrides")?;
    Ok(config)
}

fn config_path(explicit: Option<&Path>, fallback: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => fallback.is_file().then(|| fallback.to_path_buf()),
    }
}

fn apply_overrides(config: &mut DemoConfig, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.assets.data_dir = dir.clone();
    }
    if let Some((width, height)) = cli.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(fps) = cli.fps {
        config.timing.target_fps = fps;
    }
    if let Some(pacing) = cli.pacing {
        config.timing.pacing = pacing;
    }
    if let Some(volume) = cli.volume {
        config.audio.volume = volume;
    }
    if let Some(max_frames) = cli.max_frames {
        config.timing.max_frames = max_frames;
    }
    if let Some(looping) = cli.audio_looping() {
        config.audio.looping = looping;
    }
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
