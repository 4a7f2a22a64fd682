use std::path::PathBuf;

use clap::Parser;
use democonfig::{PacingMode, TARGET_FPS_RANGE};

#[derive(Parser, Debug)]
#[command(
    name = "demostuff",
    author,
    version,
    about = "Point-quad GLSL demo with a background soundtrack"
)]
pub struct Cli {
    /// TOML configuration file; `./demostuff.toml` is used when present.
    #[arg(long, value_name = "FILE", env = "DEMOSTUFF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the shader and music file names are resolved against.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Window size in screen coordinates (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Target frame rate; simulated time advances by `1 / FPS` per frame.
    #[arg(long, value_name = "FPS", value_parser = parse_fps)]
    pub fps: Option<f32>,

    /// Frame pacing policy (`fixed` or `catch-up`).
    #[arg(long, value_name = "MODE", value_parser = parse_pacing)]
    pub pacing: Option<PacingMode>,

    /// Music volume between 0.0 and 1.0.
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<f32>,

    /// Stop after this many frames (0 = run until the window closes).
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,

    /// Loop the soundtrack until the demo exits.
    #[arg(long, conflicts_with = "no_audio_loop")]
    pub loop_audio: bool,

    /// Play the soundtrack once.
    #[arg(long)]
    pub no_audio_loop: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Looping override requested on the command line, if any.
    pub fn audio_looping(&self) -> Option<bool> {
        match (self.loop_audio, self.no_audio_loop) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{trimmed}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame rate '{value}'"))?;
    if !TARGET_FPS_RANGE.contains(&fps) {
        return Err(format!(
            "frame rate must be within {}..={} (got {value})",
            TARGET_FPS_RANGE.start(),
            TARGET_FPS_RANGE.end()
        ));
    }
    Ok(fps)
}

pub fn parse_pacing(value: &str) -> Result<PacingMode, String> {
    if value.trim().is_empty() {
        return Err("pacing mode must not be empty".to_string());
    }
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_variants() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 640X480 ").unwrap(), (640, 480));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widexhigh").is_err());
    }

    #[test]
    fn rejects_out_of_range_fps() {
        assert_eq!(parse_fps("30").unwrap(), 30.0);
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("-5").is_err());
        assert!(parse_fps("inf").is_err());
        assert!(parse_fps("1e-30").is_err());
        assert!(parse_fps("20000").is_err());
        assert_eq!(parse_fps("0.01").unwrap(), 0.01);
    }

    #[test]
    fn parses_pacing_modes() {
        assert_eq!(parse_pacing("fixed").unwrap(), PacingMode::Fixed);
        assert_eq!(parse_pacing("Catch-Up").unwrap(), PacingMode::CatchUp);
        assert!(parse_pacing("").is_err());
        assert!(parse_pacing("sometimes").is_err());
    }

    #[test]
    fn loop_flags_map_to_override() {
        let cli = Cli::try_parse_from(["demostuff", "--loop-audio"]).unwrap();
        assert_eq!(cli.audio_looping(), Some(true));
        let cli = Cli::try_parse_from(["demostuff", "--no-audio-loop"]).unwrap();
        assert_eq!(cli.audio_looping(), Some(false));
        let cli = Cli::try_parse_from(["demostuff"]).unwrap();
        assert_eq!(cli.audio_looping(), None);
        assert!(Cli::try_parse_from(["demostuff", "--loop-audio", "--no-audio-loop"]).is_err());
    }
}
