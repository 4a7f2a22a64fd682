use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest GL version that offers geometry stages and program-addressed uniform uploads.
pub const MIN_GL_VERSION: (u8, u8) = (4, 1);

/// Accepted range for `timing.target_fps`.
pub const TARGET_FPS_RANGE: RangeInclusive<f32> = 0.01..=10_000.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Frame pacing policy applied after each frame's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Sleep `target - measured` every frame; overruns are never repaid.
    #[default]
    Fixed,
    /// Track scheduled vs. actual time and shorten later sleeps after an overrun.
    CatchUp,
}

impl fmt::Display for PacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacingMode::Fixed => f.write_str("fixed"),
            PacingMode::CatchUp => f.write_str("catch-up"),
        }
    }
}

impl FromStr for PacingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(PacingMode::Fixed),
            "catch-up" | "catchup" | "accumulate" => Ok(PacingMode::CatchUp),
            other => Err(format!(
                "unknown pacing mode '{other}'; expected fixed or catch-up"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
    /// Requested OpenGL core profile version as `[major, minor]`.
    pub gl_version: (u8, u8),
    pub exit_on_escape: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            title: "OpenGL DemoStuff".to_string(),
            resizable: true,
            vsync: false,
            gl_version: (4, 5),
            exit_on_escape: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub target_fps: f32,
    pub pacing: PacingMode,
    /// Stop after this many frames; `0` runs until the window closes.
    pub max_frames: u64,
    /// Emit the per-frame time line at info level instead of trace.
    pub log_frames: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            pacing: PacingMode::Fixed,
            max_frames: 0,
            log_frames: true,
        }
    }
}

impl TimingConfig {
    /// Fixed simulation step and pacing target, `1 / target_fps`.
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.target_fps
    }

    /// Wall-clock budget per frame. Rates outside [`TARGET_FPS_RANGE`] are
    /// rejected by validation; an unrepresentable budget here means no pacing.
    pub fn frame_budget(&self) -> Duration {
        Duration::try_from_secs_f32(self.frame_delta()).unwrap_or(Duration::ZERO)
    }

    pub fn frame_limit(&self) -> Option<u64> {
        (self.max_frames > 0).then_some(self.max_frames)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    pub data_dir: PathBuf,
    pub geometry_shader: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub music: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            geometry_shader: PathBuf::from("g.fs_quad.glsl"),
            vertex_shader: PathBuf::from("v.fs_quad.glsl"),
            fragment_shader: PathBuf::from("f.demo.glsl"),
            music: PathBuf::from("demo.ogg"),
        }
    }
}

impl AssetConfig {
    /// Resolves an asset name against `data_dir`; absolute names are kept as-is.
    pub fn resolve(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.data_dir.join(name)
        }
    }

    pub fn geometry_path(&self) -> PathBuf {
        self.resolve(&self.geometry_shader)
    }

    pub fn vertex_path(&self) -> PathBuf {
        self.resolve(&self.vertex_shader)
    }

    pub fn fragment_path(&self) -> PathBuf {
        self.resolve(&self.fragment_shader)
    }

    pub fn music_path(&self) -> PathBuf {
        self.resolve(&self.music)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Linear gain in `[0, 1]`.
    pub volume: f32,
    pub looping: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        // 32 out of the mixer's 128 steps.
        Self {
            volume: 0.25,
            looping: false,
        }
    }
}

/// Complete demo configuration; every section falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub timing: TimingConfig,
    pub assets: AssetConfig,
    pub audio: AudioConfig,
}

impl DemoConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: DemoConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be greater than zero (got {}x{})",
                window.width, window.height
            )));
        }

        let (major, minor) = window.gl_version;
        if major != 4 || (major, minor) < MIN_GL_VERSION {
            return Err(ConfigError::Invalid(format!(
                "window.gl_version {major}.{minor} is unsupported; expected 4.1 through 4.6"
            )));
        }

        let fps = self.timing.target_fps;
        if !TARGET_FPS_RANGE.contains(&fps) {
            return Err(ConfigError::Invalid(format!(
                "timing.target_fps must be within {}..={} (got {fps})",
                TARGET_FPS_RANGE.start(),
                TARGET_FPS_RANGE.end()
            )));
        }

        let volume = self.audio.volume;
        if !(0.0..=1.0).contains(&volume) {
            return Err(ConfigError::Invalid(format!(
                "audio.volume must be within 0.0..=1.0 (got {volume})"
            )));
        }

        let assets = [
            ("assets.geometry_shader", &self.assets.geometry_shader),
            ("assets.vertex_shader", &self.assets.vertex_shader),
            ("assets.fragment_shader", &self.assets.fragment_shader),
            ("assets.music", &self.assets.music),
        ];
        for (field, value) in assets {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[window]
width = 1280
height = 720
title = "Party Demo"
gl_version = [4, 3]

[timing]
target_fps = 30
pacing = "catch-up"
max_frames = 120

[assets]
data_dir = "/opt/demo"
fragment_shader = "f.tunnel.glsl"
music = "/tmp/other.ogg"

[audio]
volume = 0.5
looping = true
"#;

    #[test]
    fn empty_config_matches_compiled_defaults() {
        let config = DemoConfig::from_toml_str("").expect("parse empty config");
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.window.width, 512);
        assert_eq!(config.window.height, 512);
        assert_eq!(config.window.gl_version, (4, 5));
        assert_eq!(config.timing.pacing, PacingMode::Fixed);
        assert_eq!(config.timing.frame_limit(), None);
        assert!((config.timing.frame_delta() - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(
            config.assets.geometry_path(),
            PathBuf::from("./data/g.fs_quad.glsl")
        );
        assert_eq!(config.assets.music_path(), PathBuf::from("./data/demo.ogg"));
    }

    #[test]
    fn parses_sample_config() {
        let config = DemoConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!((config.window.width, config.window.height), (1280, 720));
        assert_eq!(config.window.title, "Party Demo");
        assert!(config.window.resizable);
        assert_eq!(config.timing.pacing, PacingMode::CatchUp);
        assert_eq!(config.timing.frame_limit(), Some(120));
        assert_eq!(
            config.assets.fragment_path(),
            PathBuf::from("/opt/demo/f.tunnel.glsl")
        );
        assert_eq!(config.assets.vertex_path(), PathBuf::from("/opt/demo/v.fs_quad.glsl"));
        assert_eq!(config.assets.music_path(), PathBuf::from("/tmp/other.ogg"));
        assert!(config.audio.looping);
    }

    #[test]
    fn rejects_zero_sized_window() {
        let err = DemoConfig::from_toml_str("[window]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_gl_versions_without_program_uniforms() {
        let err = DemoConfig::from_toml_str("[window]\ngl_version = [3, 3]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = DemoConfig::from_toml_str("[window]\ngl_version = [4, 0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_non_positive_fps_and_loud_volume() {
        let err = DemoConfig::from_toml_str("[timing]\ntarget_fps = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = DemoConfig::from_toml_str("[audio]\nvolume = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_frame_rates_without_a_representable_budget() {
        for fps in ["1e-30", "0.001", "1e9"] {
            let input = format!("[timing]\ntarget_fps = {fps}\n");
            let err = DemoConfig::from_toml_str(&input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted {fps}");
        }
        let config = DemoConfig::from_toml_str("[timing]\ntarget_fps = 0.5\n").unwrap();
        assert_eq!(config.timing.frame_budget(), Duration::from_secs(2));
    }

    #[test]
    fn frame_budget_never_panics_on_unvalidated_rates() {
        let timing = TimingConfig {
            target_fps: 1e-30,
            ..TimingConfig::default()
        };
        assert_eq!(timing.frame_budget(), Duration::ZERO);
    }

    #[test]
    fn rejects_unknown_pacing_mode() {
        let err = DemoConfig::from_toml_str("[timing]\npacing = \"turbo\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = DemoConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = DemoConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn pacing_mode_from_str_accepts_aliases() {
        assert_eq!("fixed".parse::<PacingMode>().unwrap(), PacingMode::Fixed);
        assert_eq!("Catch-Up".parse::<PacingMode>().unwrap(), PacingMode::CatchUp);
        assert_eq!("accumulate".parse::<PacingMode>().unwrap(), PacingMode::CatchUp);
        assert!("".parse::<PacingMode>().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DemoConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
