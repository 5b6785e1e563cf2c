use crate::render::orientation::OrientationSettings;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "EMBLEM_STUDIO_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Emblem Studio".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Longest frame delta handed to animations; `null` disables the clamp.
    pub max_delta_ms: Option<u64>,
    pub target_fps: Option<f32>,
    /// Frames the stand-in renderer waits before an emblem's model is ready.
    pub model_load_frames: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_delta_ms: Some(100),
            target_fps: Some(60.0),
            model_load_frames: 30,
        }
    }
}

impl FrameConfig {
    pub fn max_delta(&self) -> Option<Duration> {
        self.max_delta_ms.map(Duration::from_millis)
    }

    pub fn target_frame_duration(&self) -> Option<Duration> {
        self.target_fps
            .filter(|fps| *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: usize,
    pub cell_size: f32,
    pub panel_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            cell_size: 280.0,
            panel_width: 300.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub frame: FrameConfig,
    pub orientation: OrientationSettings,
    pub layout: LayoutConfig,
    /// Emblem catalog to mount instead of the built-in emblems.
    pub catalog: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First CLI argument, then `EMBLEM_STUDIO_CONFIG`, then defaults.
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        let path = std::env::args_os()
            .nth(1)
            .or_else(|| std::env::var_os(CONFIG_ENV))
            .map(PathBuf::from);
        match path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
