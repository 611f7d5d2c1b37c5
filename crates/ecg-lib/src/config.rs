use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::record::DEFAULT_SAMPLE_RATE_HZ;

/// Overrides `model_path` when set.
pub const MODEL_PATH_ENV: &str = "ECG_VIEWER_MODEL";
const APP_DIR: &str = "ecg-viewer";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model_path: PathBuf,
    /// Used only to put the plot's x axis in seconds.
    pub sample_rate_hz: f64,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ecg_classifier.onnx"),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(text).context("parsing config")?;
        if !(cfg.sample_rate_hz.is_finite() && cfg.sample_rate_hz > 0.0) {
            anyhow::bail!("sample_rate_hz must be positive, got {}", cfg.sample_rate_hz);
        }
        Ok(cfg)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Explicit path (must exist), else the per-user config file if present,
    /// else defaults. The model path environment override is applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve(
            explicit,
            default_config_path(),
            std::env::var_os(MODEL_PATH_ENV),
        )
    }

    fn resolve(
        explicit: Option<&Path>,
        user_file: Option<PathBuf>,
        model_override: Option<OsString>,
    ) -> Result<Self> {
        let mut cfg = match explicit {
            Some(path) => Self::read(path)?,
            None => match user_file.filter(|p| p.is_file()) {
                Some(path) => {
                    debug!("using config {}", path.display());
                    Self::read(&path)?
                }
                None => Self::default(),
            },
        };
        if let Some(model) = model_override {
            debug!("{} overrides model path", MODEL_PATH_ENV);
            cfg.model_path = PathBuf::from(model);
        }
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config")
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
