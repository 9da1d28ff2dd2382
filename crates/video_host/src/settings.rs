use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frame_renderer::{IntervalPresentSync, NoPresentSync, PresentSync};
use visual_host::HostConfig;

/// Settings for the video host, stored as TOML in the user's config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Hosted element thread
    pub host: HostConfig,
    /// Presentation and demo stream
    pub video: VideoSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentSyncMode {
    #[default]
    None,
    Interval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub present_sync: PresentSyncMode,
    /// Refresh rate used by interval pacing
    pub refresh_hz: u32,
    /// Frames the demo producer streams before exiting
    pub demo_frames: u32,
    pub demo_width: u32,
    pub demo_height: u32,
    /// Frame index at which the demo doubles its resolution (past `demo_frames` = never)
    pub demo_resize_at: u32,
    /// Largest frame the renderer will allocate a region for
    pub max_frame_bytes: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: HostConfig::default(),
            video: VideoSettings::default(),
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            present_sync: PresentSyncMode::None,
            refresh_hz: 60,
            demo_frames: 120,
            demo_width: 640,
            demo_height: 480,
            demo_resize_at: 60,
            max_frame_bytes: 64 * 1024 * 1024,
        }
    }
}

impl VideoSettings {
    pub fn present_sync(&self) -> Arc<dyn PresentSync> {
        match self.present_sync {
            PresentSyncMode::None => Arc::new(NoPresentSync),
            PresentSyncMode::Interval => Arc::new(IntervalPresentSync::from_refresh_rate(self.refresh_hz)),
        }
    }
}

impl HostSettings {
    /// Load settings from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse settings in {}", path.display()))
    }

    /// Save settings to `path`, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {}", parent.display()))?;
        }
        let toml = toml::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, toml).with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Default config file path in the user's app data directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "FrameHost", "VideoHost")
            .map(|proj| proj.config_dir().join("video_host.toml"))
    }
}
