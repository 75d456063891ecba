//! Session configuration.
//!
//! Every field has a default, so an empty JSON object is a valid configuration. A handful of
//! `MONTAGE_*` environment variables override the decoded values; see
//! [`SessionConfig::apply_env_overrides`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Fps, Resolution, Rgba8};
use crate::foundation::error::{MontageError, MontageResult};
use crate::playback::controller::EndBehavior;

/// Output surface size and the color shown where no layer draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub background: Rgba8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            background: Rgba8::BLACK,
        }
    }
}

impl DisplayConfig {
    pub fn new(width: u32, height: u32, background: Rgba8) -> Self {
        Self {
            width,
            height,
            background,
        }
    }

    pub fn resolution(&self) -> MontageResult<Resolution> {
        Resolution::new(self.width, self.height)
    }

    fn validate(&self) -> MontageResult<()> {
        self.resolution()
            .map_err(|e| MontageError::config(format!("display: {e}")))?;
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(MontageError::config(format!(
                "display {}x{} exceeds {} pixels per side",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// What happens when playback reaches the end of the timeline.
    pub end_behavior: EndBehavior,
    /// Presentation rate of the playback thread.
    pub frame_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            end_behavior: EndBehavior::default(),
            frame_rate: 30.0,
        }
    }
}

impl PlaybackConfig {
    fn validate(&self) -> MontageResult<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(MontageError::config(
                "playback.frame_rate must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Decode worker pool and frame cache tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Worker threads; `None` lets rayon pick.
    pub workers: Option<usize>,
    /// Decoded frames kept in the LRU cache.
    pub cache_capacity: usize,
    /// On seek, cached frames requested farther than this from the new time are dropped.
    pub cache_window_secs: f64,
    /// Longest a render waits for one decode before falling back.
    pub wait_budget_ms: u64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            workers: None,
            cache_capacity: 64,
            cache_window_secs: 2.0,
            wait_budget_ms: 250,
        }
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> MontageResult<()> {
        if self.workers == Some(0) {
            return Err(MontageError::config("decode.workers must be >= 1 when set"));
        }
        if self.cache_capacity == 0 {
            return Err(MontageError::config("decode.cache_capacity must be >= 1"));
        }
        if !self.cache_window_secs.is_finite() || self.cache_window_secs < 0.0 {
            return Err(MontageError::config(
                "decode.cache_window_secs must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// How still images are presented as media.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub still_duration: f64,
    pub still_fps: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            still_duration: 5.0,
            still_fps: 30.0,
        }
    }
}

impl MediaConfig {
    pub fn fps(&self) -> MontageResult<Fps> {
        Fps::from_f64(self.still_fps).map_err(|e| MontageError::config(format!("media.still_fps: {e}")))
    }

    fn validate(&self) -> MontageResult<()> {
        if !self.still_duration.is_finite() || self.still_duration <= 0.0 {
            return Err(MontageError::config(
                "media.still_duration must be finite and > 0",
            ));
        }
        self.fps().map(|_| ())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub display: DisplayConfig,
    pub playback: PlaybackConfig,
    pub decode: DecodeConfig,
    pub media: MediaConfig,
}

impl SessionConfig {
    pub fn from_json_str(s: &str) -> MontageResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| MontageError::config(format!("invalid session config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> MontageResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MontageError::config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> MontageResult<()> {
        self.display.validate()?;
        self.playback.validate()?;
        self.decode.validate()?;
        self.media.validate()
    }

    /// Apply overrides from the process environment.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `MONTAGE_DECODE_WORKERS` | `decode.workers` |
    /// | `MONTAGE_DECODE_CACHE_CAPACITY` | `decode.cache_capacity` |
    /// | `MONTAGE_DECODE_WAIT_BUDGET_MS` | `decode.wait_budget_ms` |
    /// | `MONTAGE_END_BEHAVIOR` | `playback.end_behavior` |
    pub fn apply_env_overrides(&mut self) -> MontageResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> MontageResult<()> {
        if let Some(v) = lookup("MONTAGE_DECODE_WORKERS") {
            self.decode.workers = Some(parse_env("MONTAGE_DECODE_WORKERS", &v)?);
        }
        if let Some(v) = lookup("MONTAGE_DECODE_CACHE_CAPACITY") {
            self.decode.cache_capacity = parse_env("MONTAGE_DECODE_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("MONTAGE_DECODE_WAIT_BUDGET_MS") {
            self.decode.wait_budget_ms = parse_env("MONTAGE_DECODE_WAIT_BUDGET_MS", &v)?;
        }
        if let Some(v) = lookup("MONTAGE_END_BEHAVIOR") {
            self.playback.end_behavior = EndBehavior::parse(&v).ok_or_else(|| {
                MontageError::config(format!("MONTAGE_END_BEHAVIOR: unknown value '{v}'"))
            })?;
        }
        self.validate()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> MontageResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MontageError::config(format!("{key}: cannot parse '{value}'")))
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
