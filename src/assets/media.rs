use crate::foundation::core::{AssetId, Fps, Resolution};
use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::Frame;

/// Metadata a [`MediaBackend`] reports for a locator.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaProbe {
    /// Natural width/height of decoded frames.
    pub resolution: Resolution,
    /// Source duration in seconds.
    pub duration: f64,
    /// Source frame rate.
    pub fps: Fps,
}

impl MediaProbe {
    /// Validate probed values before they enter the catalog.
    pub fn validate(&self) -> MontageResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(MontageError::validation("probed resolution must be non-zero"));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(MontageError::validation(
                "probed duration must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// A registered, immutable media source.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MediaAsset {
    /// Catalog identity.
    pub id: AssetId,
    /// Opaque locator resolved by the decode back end.
    pub locator: String,
    /// Last path segment of the locator.
    pub filename: String,
    /// Natural resolution.
    pub resolution: Resolution,
    /// Duration in seconds.
    pub duration: f64,
    /// Frame rate.
    pub fps: Fps,
}

impl MediaAsset {
    pub(crate) fn from_probe(id: AssetId, locator: &str, probe: MediaProbe) -> Self {
        Self {
            id,
            locator: locator.to_string(),
            filename: filename_of(locator),
            resolution: probe.resolution,
            duration: probe.duration,
            fps: probe.fps,
        }
    }

    /// Frame number containing local time `t`, clamped to the last frame.
    pub fn frame_at(&self, t: f64) -> u64 {
        let last = self
            .fps
            .secs_to_frames_floor(self.duration)
            .saturating_sub(1);
        self.fps.secs_to_frames_floor(t.max(0.0)).min(last)
    }

    /// Start time of frame `n`.
    pub fn frame_time(&self, n: u64) -> f64 {
        self.fps.frames_to_secs(n)
    }
}

/// Media-decoding back end.
///
/// The engine never opens files or sockets itself; locators are opaque strings resolved here.
/// Implementations must be callable from several decode workers at once.
pub trait MediaBackend: Send + Sync {
    /// Read enough of `locator` to report its natural resolution, duration and frame rate.
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe>;

    /// Decode the frame shown at `local_time` seconds into the asset.
    ///
    /// Failures should be reported as [`MontageError::DecodeUnavailable`].
    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame>;
}

/// Last `/`-separated segment of a locator with any query or fragment removed.
pub fn filename_of(locator: &str) -> String {
    let trimmed = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator)
        .trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
