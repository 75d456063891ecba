use serde::{Deserialize, Serialize};

use crate::assets::media::MediaAsset;
use crate::foundation::core::{AssetId, ClipId, Resolution, Rgba8, TimeRange};
use crate::foundation::error::{MontageError, MontageResult};

// Slack for float noise when comparing trim windows against probed durations.
const TIME_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// How a media frame is scaled into its clip box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    /// Scale uniformly until the frame fits inside the box (letterboxing).
    #[default]
    Contain,
    /// Scale uniformly until the frame covers the box (cropping).
    Cover,
    /// Scale each axis independently to the box.
    Stretch,
}

/// Center of a clip's box on the display.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Absolute display pixels.
    Pixels { x: f64, y: f64 },
    /// Fractions of the display size, `0.5, 0.5` being the center.
    Relative { x: f64, y: f64 },
}

impl Position {
    /// Display pixels for this position.
    pub fn to_pixels(self, display: Resolution) -> (f64, f64) {
        match self {
            Self::Pixels { x, y } => (x, y),
            Self::Relative { x, y } => (
                x * f64::from(display.width),
                y * f64::from(display.height),
            ),
        }
    }

    fn is_finite(self) -> bool {
        let (Self::Pixels { x, y } | Self::Relative { x, y }) = self;
        x.is_finite() && y.is_finite()
    }
}

/// Closed set of presentation parameters for a clip.
///
/// Text fields apply to text clips, `fit` to media clips; the rest apply to every kind. Unset
/// `position` centers the box on the display; unset `size` means the whole display for media
/// and solid clips and the shaped text extent for text clips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipStyle {
    pub font_size: f64,
    pub color: Rgba8,
    pub font_weight: FontWeight,
    pub background: Option<Rgba8>,
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corner_radii: [f64; 4],
    pub position: Option<Position>,
    pub size: Option<[f64; 2]>,
    pub word_wrap_width: Option<f64>,
    pub text_align: TextAlign,
    pub padding: f64,
    pub fit: Fit,
    pub opacity: f64,
}

impl Default for ClipStyle {
    fn default() -> Self {
        Self {
            font_size: 32.0,
            color: Rgba8::WHITE,
            font_weight: FontWeight::Normal,
            background: None,
            corner_radii: [0.0; 4],
            position: None,
            size: None,
            word_wrap_width: None,
            text_align: TextAlign::Left,
            padding: 0.0,
            fit: Fit::Contain,
            opacity: 1.0,
        }
    }
}

impl ClipStyle {
    pub fn validate(&self) -> MontageResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(MontageError::validation("style.font_size must be finite and > 0"));
        }
        if self.corner_radii.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(MontageError::validation(
                "style.corner_radii must be finite and >= 0",
            ));
        }
        if self.position.is_some_and(|p| !p.is_finite()) {
            return Err(MontageError::validation("style.position must be finite"));
        }
        if let Some([w, h]) = self.size
            && !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
        {
            return Err(MontageError::validation("style.size must be finite and > 0"));
        }
        if let Some(w) = self.word_wrap_width
            && (!w.is_finite() || w <= 0.0)
        {
            return Err(MontageError::validation(
                "style.word_wrap_width must be finite and > 0",
            ));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(MontageError::validation("style.padding must be finite and >= 0"));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(MontageError::validation("style.opacity must be in [0, 1]"));
        }
        Ok(())
    }
}

/// What a clip shows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    /// Frames of a registered asset.
    Media { asset: AssetId },
    /// Shaped text.
    Text { text: String },
    /// A filled (optionally rounded) box.
    Solid { color: Rgba8 },
}

/// In/out points into the source asset, in asset seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trim {
    #[serde(default)]
    pub start: f64,
    /// Out point; the asset end when unset.
    #[serde(default)]
    pub end: Option<f64>,
}

impl Trim {
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    fn validate(&self) -> MontageResult<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(MontageError::validation("trim.start must be finite and >= 0"));
        }
        if let Some(end) = self.end
            && (!end.is_finite() || end <= self.start)
        {
            return Err(MontageError::validation("trim.end must be finite and > trim.start"));
        }
        Ok(())
    }
}

/// A timed placement of content on a layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Clip {
    pub id: ClipId,
    pub kind: ClipKind,
    /// Timeline start in seconds.
    pub start: f64,
    /// Timeline duration in seconds.
    pub duration: f64,
    pub trim: Option<Trim>,
    pub style: ClipStyle,
}

impl Clip {
    /// Timeline end (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Half-open timeline range covered by the clip.
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end(),
        }
    }

    /// Referenced asset for media clips.
    pub fn asset(&self) -> Option<AssetId> {
        match self.kind {
            ClipKind::Media { asset } => Some(asset),
            _ => None,
        }
    }

    /// Trim in point (0 without a trim).
    pub fn trim_start(&self) -> f64 {
        self.trim.map_or(0.0, |t| t.start)
    }

    /// Source time shown at timeline time `t`, clamped into the clip's trim window.
    pub fn local_time(&self, t: f64) -> f64 {
        let offset = (t - self.start).clamp(0.0, self.duration);
        self.trim_start() + offset
    }

    /// Check timing, trim and style invariants that do not need the catalog.
    pub fn validate(&self) -> MontageResult<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(MontageError::validation(format!(
                "{}: start must be finite and >= 0",
                self.id
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(MontageError::validation(format!(
                "{}: duration must be finite and > 0",
                self.id
            )));
        }
        if let Some(trim) = &self.trim {
            trim.validate()?;
            if self.asset().is_none() {
                return Err(MontageError::validation(format!(
                    "{}: only media clips can be trimmed",
                    self.id
                )));
            }
            if let Some(end) = trim.end
                && trim.start + self.duration > end + TIME_EPS
            {
                return Err(MontageError::validation(format!(
                    "{}: duration runs past trim.end",
                    self.id
                )));
            }
        }
        self.style.validate()
    }

    /// Check that the trim window lies within `asset`'s duration.
    pub fn validate_against(&self, asset: &MediaAsset) -> MontageResult<()> {
        let window_end = self.trim_start() + self.duration;
        if window_end > asset.duration + TIME_EPS {
            return Err(MontageError::validation(format!(
                "{}: trim window [{}, {window_end}) exceeds {} duration {}",
                self.id,
                self.trim_start(),
                asset.id,
                asset.duration
            )));
        }
        Ok(())
    }
}

/// Request to place a clip; unset timing is filled in on insertion.
///
/// Without `start` the clip is appended after the layer's last clip. A media clip without
/// `duration` runs to its trim out point (or the end of the asset).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    pub kind: ClipKind,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub trim: Option<Trim>,
    #[serde(default)]
    pub style: ClipStyle,
}

impl ClipSpec {
    pub fn new(kind: ClipKind) -> Self {
        Self {
            kind,
            start: None,
            duration: None,
            trim: None,
            style: ClipStyle::default(),
        }
    }

    pub fn media(asset: AssetId) -> Self {
        Self::new(ClipKind::Media { asset })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ClipKind::Text { text: text.into() })
    }

    pub fn solid(color: Rgba8) -> Self {
        Self::new(ClipKind::Solid { color })
    }

    pub fn at(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn lasting(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn trimmed(mut self, trim: Trim) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn styled(mut self, style: ClipStyle) -> Self {
        self.style = style;
        self
    }

    /// Materialize the clip. `default_start` is used when `start` is unset; `asset` must be the
    /// referenced asset for media clips.
    pub(crate) fn build(
        self,
        id: ClipId,
        default_start: f64,
        asset: Option<&MediaAsset>,
    ) -> MontageResult<Clip> {
        let duration = match (self.duration, asset) {
            (Some(d), _) => d,
            (None, Some(asset)) => {
                let trim = self.trim.unwrap_or_default();
                trim.end.unwrap_or(asset.duration).min(asset.duration) - trim.start
            }
            (None, None) => {
                return Err(MontageError::validation(format!(
                    "{id}: duration is required for non-media clips"
                )));
            }
        };
        let clip = Clip {
            id,
            kind: self.kind,
            start: self.start.unwrap_or(default_start),
            duration,
            trim: self.trim,
            style: self.style,
        };
        clip.validate()?;
        if let Some(asset) = asset {
            clip.validate_against(asset)?;
        }
        Ok(clip)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/clip.rs"]
mod tests;
