use serde::{Deserialize, Serialize};

use crate::composition::clip::Clip;
use crate::foundation::core::{ClipId, Rgba8, TransitionId};
use crate::foundation::error::{MontageError, MontageResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeDir {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

/// Per-pixel blend applied inside a transition window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendKind {
    /// Linear interpolation of corresponding pixels.
    #[default]
    Crossfade,
    /// Hard (or softened) edge sweeping across the frame.
    Wipe { dir: WipeDir, soft_edge: f32 },
    /// Fade to `color` during the first half, then fade in the end clip.
    DipToColor { color: Rgba8 },
    /// Callback registered under this name in the session's blend registry.
    Custom(String),
}

impl BlendKind {
    /// Parse a named preset with optional JSON params.
    ///
    /// Names that are not built in are returned as [`BlendKind::Custom`]; the session checks
    /// them against its registry when the transition is added.
    pub fn parse(name: &str, params: &serde_json::Value) -> MontageResult<Self> {
        let kind = name.trim().to_ascii_lowercase();
        if kind.is_empty() {
            return Err(MontageError::validation("blend name must be non-empty"));
        }
        let params = if params.is_null() {
            None
        } else {
            Some(
                params
                    .as_object()
                    .ok_or_else(|| MontageError::validation("blend params must be an object"))?,
            )
        };

        match kind.as_str() {
            "crossfade" | "cross_fade" | "fade" => Ok(Self::Crossfade),
            "wipe" => {
                let dir = match params.and_then(|p| p.get("dir")).and_then(|v| v.as_str()) {
                    None => WipeDir::LeftToRight,
                    Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                        "left_to_right" | "lefttoright" | "ltr" => WipeDir::LeftToRight,
                        "right_to_left" | "righttoleft" | "rtl" => WipeDir::RightToLeft,
                        "top_to_bottom" | "toptobottom" | "ttb" => WipeDir::TopToBottom,
                        "bottom_to_top" | "bottomtotop" | "btt" => WipeDir::BottomToTop,
                        other => {
                            return Err(MontageError::validation(format!(
                                "unknown wipe.dir '{other}'"
                            )));
                        }
                    },
                };
                let soft_edge = match params
                    .and_then(|p| p.get("soft_edge"))
                    .and_then(|v| v.as_f64())
                {
                    None => 0.0,
                    Some(v) => {
                        let f = v as f32;
                        if !f.is_finite() {
                            return Err(MontageError::validation(
                                "wipe.soft_edge must be finite when set",
                            ));
                        }
                        f.clamp(0.0, 1.0)
                    }
                };
                Ok(Self::Wipe { dir, soft_edge })
            }
            "dip_to_color" | "dip" => {
                let color = match params.and_then(|p| p.get("color")) {
                    None => Rgba8::BLACK,
                    Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
                        MontageError::validation(format!("invalid dip_to_color.color: {e}"))
                    })?,
                };
                Ok(Self::DipToColor { color })
            }
            _ => Ok(Self::Custom(name.trim().to_string())),
        }
    }
}

/// Request to bridge two clips of one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: ClipId,
    pub to: ClipId,
    pub in_duration: f64,
    pub out_duration: f64,
    #[serde(default)]
    pub blend: BlendKind,
}

impl TransitionSpec {
    /// Crossfade from `from` into `to`.
    pub fn new(from: ClipId, to: ClipId, in_duration: f64, out_duration: f64) -> Self {
        Self {
            from,
            to,
            in_duration,
            out_duration,
            blend: BlendKind::Crossfade,
        }
    }

    pub fn with_blend(mut self, blend: BlendKind) -> Self {
        self.blend = blend;
        self
    }
}

/// A blend between two time-adjacent clips.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transition {
    pub id: TransitionId,
    pub from: ClipId,
    pub to: ClipId,
    pub in_duration: f64,
    pub out_duration: f64,
    pub blend: BlendKind,
}

/// Closed interval `[start, end]` around the cut where the two clips are blended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionWindow {
    pub start: f64,
    pub cut: f64,
    pub end: f64,
}

impl TransitionWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Blend progress at `t`, clamped to `[0, 1]`. A zero-length window is a hard cut.
    pub fn progress(&self, t: f64) -> f64 {
        let len = self.end - self.start;
        if len <= 0.0 {
            return if t < self.cut { 0.0 } else { 1.0 };
        }
        ((t - self.start) / len).clamp(0.0, 1.0)
    }
}

impl Transition {
    pub(crate) fn from_spec(id: TransitionId, spec: TransitionSpec) -> MontageResult<Self> {
        for (name, v) in [("in_duration", spec.in_duration), ("out_duration", spec.out_duration)] {
            if !v.is_finite() || v < 0.0 {
                return Err(MontageError::validation(format!(
                    "transition {name} must be finite and >= 0"
                )));
            }
        }
        if spec.from == spec.to {
            return Err(MontageError::invalid_adjacency(format!(
                "{id}: a clip cannot transition into itself"
            )));
        }
        Ok(Self {
            id,
            from: spec.from,
            to: spec.to,
            in_duration: spec.in_duration,
            out_duration: spec.out_duration,
            blend: spec.blend,
        })
    }

    /// Combined blend length.
    pub fn span(&self) -> f64 {
        self.in_duration + self.out_duration
    }

    /// Cut time: midpoint between the end of `from` and the start of `to`.
    pub fn cut(&self, from: &Clip, to: &Clip) -> f64 {
        (from.end() + to.start) * 0.5
    }

    pub fn window(&self, from: &Clip, to: &Clip) -> TransitionWindow {
        let cut = self.cut(from, to);
        TransitionWindow {
            start: cut - self.in_duration,
            cut,
            end: cut + self.out_duration,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/transition.rs"]
mod tests;
