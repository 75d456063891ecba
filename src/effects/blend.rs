use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::composition::clip::Clip;
use crate::composition::transition::{BlendKind, Transition};
use crate::effects::composite::{WipeParams, crossfade_into, dip_into, wipe_into};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::{premul_from_f32, unpremul_to_f32};
use crate::render::frame::{Frame, PixelFormat};

/// Inputs to a custom per-pixel blend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelSample {
    /// Straight-alpha RGBA in `[0, 1]` from the start clip.
    pub from: [f32; 4],
    /// Straight-alpha RGBA in `[0, 1]` from the end clip.
    pub to: [f32; 4],
    /// Pixel center in `[0, 1]`, origin top-left.
    pub uv: [f32; 2],
    /// Blend progress in `[0, 1]`.
    pub progress: f32,
}

/// Pure per-pixel blend returning straight-alpha RGBA in `[0, 1]`.
///
/// Called concurrently from several threads; it must not have side effects.
pub type BlendFn = Arc<dyn Fn(&PixelSample) -> [f32; 4] + Send + Sync>;

/// Named custom blends.
#[derive(Clone, Default)]
pub struct BlendRegistry {
    blends: HashMap<String, BlendFn>,
}

impl fmt::Debug for BlendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.blends.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("BlendRegistry").field("blends", &names).finish()
    }
}

impl BlendRegistry {
    /// Register (or replace) the blend called `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, blend: F)
    where
        F: Fn(&PixelSample) -> [f32; 4] + Send + Sync + 'static,
    {
        self.blends.insert(name.into(), Arc::new(blend));
    }

    pub fn get(&self, name: &str) -> Option<&BlendFn> {
        self.blends.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blends.contains_key(name)
    }
}

/// Where `t` falls relative to a transition window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionPhase {
    Before,
    Blending(f64),
    After,
}

/// Evaluates blends between the frames of two bridged clips.
#[derive(Clone, Debug, Default)]
pub struct TransitionEngine {
    registry: BlendRegistry,
}

impl TransitionEngine {
    pub fn new(registry: BlendRegistry) -> Self {
        Self { registry }
    }

    pub fn registry_mut(&mut self) -> &mut BlendRegistry {
        &mut self.registry
    }

    /// Reject custom blends that are not registered.
    pub fn check_blend(&self, kind: &BlendKind) -> MontageResult<()> {
        match kind {
            BlendKind::Custom(name) if !self.registry.contains(name) => Err(
                MontageError::validation(format!("unknown blend '{name}'")),
            ),
            _ => Ok(()),
        }
    }

    pub fn phase(transition: &Transition, from: &Clip, to: &Clip, t: f64) -> TransitionPhase {
        let window = transition.window(from, to);
        if t < window.start {
            TransitionPhase::Before
        } else if t > window.end {
            TransitionPhase::After
        } else {
            TransitionPhase::Blending(window.progress(t))
        }
    }

    /// Blend two premultiplied frames of equal size at progress `p`.
    pub fn blend(&self, kind: &BlendKind, from: &Frame, to: &Frame, p: f64) -> MontageResult<Frame> {
        if from.resolution() != to.resolution() {
            return Err(MontageError::validation(
                "blend expects frames of equal resolution",
            ));
        }
        let from = premul_packed(from);
        let to = premul_packed(to);
        let p = p.clamp(0.0, 1.0) as f32;
        let mut out = vec![0u8; from.data.len()];

        match kind {
            BlendKind::Crossfade => crossfade_into(&mut out, &from.data, &to.data, p)?,
            BlendKind::Wipe { dir, soft_edge } => wipe_into(
                &mut out,
                &from.data,
                &to.data,
                WipeParams {
                    width: from.width,
                    height: from.height,
                    t: p,
                    dir: *dir,
                    soft_edge: *soft_edge,
                },
            )?,
            BlendKind::DipToColor { color } => {
                dip_into(&mut out, &from.data, &to.data, color.to_premul(), p)?
            }
            BlendKind::Custom(name) => {
                let blend = self
                    .registry
                    .get(name)
                    .ok_or_else(|| MontageError::validation(format!("unknown blend '{name}'")))?;
                custom_into(&mut out, &from, &to, blend.as_ref(), p);
            }
        }
        Frame::new(from.width, from.height, PixelFormat::Rgba8Premul, out)
    }

    /// Output for `t`: the start frame before the window, the end frame after it, the blend
    /// inside it.
    pub fn evaluate(
        &self,
        transition: &Transition,
        from_clip: &Clip,
        to_clip: &Clip,
        t: f64,
        from: &Frame,
        to: &Frame,
    ) -> MontageResult<Frame> {
        match Self::phase(transition, from_clip, to_clip, t) {
            TransitionPhase::Before => Ok(from.clone()),
            TransitionPhase::After => Ok(to.clone()),
            TransitionPhase::Blending(p) => self.blend(&transition.blend, from, to, p),
        }
    }
}

fn premul_packed(frame: &Frame) -> std::borrow::Cow<'_, Frame> {
    if frame.is_packed() && frame.format == PixelFormat::Rgba8Premul {
        std::borrow::Cow::Borrowed(frame)
    } else {
        std::borrow::Cow::Owned(frame.clone().into_premultiplied())
    }
}

fn custom_into(
    out: &mut [u8],
    from: &Frame,
    to: &Frame,
    blend: &(dyn Fn(&PixelSample) -> [f32; 4] + Send + Sync),
    progress: f32,
) {
    let w = from.width as usize;
    let h = from.height as usize;
    let row = w * 4;
    out.par_chunks_exact_mut(row)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let v = (y as f32 + 0.5) / h as f32;
            for x in 0..w {
                let i = y * row + x * 4;
                let px = |d: &[u8]| [d[i], d[i + 1], d[i + 2], d[i + 3]];
                let sample = PixelSample {
                    from: unpremul_to_f32(px(&from.data)),
                    to: unpremul_to_f32(px(&to.data)),
                    uv: [(x as f32 + 0.5) / w as f32, v],
                    progress,
                };
                dst_row[x * 4..x * 4 + 4].copy_from_slice(&premul_from_f32(blend(&sample)));
            }
        });
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
