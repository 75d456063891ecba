use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::catalog::MediaCatalog;
use crate::assets::media::MediaBackend;
use crate::assets::text::FontSet;
use crate::composition::clip::{Clip, ClipKind};
use crate::composition::layer::Active;
use crate::composition::timeline::Timeline;
use crate::config::{DecodeConfig, DisplayConfig};
use crate::effects::blend::TransitionEngine;
use crate::effects::composite::over_in_place;
use crate::foundation::core::{AssetId, LayerId, Resolution};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::mul_div255_u8;
use crate::playback::events::{EngineEvent, EventBus};
use crate::render::decode::{DecodeControl, DecodeScheduler, FetchBudget};
use crate::render::frame::Frame;
use crate::render::raster::Rasterizer;

/// What a render reads besides the timeline.
#[derive(Clone, Copy)]
pub struct RenderInputs<'a> {
    pub catalog: &'a MediaCatalog,
    pub fonts: &'a FontSet,
    pub engine: &'a TransitionEngine,
}

/// Turns a timeline snapshot into display frames.
///
/// Layers are drawn bottom to top over the display background. Each layer resolves to at most
/// one clip, or to a pair of clips bridged by a transition, which are rasterized separately and
/// blended before the layer is composited.
pub struct Compositor {
    display: DisplayConfig,
    resolution: Resolution,
    raster: Rasterizer,
    decoder: DecodeScheduler,
    events: EventBus,
    // Last media frame each layer decoded, shown when a decode misses its budget.
    last_frames: HashMap<LayerId, Arc<Frame>>,
}

impl Compositor {
    pub fn new(
        display: DisplayConfig,
        backend: Arc<dyn MediaBackend>,
        decode: &DecodeConfig,
        events: EventBus,
    ) -> MontageResult<Self> {
        let resolution = display.resolution()?;
        Ok(Self {
            display,
            resolution,
            raster: Rasterizer::new(resolution)?,
            decoder: DecodeScheduler::new(backend, decode)?,
            events,
            last_frames: HashMap::new(),
        })
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Render `timeline` at `t`.
    ///
    /// All media decodes of the frame share one wait budget. Decode misses never fail the
    /// render: the layer falls back to its previous frame (or is skipped) and a
    /// [`EngineEvent::DecodeFailed`] is published. A seek or pause from another thread ends the
    /// wait early without an event.
    #[tracing::instrument(skip(self, timeline, inputs), fields(layers = timeline.layers().count()))]
    pub fn render_frame(
        &mut self,
        timeline: &Timeline,
        inputs: RenderInputs<'_>,
        t: f64,
    ) -> MontageResult<Frame> {
        let budget = self.decoder.budget();
        let mut out = Frame::solid(self.resolution, self.display.background);
        for layer in timeline.layers() {
            let Some(active) = layer.resolve_at(t) else {
                continue;
            };
            let buf = match active {
                Active::Clip(clip) => self.render_clip(layer.id(), clip, t, inputs, budget)?,
                Active::Transition {
                    transition,
                    from,
                    to,
                    ..
                } => {
                    let a = self.render_clip(layer.id(), from, t, inputs, budget)?;
                    let b = self.render_clip(layer.id(), to, t, inputs, budget)?;
                    if a.is_none() && b.is_none() {
                        None
                    } else {
                        let blank = Frame::transparent(self.resolution);
                        let a = a.unwrap_or_else(|| blank.clone());
                        let b = b.unwrap_or(blank);
                        Some(inputs.engine.evaluate(transition, from, to, t, &a, &b)?)
                    }
                }
            };
            if let Some(buf) = buf {
                over_in_place(&mut out.data, &buf.data, 1.0)?;
            }
        }
        Ok(out)
    }

    // Display-sized premultiplied buffer for one clip with its opacity applied.
    fn render_clip(
        &mut self,
        layer: LayerId,
        clip: &Clip,
        t: f64,
        inputs: RenderInputs<'_>,
        budget: FetchBudget,
    ) -> MontageResult<Option<Frame>> {
        let mut buf = match &clip.kind {
            ClipKind::Solid { color } => self.raster.solid(*color, &clip.style)?,
            ClipKind::Text { text } => self.raster.text(text, &clip.style, inputs.fonts)?,
            ClipKind::Media { asset } => {
                let Some(source) =
                    self.media_frame(layer, clip, *asset, t, inputs.catalog, budget)?
                else {
                    return Ok(None);
                };
                self.raster.media(&source, &clip.style)?
            }
        };
        apply_opacity(&mut buf, clip.style.opacity);
        Ok(Some(buf))
    }

    fn media_frame(
        &mut self,
        layer: LayerId,
        clip: &Clip,
        asset_id: AssetId,
        t: f64,
        catalog: &MediaCatalog,
        budget: FetchBudget,
    ) -> MontageResult<Option<Arc<Frame>>> {
        let asset = catalog.get(asset_id)?;
        let n = asset.frame_at(clip.local_time(t));
        match self.decoder.fetch(&asset, n, t, budget) {
            Ok(frame) => {
                if asset.frame_time(n + 1) < clip.trim_start() + clip.duration {
                    self.decoder
                        .prefetch(&asset, n + 1, t + asset.fps.frame_duration_secs());
                }
                self.last_frames.insert(layer, frame.clone());
                Ok(Some(frame))
            }
            Err(MontageError::DecodeUnavailable {
                asset,
                time: local_time,
                reason,
            }) => {
                let fallback = self.last_frames.get(&layer).cloned();
                if self.decoder.generation() != budget.generation {
                    tracing::debug!(%asset, t, "decode superseded");
                    return Ok(fallback);
                }
                tracing::warn!(
                    %asset,
                    t,
                    local_time,
                    %reason,
                    fallback = fallback.is_some(),
                    "decode unavailable"
                );
                self.events.emit(EngineEvent::DecodeFailed { asset, time: t });
                Ok(fallback)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop in-flight decodes and cached frames far from `t`.
    pub fn seek(&self, t: f64) {
        self.decoder.control().seek(t);
    }

    pub(crate) fn decode_control(&self) -> DecodeControl {
        self.decoder.control()
    }

    /// Forget decoded frames of a layer that no longer exists.
    pub fn forget_layer(&mut self, layer: LayerId) {
        self.last_frames.remove(&layer);
    }

    pub fn cached_frames(&self) -> usize {
        self.decoder.cached_frames()
    }
}

fn apply_opacity(frame: &mut Frame, opacity: f64) {
    if opacity >= 1.0 {
        return;
    }
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round()) as u16;
    for b in frame.data.iter_mut() {
        *b = mul_div255_u8(u16::from(*b), op);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
