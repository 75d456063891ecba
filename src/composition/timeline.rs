use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::assets::catalog::MediaCatalog;
use crate::composition::clip::{Clip, ClipKind, ClipSpec};
use crate::composition::layer::Layer;
use crate::composition::transition::{Transition, TransitionSpec};
use crate::foundation::core::{ClipId, IdGen, LayerId, TransitionId};
use crate::foundation::error::{MontageError, MontageResult};

/// Playhead position shared by every snapshot of one timeline.
#[derive(Clone, Debug, Default)]
pub(crate) struct Clock(Arc<AtomicU64>);

impl Clock {
    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, t: f64) {
        self.0.store(t.to_bits(), Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct Ids {
    layers: IdGen,
    clips: IdGen,
    transitions: IdGen,
}

/// Z-ordered layers, the playhead and the clip lookup index.
///
/// Cloning is cheap: layers are shared until a mutation touches them, and every clone observes
/// the same clock and allocates from the same id counters. This is what makes committed
/// snapshots safe to render while an edit is being validated on a copy.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    // Ascending z-order: later layers render on top.
    layers: Vec<Arc<Layer>>,
    z_index: HashMap<LayerId, usize>,
    clip_index: HashMap<ClipId, LayerId>,
    transition_index: HashMap<TransitionId, LayerId>,
    clock: Clock,
    ids: Arc<Ids>,
    duration: OnceLock<f64>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty layer on top of the z-order.
    pub fn create_layer(&mut self) -> LayerId {
        let id = LayerId(self.ids.layers.next());
        self.z_index.insert(id, self.layers.len());
        self.layers.push(Arc::new(Layer::new(id)));
        tracing::debug!(%id, z = self.layers.len() - 1, "created layer");
        id
    }

    /// Drop a layer with all of its clips and transitions.
    pub fn remove_layer(&mut self, id: LayerId) -> MontageResult<()> {
        let z = self.z_of(id)?;
        let layer = self.layers.remove(z);
        self.z_index = self
            .layers
            .iter()
            .enumerate()
            .map(|(z, l)| (l.id(), z))
            .collect();
        for clip in layer.clips() {
            self.clip_index.remove(&clip.id);
        }
        for t in layer.transitions() {
            self.transition_index.remove(&t.id);
        }
        self.invalidate_duration();
        Ok(())
    }

    fn z_of(&self, id: LayerId) -> MontageResult<usize> {
        self.z_index
            .get(&id)
            .copied()
            .ok_or_else(|| MontageError::not_found(id))
    }

    fn layer_mut(&mut self, id: LayerId) -> MontageResult<&mut Layer> {
        let z = self.z_of(id)?;
        Ok(Arc::make_mut(&mut self.layers[z]))
    }

    pub fn layer(&self, id: LayerId) -> MontageResult<&Layer> {
        let z = self.z_of(id)?;
        Ok(&self.layers[z])
    }

    /// Layers bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.layers.iter().map(|l| l.as_ref())
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id()).collect()
    }

    /// Total number of clips across layers.
    pub fn clip_count(&self) -> usize {
        self.clip_index.len()
    }

    /// Place a clip on `layer`.
    ///
    /// Media clips must reference an asset registered in `catalog`.
    #[tracing::instrument(skip(self, spec, catalog))]
    pub fn add_clip(
        &mut self,
        layer: LayerId,
        spec: ClipSpec,
        catalog: &MediaCatalog,
    ) -> MontageResult<ClipId> {
        let asset = match spec.kind {
            ClipKind::Media { asset } => Some(
                catalog
                    .get(asset)
                    .map_err(|_| MontageError::AssetNotFound(asset))?,
            ),
            _ => None,
        };
        let z = self.z_of(layer)?;
        let default_start = self.layers[z].append_start();
        let id = ClipId(self.ids.clips.next());
        let clip = spec.build(id, default_start, asset.as_deref())?;
        let (start, duration) = (clip.start, clip.duration);

        Arc::make_mut(&mut self.layers[z]).add_clip(clip)?;
        self.clip_index.insert(id, layer);
        self.invalidate_duration();
        tracing::debug!(%id, start, duration, "added clip");
        Ok(id)
    }

    /// Remove a clip; transitions referencing it are removed with it.
    pub fn remove_clip(&mut self, id: ClipId) -> MontageResult<Clip> {
        let layer = *self
            .clip_index
            .get(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        let (clip, cascaded) = self.layer_mut(layer)?.remove_clip(id)?;
        self.clip_index.remove(&id);
        for t in cascaded {
            self.transition_index.remove(&t);
            tracing::debug!(transition = %t, clip = %id, "removed transition with its clip");
        }
        self.invalidate_duration();
        Ok(clip)
    }

    /// Re-time a clip within its layer.
    pub fn move_clip(&mut self, id: ClipId, start: f64) -> MontageResult<()> {
        let layer = *self
            .clip_index
            .get(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        self.layer_mut(layer)?.move_clip(id, start)?;
        self.invalidate_duration();
        Ok(())
    }

    /// Bridge two adjacent clips of `layer`.
    pub fn add_transition(
        &mut self,
        layer: LayerId,
        spec: TransitionSpec,
    ) -> MontageResult<TransitionId> {
        let id = TransitionId(self.ids.transitions.next());
        let transition = Transition::from_spec(id, spec)?;
        self.layer_mut(layer)?.add_transition(transition)?;
        self.transition_index.insert(id, layer);
        Ok(id)
    }

    pub fn remove_transition(&mut self, id: TransitionId) -> MontageResult<Transition> {
        let layer = *self
            .transition_index
            .get(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        let t = self.layer_mut(layer)?.remove_transition(id)?;
        self.transition_index.remove(&id);
        Ok(t)
    }

    /// Constant-time lookup through the global clip index.
    pub fn get_clip_by_id(&self, id: ClipId) -> MontageResult<(LayerId, &Clip)> {
        let layer = *self
            .clip_index
            .get(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        let clip = self
            .layer(layer)?
            .clip(id)
            .ok_or_else(|| MontageError::not_found(id))?;
        Ok((layer, clip))
    }

    pub fn transition(&self, id: TransitionId) -> MontageResult<(LayerId, &Transition)> {
        let layer = *self
            .transition_index
            .get(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        let t = self
            .layer(layer)?
            .transition(id)
            .ok_or_else(|| MontageError::not_found(id))?;
        Ok((layer, t))
    }

    /// Latest clip end across all layers, 0 when empty.
    pub fn duration(&self) -> f64 {
        *self
            .duration
            .get_or_init(|| self.layers.iter().map(|l| l.end()).fold(0.0, f64::max))
    }

    fn invalidate_duration(&mut self) {
        self.duration.take();
    }

    /// Current playhead position.
    pub fn time(&self) -> f64 {
        self.clock.get()
    }

    /// Move the playhead, clamped to `[0, duration]`. Returns the applied time.
    pub fn seek(&self, t: f64) -> f64 {
        let t = if t.is_finite() {
            t.clamp(0.0, self.duration())
        } else {
            0.0
        };
        self.clock.set(t);
        t
    }

    /// Verify every layer plus the global indexes.
    pub fn check_invariants(&self) -> MontageResult<()> {
        let mut clips = 0usize;
        let mut transitions = 0usize;
        for layer in &self.layers {
            layer.check_invariants()?;
            for clip in layer.clips() {
                clips += 1;
                if self.clip_index.get(&clip.id) != Some(&layer.id()) {
                    return Err(MontageError::validation(format!(
                        "{} is missing from the clip index",
                        clip.id
                    )));
                }
            }
            for t in layer.transitions() {
                transitions += 1;
                if self.transition_index.get(&t.id) != Some(&layer.id()) {
                    return Err(MontageError::validation(format!(
                        "{} is missing from the transition index",
                        t.id
                    )));
                }
            }
        }
        if clips != self.clip_index.len() || transitions != self.transition_index.len() {
            return Err(MontageError::validation("index holds ids of removed items"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/timeline.rs"]
mod tests;
