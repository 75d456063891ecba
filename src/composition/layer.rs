use std::collections::{BTreeMap, HashMap};

use crate::composition::clip::Clip;
use crate::composition::transition::{Transition, TransitionWindow};
use crate::foundation::core::{ClipId, LayerId, TransitionId};
use crate::foundation::error::{MontageError, MontageResult};

const TIME_EPS: f64 = 1e-9;

/// Ordering key of a clip: timeline start, then insertion sequence.
#[derive(Clone, Copy, Debug)]
struct Slot {
    start: f64,
    seq: u64,
    id: ClipId,
}

impl Slot {
    fn key_cmp(&self, start: f64, seq: u64) -> std::cmp::Ordering {
        self.start.total_cmp(&start).then(self.seq.cmp(&seq))
    }
}

#[derive(Clone, Debug)]
struct Entry {
    seq: u64,
    clip: Clip,
}

/// What a layer shows at one instant.
#[derive(Clone, Copy, Debug)]
pub enum Active<'a> {
    Clip(&'a Clip),
    Transition {
        transition: &'a Transition,
        from: &'a Clip,
        to: &'a Clip,
        progress: f64,
    },
}

/// One z-level track of clips.
///
/// Clips are kept sorted by `(start, insertion sequence)` so the clip active at a time is found
/// with a binary search. Ranges never intersect unless a transition bridges the two clips and
/// the intersection lies inside its window.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    order: Vec<Slot>,
    clips: HashMap<ClipId, Entry>,
    next_seq: u64,
    transitions: BTreeMap<TransitionId, Transition>,
    outgoing: HashMap<ClipId, TransitionId>,
    incoming: HashMap<ClipId, TransitionId>,
}

impl Layer {
    pub(crate) fn new(id: LayerId) -> Self {
        Self {
            id,
            order: Vec::new(),
            clips: HashMap::new(),
            next_seq: 0,
            transitions: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Clips in time order.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> + '_ {
        self.order.iter().filter_map(|s| self.clips.get(&s.id).map(|e| &e.clip))
    }

    /// Clip ids in time order.
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.order.iter().map(|s| s.id).collect()
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id).map(|e| &e.clip)
    }

    pub fn contains_clip(&self, id: ClipId) -> bool {
        self.clips.contains_key(&id)
    }

    /// Transitions in id order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions.values()
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(&id)
    }

    /// Transition whose start clip is `clip`.
    pub fn outgoing(&self, clip: ClipId) -> Option<&Transition> {
        self.outgoing.get(&clip).and_then(|t| self.transitions.get(t))
    }

    /// Transition whose end clip is `clip`.
    pub fn incoming(&self, clip: ClipId) -> Option<&Transition> {
        self.incoming.get(&clip).and_then(|t| self.transitions.get(t))
    }

    /// Latest clip end, 0 when empty.
    pub fn end(&self) -> f64 {
        // With bridged overlaps the latest end belongs to one of the last two clips.
        self.order
            .iter()
            .rev()
            .take(2)
            .filter_map(|s| self.clip(s.id))
            .map(Clip::end)
            .fold(0.0, f64::max)
    }

    /// Start time for a clip appended after the last one.
    pub fn append_start(&self) -> f64 {
        self.end()
    }

    fn position(&self, id: ClipId) -> Option<usize> {
        let entry = self.clips.get(&id)?;
        self.order
            .binary_search_by(|s| s.key_cmp(entry.clip.start, entry.seq))
            .ok()
    }

    fn clip_at(&self, idx: usize) -> Option<&Clip> {
        self.order.get(idx).and_then(|s| self.clip(s.id))
    }

    fn window_of(&self, t: &Transition) -> Option<TransitionWindow> {
        Some(t.window(self.clip(t.from)?, self.clip(t.to)?))
    }

    /// Insert a validated clip in time order.
    pub(crate) fn add_clip(&mut self, clip: Clip) -> MontageResult<ClipId> {
        clip.validate()?;
        if self.clips.contains_key(&clip.id) {
            return Err(MontageError::validation(format!(
                "{} already exists in {}",
                clip.id, self.id
            )));
        }

        let idx = self.order.partition_point(|s| s.start <= clip.start);
        let range = clip.range();
        for other in [idx.checked_sub(2), idx.checked_sub(1), Some(idx)]
            .into_iter()
            .flatten()
            .filter_map(|i| self.clip_at(i))
        {
            if other.range().intersects(range) {
                return Err(MontageError::OverlapViolation {
                    clip: clip.id,
                    other: other.id,
                });
            }
        }
        if let (Some(prev), Some(next)) = (
            idx.checked_sub(1).and_then(|i| self.order.get(i)),
            self.order.get(idx),
        ) && let Some(t) = self.outgoing(prev.id)
            && t.to == next.id
        {
            return Err(MontageError::invalid_adjacency(format!(
                "{} would separate the clips bridged by {}",
                clip.id, t.id
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = clip.id;
        self.order.insert(
            idx,
            Slot {
                start: clip.start,
                seq,
                id,
            },
        );
        self.clips.insert(id, Entry { seq, clip });
        Ok(id)
    }

    /// Remove a clip and every transition that references it.
    pub(crate) fn remove_clip(&mut self, id: ClipId) -> MontageResult<(Clip, Vec<TransitionId>)> {
        let idx = self.position(id).ok_or_else(|| MontageError::not_found(id))?;
        let cascaded: Vec<TransitionId> = [self.outgoing.get(&id), self.incoming.get(&id)]
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for t in &cascaded {
            self.detach_transition(*t);
        }
        self.order.remove(idx);
        let entry = self
            .clips
            .remove(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        Ok((entry.clip, cascaded))
    }

    /// Bridge two consecutive clips of this layer.
    pub(crate) fn add_transition(&mut self, transition: Transition) -> MontageResult<TransitionId> {
        let (Some(from_idx), Some(to_idx)) =
            (self.position(transition.from), self.position(transition.to))
        else {
            return Err(MontageError::invalid_adjacency(format!(
                "{} and {} must both belong to {}",
                transition.from, transition.to, self.id
            )));
        };
        if to_idx != from_idx + 1 {
            return Err(MontageError::invalid_adjacency(format!(
                "{} must immediately precede {}",
                transition.from, transition.to
            )));
        }
        if self.outgoing.contains_key(&transition.from) {
            return Err(MontageError::invalid_adjacency(format!(
                "{} already starts a transition",
                transition.from
            )));
        }
        if self.incoming.contains_key(&transition.to) {
            return Err(MontageError::invalid_adjacency(format!(
                "{} already ends a transition",
                transition.to
            )));
        }
        self.validate_transition(&transition)?;

        let id = transition.id;
        self.outgoing.insert(transition.from, id);
        self.incoming.insert(transition.to, id);
        self.transitions.insert(id, transition);
        Ok(id)
    }

    /// Gap, duration and window checks for a transition between two consecutive clips.
    fn validate_transition(&self, t: &Transition) -> MontageResult<()> {
        let (Some(from), Some(to)) = (self.clip(t.from), self.clip(t.to)) else {
            return Err(MontageError::invalid_adjacency(format!(
                "{} references clips outside {}",
                t.id, self.id
            )));
        };
        let gap = to.start - from.end();
        if gap > t.span() + TIME_EPS {
            return Err(MontageError::invalid_adjacency(format!(
                "gap of {gap}s between {} and {} exceeds the blend window of {}s",
                from.id,
                to.id,
                t.span()
            )));
        }
        let shortest = from.duration.min(to.duration);
        if t.span() > shortest + TIME_EPS {
            return Err(MontageError::duration_exceeded(format!(
                "{}: blend window {}s exceeds clip duration {shortest}s",
                t.id,
                t.span()
            )));
        }

        let window = t.window(from, to);
        if let Some(overlap) = from.range().intersection(to.range())
            && (overlap.start < window.start - TIME_EPS || overlap.end > window.end + TIME_EPS)
        {
            return Err(MontageError::OverlapViolation {
                clip: to.id,
                other: from.id,
            });
        }
        // Windows sharing a clip must not intersect.
        if let Some(prev) = self.incoming(t.from).filter(|p| p.id != t.id)
            && let Some(pw) = self.window_of(prev)
            && pw.end > window.start + TIME_EPS
        {
            return Err(MontageError::duration_exceeded(format!(
                "{} and {} overlap on {}",
                prev.id, t.id, t.from
            )));
        }
        if let Some(next) = self.outgoing(t.to).filter(|n| n.id != t.id)
            && let Some(nw) = self.window_of(next)
            && window.end > nw.start + TIME_EPS
        {
            return Err(MontageError::duration_exceeded(format!(
                "{} and {} overlap on {}",
                t.id, next.id, t.to
            )));
        }
        Ok(())
    }

    pub(crate) fn remove_transition(&mut self, id: TransitionId) -> MontageResult<Transition> {
        self.detach_transition(id)
            .ok_or_else(|| MontageError::not_found(id))
    }

    fn detach_transition(&mut self, id: TransitionId) -> Option<Transition> {
        let t = self.transitions.remove(&id)?;
        self.outgoing.remove(&t.from);
        self.incoming.remove(&t.to);
        Some(t)
    }

    /// Re-time a clip. Its transitions must stay valid; otherwise the layer is left unchanged.
    pub(crate) fn move_clip(&mut self, id: ClipId, new_start: f64) -> MontageResult<()> {
        let idx = self.position(id).ok_or_else(|| MontageError::not_found(id))?;
        let mut next = self.clone();
        next.order.remove(idx);
        let entry = next
            .clips
            .get_mut(&id)
            .ok_or_else(|| MontageError::not_found(id))?;
        entry.clip.start = new_start;
        entry.clip.validate()?;
        let seq = entry.seq;
        // The clip keeps its insertion sequence, so ties still resolve by insertion order.
        let at = next
            .order
            .partition_point(|s| s.key_cmp(new_start, seq).is_lt());
        next.order.insert(
            at,
            Slot {
                start: new_start,
                seq,
                id,
            },
        );
        next.check_invariants()?;
        *self = next;
        Ok(())
    }

    /// Content visible at `t`.
    pub fn resolve_at(&self, t: f64) -> Option<Active<'_>> {
        let idx = self.order.partition_point(|s| s.start <= t);
        let last = self.clip_at(idx.checked_sub(1)?)?;

        let bridged = [self.outgoing(last.id), self.incoming(last.id)];
        for tr in bridged.into_iter().flatten() {
            let (Some(from), Some(to)) = (self.clip(tr.from), self.clip(tr.to)) else {
                continue;
            };
            let window = tr.window(from, to);
            if window.contains(t) {
                return Some(Active::Transition {
                    transition: tr,
                    from,
                    to,
                    progress: window.progress(t),
                });
            }
        }
        if last.range().contains(t) {
            return Some(Active::Clip(last));
        }
        // A clip that started earlier may still be running inside a bridged overlap.
        let before = self.clip_at(idx.checked_sub(2)?)?;
        before.range().contains(t).then_some(Active::Clip(before))
    }

    /// Verify ordering, overlap and transition consistency.
    pub fn check_invariants(&self) -> MontageResult<()> {
        if self.order.len() != self.clips.len() {
            return Err(MontageError::validation(format!(
                "{}: order has {} clips, store has {}",
                self.id,
                self.order.len(),
                self.clips.len()
            )));
        }
        for pair in self.order.windows(2) {
            if pair[0].key_cmp(pair[1].start, pair[1].seq).is_ge() {
                return Err(MontageError::validation(format!(
                    "{}: clips out of order at {}",
                    self.id, pair[1].id
                )));
            }
        }
        for slot in &self.order {
            let entry = self
                .clips
                .get(&slot.id)
                .ok_or_else(|| MontageError::not_found(slot.id))?;
            if entry.seq != slot.seq || entry.clip.start.total_cmp(&slot.start).is_ne() {
                return Err(MontageError::validation(format!(
                    "{}: stale ordering key for {}",
                    self.id, slot.id
                )));
            }
            entry.clip.validate()?;
        }

        for (i, slot) in self.order.iter().enumerate() {
            let Some(clip) = self.clip(slot.id) else {
                continue;
            };
            for (j, later) in self.order.iter().enumerate().skip(i + 1) {
                if later.start >= clip.end() {
                    break;
                }
                let bridged = j == i + 1
                    && self
                        .outgoing(clip.id)
                        .is_some_and(|t| t.to == later.id);
                if !bridged {
                    return Err(MontageError::OverlapViolation {
                        clip: later.id,
                        other: clip.id,
                    });
                }
            }
        }

        for t in self.transitions.values() {
            let (Some(from_idx), Some(to_idx)) = (self.position(t.from), self.position(t.to))
            else {
                return Err(MontageError::invalid_adjacency(format!(
                    "{} references clips outside {}",
                    t.id, self.id
                )));
            };
            if to_idx != from_idx + 1 {
                return Err(MontageError::invalid_adjacency(format!(
                    "{}: {} no longer immediately precedes {}",
                    t.id, t.from, t.to
                )));
            }
            if self.outgoing.get(&t.from) != Some(&t.id) || self.incoming.get(&t.to) != Some(&t.id)
            {
                return Err(MontageError::validation(format!(
                    "{}: transition index out of sync",
                    t.id
                )));
            }
            self.validate_transition(t)?;
        }
        if self.outgoing.len() != self.transitions.len()
            || self.incoming.len() != self.transitions.len()
        {
            return Err(MontageError::validation(format!(
                "{}: dangling transition index entries",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/layer.rs"]
mod tests;
