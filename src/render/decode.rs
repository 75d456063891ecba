use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crate::assets::media::{MediaAsset, MediaBackend};
use crate::config::DecodeConfig;
use crate::foundation::core::AssetId;
use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::Frame;

/// Cache key: an asset and a frame number on its frame grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct FrameKey {
    pub(crate) asset: AssetId,
    pub(crate) frame: u64,
}

struct CachedFrame {
    frame: Arc<Frame>,
    // Timeline time of the render that asked for this frame.
    timeline_time: f64,
}

/// Bounded LRU of decoded frames.
pub(crate) struct FrameCache {
    entries: HashMap<FrameKey, CachedFrame>,
    lru: VecDeque<FrameKey>,
    capacity: usize,
}

impl FrameCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&mut self, key: FrameKey, timeline_time: f64) -> Option<Arc<Frame>> {
        let entry = self.entries.get_mut(&key)?;
        entry.timeline_time = timeline_time;
        let frame = entry.frame.clone();
        self.touch(key);
        Some(frame)
    }

    pub(crate) fn insert(&mut self, key: FrameKey, frame: Arc<Frame>, timeline_time: f64) {
        self.entries.insert(
            key,
            CachedFrame {
                frame,
                timeline_time,
            },
        );
        self.touch(key);
        while self.lru.len() > self.capacity {
            if let Some(old) = self.lru.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    /// Drop every frame requested farther than `window` seconds from `t`.
    pub(crate) fn retain_window(&mut self, t: f64, window: f64) {
        self.entries
            .retain(|_, e| (e.timeline_time - t).abs() <= window);
        let entries = &self.entries;
        self.lru.retain(|k| entries.contains_key(k));
    }

    fn touch(&mut self, key: FrameKey) {
        if let Some(pos) = self.lru.iter().position(|k| *k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }
}

struct Completion {
    key: FrameKey,
    generation: u64,
    timeline_time: f64,
    result: MontageResult<Frame>,
}

enum Message {
    Done(Completion),
    Cancelled,
    Seek(f64),
}

/// Cancels in-flight decodes from any thread without borrowing the scheduler.
///
/// A waiting [`DecodeScheduler::fetch`] wakes up as soon as the generation moves.
#[derive(Clone, Debug)]
pub(crate) struct DecodeControl {
    generation: Arc<AtomicU64>,
    tx: mpsc::Sender<Message>,
}

impl DecodeControl {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every in-flight request.
    pub(crate) fn cancel(&self) -> u64 {
        let generation = self.bump();
        let _ = self.tx.send(Message::Cancelled);
        generation
    }

    /// Invalidate in-flight requests and evict cached frames outside the window around `t`.
    pub(crate) fn seek(&self, t: f64) -> u64 {
        let generation = self.bump();
        let _ = self.tx.send(Message::Seek(t));
        tracing::debug!(t, generation, "decode seek");
        generation
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Wait allowance shared by every fetch of one rendered frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FetchBudget {
    pub(crate) deadline: Instant,
    /// Generation the render started in; fetches give up once it is superseded.
    pub(crate) generation: u64,
}

/// Runs media decodes on a worker pool and caches the results.
///
/// Each request is tagged with the current generation. Bumping the generation through a
/// [`DecodeControl`] (on seek, pause and stop) makes queued jobs skip their decode, makes late
/// completions get discarded instead of entering the cache, and ends any wait in progress.
pub(crate) struct DecodeScheduler {
    backend: Arc<dyn MediaBackend>,
    pool: rayon::ThreadPool,
    control: DecodeControl,
    rx: mpsc::Receiver<Message>,
    // Generation `pending` belongs to.
    synced: u64,
    pending: HashSet<FrameKey>,
    cache: FrameCache,
    wait_budget: Duration,
    cache_window_secs: f64,
}

impl DecodeScheduler {
    pub(crate) fn new(backend: Arc<dyn MediaBackend>, config: &DecodeConfig) -> MontageResult<Self> {
        config.validate()?;
        let pool = build_thread_pool(config.workers)?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            backend,
            pool,
            control: DecodeControl {
                generation: Arc::new(AtomicU64::new(0)),
                tx,
            },
            rx,
            synced: 0,
            pending: HashSet::new(),
            cache: FrameCache::new(config.cache_capacity),
            wait_budget: Duration::from_millis(config.wait_budget_ms),
            cache_window_secs: config.cache_window_secs,
        })
    }

    pub(crate) fn control(&self) -> DecodeControl {
        self.control.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.control.generation()
    }

    /// Budget for one frame starting now.
    pub(crate) fn budget(&self) -> FetchBudget {
        FetchBudget {
            deadline: Instant::now() + self.wait_budget,
            generation: self.generation(),
        }
    }

    pub(crate) fn cached_frames(&self) -> usize {
        self.cache.len()
    }

    /// Queue a decode without waiting for it.
    pub(crate) fn prefetch(&mut self, asset: &Arc<MediaAsset>, frame: u64, timeline_time: f64) {
        self.sync();
        let key = FrameKey {
            asset: asset.id,
            frame,
        };
        if self.cache.entries.contains_key(&key) || self.pending.contains(&key) {
            return;
        }
        self.submit(asset, key, timeline_time);
    }

    /// Frame `frame` of `asset`, waiting until the budget's deadline at most.
    ///
    /// Returns `DecodeUnavailable` when the deadline passes or the budget's generation is
    /// superseded while waiting.
    pub(crate) fn fetch(
        &mut self,
        asset: &Arc<MediaAsset>,
        frame: u64,
        timeline_time: f64,
        budget: FetchBudget,
    ) -> MontageResult<Arc<Frame>> {
        self.drain();
        let key = FrameKey {
            asset: asset.id,
            frame,
        };
        if let Some(hit) = self.cache.get(key, timeline_time) {
            return Ok(hit);
        }
        let local_time = asset.frame_time(frame);
        let unavailable =
            |reason: &str| MontageError::decode_unavailable(asset.id, local_time, reason);
        if self.generation() != budget.generation {
            return Err(unavailable("superseded by a seek or pause"));
        }
        if !self.pending.contains(&key) {
            self.submit(asset, key, timeline_time);
        }

        loop {
            let remaining = budget.deadline.saturating_duration_since(Instant::now());
            let Ok(msg) = self.rx.recv_timeout(remaining) else {
                return Err(unavailable("decode did not finish within the wait budget"));
            };
            if let Some(result) = self.handle(msg, Some(key)) {
                return result;
            }
            if self.generation() != budget.generation {
                return Err(unavailable("superseded by a seek or pause"));
            }
        }
    }

    /// Fold every completion and control message that has already arrived.
    pub(crate) fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.handle(msg, None);
            n += 1;
        }
        self.sync();
        n
    }

    // Returns the result when `msg` answers `wanted`.
    fn handle(
        &mut self,
        msg: Message,
        wanted: Option<FrameKey>,
    ) -> Option<MontageResult<Arc<Frame>>> {
        match msg {
            Message::Done(c) => self.accept(c, wanted),
            Message::Cancelled => {
                self.sync();
                None
            }
            Message::Seek(t) => {
                self.sync();
                self.cache.retain_window(t, self.cache_window_secs);
                None
            }
        }
    }

    // Pending keys of an older generation will never complete.
    fn sync(&mut self) {
        let generation = self.generation();
        if generation != self.synced {
            self.pending.clear();
            self.synced = generation;
        }
    }

    fn accept(
        &mut self,
        c: Completion,
        wanted: Option<FrameKey>,
    ) -> Option<MontageResult<Arc<Frame>>> {
        if c.generation != self.generation() {
            tracing::debug!(
                asset = %c.key.asset,
                frame = c.key.frame,
                stale = c.generation,
                "discarding stale decode"
            );
            return None;
        }
        self.pending.remove(&c.key);
        let result = c.result.map(|frame| {
            let frame = Arc::new(frame);
            self.cache.insert(c.key, frame.clone(), c.timeline_time);
            frame
        });
        (Some(c.key) == wanted).then_some(result)
    }

    fn submit(&mut self, asset: &Arc<MediaAsset>, key: FrameKey, timeline_time: f64) {
        self.pending.insert(key);
        let generation = self.generation();
        let current = self.control.generation.clone();
        let backend = self.backend.clone();
        let asset = asset.clone();
        let tx = self.control.tx.clone();
        self.pool.spawn(move || {
            if current.load(Ordering::Acquire) != generation {
                return;
            }
            let local_time = asset.frame_time(key.frame);
            let result = backend
                .decode_frame_at(&asset, local_time)
                .map_err(|e| match e {
                    MontageError::DecodeUnavailable { .. } => e,
                    other => MontageError::decode_unavailable(asset.id, local_time, other.to_string()),
                });
            // The receiver lives as long as the scheduler; a send error means it is gone.
            let _ = tx.send(Message::Done(Completion {
                key,
                generation,
                timeline_time,
                result,
            }));
        });
    }
}

fn build_thread_pool(workers: Option<usize>) -> MontageResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("montage-decode-{i}"));
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MontageError::config(format!("failed to build decode thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/decode.rs"]
mod tests;
