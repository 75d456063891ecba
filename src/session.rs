//! The engine object tying media, timeline, rendering and playback together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::assets::catalog::MediaCatalog;
use crate::assets::media::{MediaAsset, MediaBackend};
use crate::assets::routing::RoutingBackend;
use crate::assets::text::{FontFace, FontSet, TextBrushRgba8, TextLayoutEngine};
use crate::composition::clip::{Clip, ClipSpec, FontWeight, TextAlign};
use crate::composition::timeline::Timeline;
use crate::composition::transition::{Transition, TransitionSpec};
use crate::config::SessionConfig;
use crate::effects::blend::{PixelSample, TransitionEngine};
use crate::foundation::core::{AssetId, ClipId, LayerId, TransitionId};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::sync::{lock, read, write};
use crate::playback::controller::{EndBehavior, PlaybackController, PlaybackState, Tick};
use crate::playback::events::{EngineEvent, EventBus};
use crate::render::compositor::{Compositor, RenderInputs};
use crate::render::decode::DecodeControl;
use crate::render::frame::Frame;
use crate::render::surface::DisplaySurface;

/// A composition engine instance.
///
/// Edits are copy-on-write: each mutation clones the committed [`Timeline`], applies the change,
/// validates it and swaps the result in. Renders and playback always read the last committed
/// snapshot, so a failed edit is invisible and an in-progress edit never tears a frame.
pub struct Session {
    config: SessionConfig,
    catalog: MediaCatalog,
    timeline: RwLock<Arc<Timeline>>,
    edit: Mutex<()>,
    compositor: Mutex<Compositor>,
    // Cancels decodes without waiting for a render that holds the compositor.
    decode: DecodeControl,
    controller: Mutex<PlaybackController>,
    events: EventBus,
    fonts: RwLock<FontSet>,
    engine: RwLock<TransitionEngine>,
    ready: AtomicBool,
}

impl Session {
    pub fn new(config: SessionConfig, backend: Arc<dyn MediaBackend>) -> MontageResult<Self> {
        config.validate()?;
        let events = EventBus::new();
        let compositor = Compositor::new(
            config.display,
            backend.clone(),
            &config.decode,
            events.clone(),
        )?;
        tracing::debug!(
            width = config.display.width,
            height = config.display.height,
            "session created"
        );
        Ok(Self {
            config,
            catalog: MediaCatalog::new(backend),
            timeline: RwLock::new(Arc::new(Timeline::new())),
            edit: Mutex::new(()),
            decode: compositor.decode_control(),
            compositor: Mutex::new(compositor),
            controller: Mutex::new(PlaybackController::new(config.playback.end_behavior)),
            events,
            fonts: RwLock::new(FontSet::default()),
            engine: RwLock::new(TransitionEngine::default()),
            ready: AtomicBool::new(false),
        })
    }

    /// Session backed by the built-in [`RoutingBackend`].
    pub fn with_default_backend(config: SessionConfig) -> MontageResult<Self> {
        let backend = RoutingBackend::new(config.media.still_duration, config.media.fps()?);
        Self::new(config, Arc::new(backend))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // --- media ---

    pub fn register_media(&self, locator: &str) -> MontageResult<AssetId> {
        self.catalog.register(locator)
    }

    /// Register several locators concurrently; results keep the input order.
    pub fn register_media_all<S>(&self, locators: &[S]) -> Vec<MontageResult<AssetId>>
    where
        S: AsRef<str> + Sync,
    {
        self.catalog.register_all(locators)
    }

    pub fn media(&self, id: AssetId) -> MontageResult<Arc<MediaAsset>> {
        self.catalog.get(id)
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    // --- timeline edits ---

    fn edit<T>(&self, f: impl FnOnce(&mut Timeline) -> MontageResult<T>) -> MontageResult<T> {
        let _guard = lock(&self.edit);
        let mut next = Timeline::clone(&self.snapshot());
        let out = f(&mut next)?;
        if cfg!(debug_assertions) {
            next.check_invariants()?;
        }
        if next.time() > next.duration() {
            next.seek(next.duration());
        }
        *write(&self.timeline) = Arc::new(next);
        Ok(out)
    }

    pub fn create_layer(&self) -> MontageResult<LayerId> {
        self.edit(|tl| Ok(tl.create_layer()))
    }

    pub fn remove_layer(&self, id: LayerId) -> MontageResult<()> {
        self.edit(|tl| tl.remove_layer(id))?;
        lock(&self.compositor).forget_layer(id);
        Ok(())
    }

    pub fn add_clip(&self, layer: LayerId, spec: ClipSpec) -> MontageResult<ClipId> {
        self.edit(|tl| tl.add_clip(layer, spec, &self.catalog))
    }

    /// Remove a clip and every transition that references it.
    pub fn remove_clip(&self, id: ClipId) -> MontageResult<Clip> {
        self.edit(|tl| tl.remove_clip(id))
    }

    pub fn move_clip(&self, id: ClipId, start: f64) -> MontageResult<()> {
        self.edit(|tl| tl.move_clip(id, start))
    }

    pub fn add_transition(
        &self,
        layer: LayerId,
        spec: TransitionSpec,
    ) -> MontageResult<TransitionId> {
        read(&self.engine).check_blend(&spec.blend)?;
        self.edit(|tl| tl.add_transition(layer, spec))
    }

    pub fn remove_transition(&self, id: TransitionId) -> MontageResult<Transition> {
        self.edit(|tl| tl.remove_transition(id))
    }

    /// Layer and a copy of the clip with `id`.
    pub fn clip(&self, id: ClipId) -> MontageResult<(LayerId, Clip)> {
        let snap = self.snapshot();
        let (layer, clip) = snap.get_clip_by_id(id)?;
        Ok((layer, clip.clone()))
    }

    /// The last committed timeline.
    pub fn snapshot(&self) -> Arc<Timeline> {
        read(&self.timeline).clone()
    }

    pub fn duration(&self) -> f64 {
        self.snapshot().duration()
    }

    pub fn time(&self) -> f64 {
        self.snapshot().time()
    }

    /// Move the clock (clamped to the timeline) and drop decodes for the old position.
    pub fn seek(&self, t: f64) -> f64 {
        let t = self.snapshot().seek(t);
        self.decode.seek(t);
        t
    }

    // --- playback ---

    pub fn play(&self) {
        let snap = self.snapshot();
        let changed = lock(&self.controller).play(&snap, Instant::now());
        if changed {
            self.events
                .emit(EngineEvent::PlayingStateChanged { is_playing: true });
        }
    }

    pub fn pause(&self) {
        let changed = lock(&self.controller).pause();
        if changed {
            self.decode.cancel();
            self.events
                .emit(EngineEvent::PlayingStateChanged { is_playing: false });
        }
    }

    /// Stop and rewind to 0.
    pub fn stop(&self) {
        let snap = self.snapshot();
        let changed = lock(&self.controller).stop(&snap);
        self.decode.seek(0.0);
        if changed {
            self.events
                .emit(EngineEvent::PlayingStateChanged { is_playing: false });
        }
    }

    pub fn end_behavior(&self) -> EndBehavior {
        lock(&self.controller).end_behavior()
    }

    /// Change what happens when playback reaches the end; takes effect on the next tick.
    pub fn set_end_behavior(&self, end_behavior: EndBehavior) {
        lock(&self.controller).set_end_behavior(end_behavior);
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.controller).state()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.controller).is_playing()
    }

    /// Advance playback to `now`.
    pub fn tick(&self, now: Instant) -> Tick {
        let snap = self.snapshot();
        let before = snap.time();
        let tick = lock(&self.controller).tick(&snap, now);
        if tick.state_changed || tick.time < before {
            self.decode.seek(tick.time);
        }
        if tick.state_changed {
            self.events.emit(EngineEvent::PlayingStateChanged {
                is_playing: self.is_playing(),
            });
        }
        tick
    }

    // --- rendering ---

    /// Render the committed timeline at the current clock.
    pub fn render_frame(&self) -> MontageResult<Frame> {
        let snap = self.snapshot();
        self.render_snapshot(&snap, snap.time())
    }

    /// Render the committed timeline at `t` without moving the clock.
    pub fn render_at(&self, t: f64) -> MontageResult<Frame> {
        self.render_snapshot(&self.snapshot(), t)
    }

    /// Render an arbitrary snapshot, e.g. one taken before later edits.
    pub fn render_snapshot(&self, timeline: &Timeline, t: f64) -> MontageResult<Frame> {
        let fonts = read(&self.fonts);
        let engine = read(&self.engine);
        let inputs = RenderInputs {
            catalog: &self.catalog,
            fonts: &fonts,
            engine: &engine,
        };
        lock(&self.compositor).render_frame(timeline, inputs, t)
    }

    /// Render frame 0 and announce [`EngineEvent::Ready`] the first time this succeeds.
    pub fn prepare(&self) -> MontageResult<Frame> {
        let frame = self.render_at(0.0)?;
        if !self.ready.swap(true, Ordering::AcqRel) {
            tracing::debug!("session ready");
            self.events.emit(EngineEvent::Ready);
        }
        Ok(frame)
    }

    pub fn subscribe(&self) -> mpsc::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Make `name` usable as a [`BlendKind::Custom`](crate::BlendKind::Custom) transition.
    pub fn register_blend<F>(&self, name: impl Into<String>, blend: F)
    where
        F: Fn(&PixelSample) -> [f32; 4] + Send + Sync + 'static,
    {
        write(&self.engine).registry_mut().register(name, blend);
    }

    /// Install the font used by text clips of `weight`. The bytes must hold a TrueType/OpenType
    /// font.
    pub fn set_font(&self, weight: FontWeight, bytes: Vec<u8>) -> MontageResult<()> {
        let face = FontFace::new(bytes);
        TextLayoutEngine::new().shape(
            "Ag",
            &face,
            16.0,
            TextBrushRgba8::default(),
            None,
            TextAlign::Left,
        )?;
        write(&self.fonts).set_face(weight, face);
        Ok(())
    }

    /// Run playback on a dedicated thread that presents frames to `surface`.
    ///
    /// The thread presents frame 0 immediately, then one frame per playback interval while
    /// playing, and one frame after every command otherwise.
    pub fn spawn_playback<S>(self: &Arc<Self>, surface: S) -> MontageResult<PlaybackHandle>
    where
        S: DisplaySurface + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let session = Arc::clone(self);
        let interval = Duration::from_secs_f64(1.0 / self.config.playback.frame_rate);
        let join = std::thread::Builder::new()
            .name("montage-playback".to_string())
            .spawn(move || playback_loop(&session, surface, &rx, interval))
            .map_err(|e| MontageError::Other(anyhow::Error::new(e).context("spawn playback")))?;
        Ok(PlaybackHandle {
            tx,
            join: Some(join),
        })
    }
}

/// Commands accepted by the playback thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Seek(f64),
    Stop,
    Shutdown,
}

/// Control side of [`Session::spawn_playback`]. Dropping it shuts the thread down.
pub struct PlaybackHandle {
    tx: mpsc::Sender<PlaybackCommand>,
    join: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub fn send(&self, cmd: PlaybackCommand) -> MontageResult<()> {
        self.tx
            .send(cmd)
            .map_err(|_| MontageError::validation("playback thread has exited"))
    }

    pub fn play(&self) -> MontageResult<()> {
        self.send(PlaybackCommand::Play)
    }

    pub fn pause(&self) -> MontageResult<()> {
        self.send(PlaybackCommand::Pause)
    }

    pub fn seek(&self, t: f64) -> MontageResult<()> {
        self.send(PlaybackCommand::Seek(t))
    }

    pub fn stop(&self) -> MontageResult<()> {
        self.send(PlaybackCommand::Stop)
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        let _ = self.tx.send(PlaybackCommand::Shutdown);
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::warn!("playback thread panicked");
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.join_thread();
    }
}

fn playback_loop<S: DisplaySurface>(
    session: &Session,
    mut surface: S,
    rx: &mpsc::Receiver<PlaybackCommand>,
    interval: Duration,
) {
    match session.prepare() {
        Ok(frame) => surface.present(&frame),
        Err(e) => tracing::warn!(error = %e, "initial render failed"),
    }

    let mut next_frame = Instant::now();
    loop {
        let cmd = if session.is_playing() {
            match rx.recv_timeout(next_frame.saturating_duration_since(Instant::now())) {
                Ok(cmd) => Some(cmd),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => return,
            }
        } else {
            match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => return,
            }
        };

        match cmd {
            Some(PlaybackCommand::Shutdown) => return,
            Some(PlaybackCommand::Play) => {
                session.play();
                next_frame = Instant::now();
            }
            Some(PlaybackCommand::Pause) => session.pause(),
            Some(PlaybackCommand::Seek(t)) => {
                session.seek(t);
            }
            Some(PlaybackCommand::Stop) => session.stop(),
            None => {
                session.tick(Instant::now());
                next_frame += interval;
                // Skip frames rather than queue them when rendering falls behind.
                let now = Instant::now();
                if next_frame < now {
                    next_frame = now;
                }
            }
        }

        match session.render_frame() {
            Ok(frame) => surface.present(&frame),
            Err(e) => tracing::warn!(error = %e, "render failed"),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
