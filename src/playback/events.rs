use std::sync::{Arc, Mutex, mpsc};

use crate::foundation::core::AssetId;
use crate::foundation::sync::lock;

/// Notifications published by a session.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Media is probed and frame 0 rendered. Emitted once per session.
    Ready,
    /// Playback started or stopped running.
    PlayingStateChanged { is_playing: bool },
    /// A media frame could not be decoded in time; the render fell back. `time` is the timeline
    /// time of that render.
    DecodeFailed { asset: AssetId, time: f64 },
}

/// Fan-out of [`EngineEvent`]s to any number of subscribers.
///
/// Each subscriber owns its own channel, so events arrive in emission order and a slow reader
/// never blocks the engine. Subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Clone, Debug, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<EngineEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn emit(&self, event: EngineEvent) {
        tracing::trace!(?event, "emit");
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/events.rs"]
mod tests;
