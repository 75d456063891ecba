use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::composition::timeline::Timeline;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What playback does when the clock reaches the end of the timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndBehavior {
    /// Stop and put the clock back at 0.
    #[default]
    StopAndRewind,
    /// Stop with the clock on the end.
    HoldLastFrame,
    /// Wrap around and keep playing.
    Loop,
}

impl EndBehavior {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stop_and_rewind" | "stop" | "rewind" => Some(Self::StopAndRewind),
            "hold_last_frame" | "hold" => Some(Self::HoldLastFrame),
            "loop" => Some(Self::Loop),
            _ => None,
        }
    }
}

/// Result of advancing the clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Clock after the tick.
    pub time: f64,
    /// `true` when the tick changed the playback state (playback reached the end).
    pub state_changed: bool,
}

/// Stopped/Playing/Paused state machine driving a timeline clock from wall-clock time.
///
/// The controller holds no timeline. Every call takes the snapshot whose clock it should move;
/// since snapshots share one clock, any snapshot of the session works.
#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    end_behavior: EndBehavior,
    last_tick: Option<Instant>,
}

impl PlaybackController {
    pub fn new(end_behavior: EndBehavior) -> Self {
        Self {
            end_behavior,
            ..Self::default()
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn end_behavior(&self) -> EndBehavior {
        self.end_behavior
    }

    pub fn set_end_behavior(&mut self, end_behavior: EndBehavior) {
        self.end_behavior = end_behavior;
    }

    /// Start (or resume) playback at `now`. Rewinds first when the clock sits on the end.
    ///
    /// Returns `true` when the state changed.
    pub fn play(&mut self, timeline: &Timeline, now: Instant) -> bool {
        if self.state == PlaybackState::Playing {
            return false;
        }
        if timeline.time() >= timeline.duration() {
            timeline.seek(0.0);
        }
        self.last_tick = Some(now);
        self.set_state(PlaybackState::Playing)
    }

    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.last_tick = None;
        self.set_state(PlaybackState::Paused)
    }

    /// Stop from any state and rewind the clock.
    pub fn stop(&mut self, timeline: &Timeline) -> bool {
        timeline.seek(0.0);
        self.last_tick = None;
        self.set_state(PlaybackState::Stopped)
    }

    /// Advance the clock by the wall-clock time elapsed since the previous tick.
    pub fn tick(&mut self, timeline: &Timeline, now: Instant) -> Tick {
        if self.state != PlaybackState::Playing {
            return Tick {
                time: timeline.time(),
                state_changed: false,
            };
        }
        let elapsed = self
            .last_tick
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last_tick = Some(now);

        let duration = timeline.duration();
        let t = timeline.time() + elapsed;
        if t < duration {
            return Tick {
                time: timeline.seek(t),
                state_changed: false,
            };
        }

        match self.end_behavior {
            EndBehavior::Loop if duration > 0.0 => Tick {
                time: timeline.seek(t % duration),
                state_changed: false,
            },
            EndBehavior::HoldLastFrame => {
                self.last_tick = None;
                Tick {
                    time: timeline.seek(duration),
                    state_changed: self.set_state(PlaybackState::Stopped),
                }
            }
            EndBehavior::StopAndRewind | EndBehavior::Loop => {
                self.last_tick = None;
                tracing::debug!(duration, "playback reached the end");
                Tick {
                    time: timeline.seek(0.0),
                    state_changed: self.set_state(PlaybackState::Stopped),
                }
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState) -> bool {
        if self.state == state {
            return false;
        }
        tracing::debug!(from = ?self.state, to = ?state, "playback state");
        self.state = state;
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
