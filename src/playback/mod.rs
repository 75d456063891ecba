//! Playback state machine and engine notifications.

pub mod controller;
pub mod events;
