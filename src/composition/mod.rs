//! Timeline model: clips, transitions, layers and the timeline that orders them.

pub mod clip;
pub mod layer;
pub mod timeline;
pub mod transition;
