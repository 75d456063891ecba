//! Montage is a timeline-based video composition engine.
//!
//! A [`Session`] owns everything needed to build and play a composition:
//!
//! - register media through a [`MediaBackend`] and read back [`MediaAsset`] metadata
//! - arrange clips on z-ordered layers of a [`Timeline`], bridged by [`Transition`]s
//! - render premultiplied RGBA8 [`Frame`]s at any time, or run a playback thread that presents
//!   them to a [`DisplaySurface`]
//! - observe [`EngineEvent`]s on per-subscriber channels
#![forbid(unsafe_code)]

mod foundation;

/// Media registration and decode back ends.
pub mod assets;
/// Clips, transitions, layers and the timeline.
pub mod composition;
/// Session configuration.
pub mod config;
/// Pixel blends used by transitions and layer compositing.
pub mod effects;
/// Playback state machine and events.
pub mod playback;
/// Frames, rasterization, decoding and compositing.
pub mod render;
/// The engine object.
pub mod session;

pub use crate::foundation::core::{
    AssetId, ClipId, Fps, LayerId, Resolution, Rgba8, TimeRange, TransitionId,
};
pub use crate::foundation::error::{MontageError, MontageResult};

pub use crate::assets::catalog::MediaCatalog;
pub use crate::assets::ffmpeg::FfmpegBackend;
pub use crate::assets::media::{MediaAsset, MediaBackend, MediaProbe, filename_of};
pub use crate::assets::routing::RoutingBackend;
pub use crate::assets::still::StillImageBackend;
pub use crate::assets::synthetic::SyntheticBackend;
pub use crate::assets::text::{FontFace, FontSet};
pub use crate::composition::clip::{
    Clip, ClipKind, ClipSpec, ClipStyle, Fit, FontWeight, Position, TextAlign, Trim,
};
pub use crate::composition::layer::{Active, Layer};
pub use crate::composition::timeline::Timeline;
pub use crate::composition::transition::{
    BlendKind, Transition, TransitionSpec, TransitionWindow, WipeDir,
};
pub use crate::config::{DecodeConfig, DisplayConfig, MediaConfig, PlaybackConfig, SessionConfig};
pub use crate::effects::blend::{
    BlendFn, BlendRegistry, PixelSample, TransitionEngine, TransitionPhase,
};
pub use crate::playback::controller::{EndBehavior, PlaybackController, PlaybackState, Tick};
pub use crate::playback::events::{EngineEvent, EventBus};
pub use crate::render::compositor::{Compositor, RenderInputs};
pub use crate::render::frame::{Frame, PixelFormat};
pub use crate::render::surface::{DisplaySurface, MemorySurface};
pub use crate::session::{PlaybackCommand, PlaybackHandle, Session};
