//! Media registration, decode back ends and text shaping.

pub mod catalog;
pub mod ffmpeg;
pub mod media;
pub mod routing;
pub mod still;
pub mod synthetic;
pub(crate) mod text;
