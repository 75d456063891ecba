use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::Context;

use crate::assets::media::{MediaAsset, MediaBackend, MediaProbe};
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::sync;
use crate::render::frame::{Frame, PixelFormat};

/// Back end presenting still images as media of a fixed duration.
///
/// Images are decoded once on first request and shared afterwards.
pub struct StillImageBackend {
    duration: f64,
    fps: Fps,
    decoded: RwLock<HashMap<String, Arc<Frame>>>,
}

impl StillImageBackend {
    /// Stills last `duration` seconds on a `fps` grid.
    pub fn new(duration: f64, fps: Fps) -> Self {
        Self {
            duration,
            fps,
            decoded: RwLock::new(HashMap::new()),
        }
    }

    /// `true` when the locator's extension names an image format the `image` crate knows.
    pub fn handles(locator: &str) -> bool {
        image::ImageFormat::from_path(locator).is_ok()
    }

    fn decode(&self, locator: &str) -> MontageResult<Arc<Frame>> {
        if let Some(frame) = sync::read(&self.decoded).get(locator) {
            return Ok(Arc::clone(frame));
        }
        let img = image::open(Path::new(locator))
            .with_context(|| format!("decode image '{locator}'"))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let frame = Arc::new(
            Frame::new(width, height, PixelFormat::Rgba8, img.into_raw())?.into_premultiplied(),
        );
        sync::write(&self.decoded).insert(locator.to_string(), Arc::clone(&frame));
        Ok(frame)
    }
}

impl MediaBackend for StillImageBackend {
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe> {
        let (width, height) = image::image_dimensions(Path::new(locator))
            .map_err(|e| MontageError::media_unreadable(locator, e.to_string()))?;
        let resolution = Resolution::new(width, height)
            .map_err(|e| MontageError::media_unreadable(locator, e.to_string()))?;
        Ok(MediaProbe {
            resolution,
            duration: self.duration,
            fps: self.fps,
        })
    }

    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame> {
        self.decode(&asset.locator)
            .map(|f| f.as_ref().clone())
            .map_err(|e| MontageError::decode_unavailable(asset.id, local_time, e.to_string()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/still.rs"]
mod tests;
