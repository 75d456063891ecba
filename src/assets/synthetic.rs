use crate::assets::media::{MediaAsset, MediaBackend, MediaProbe};
use crate::foundation::core::{Fps, Resolution, Rgba8};
use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::{Frame, PixelFormat};

/// Locator prefix handled by [`SyntheticBackend`].
pub const SYNTHETIC_SCHEME: &str = "synthetic:";

/// Back end producing solid-color media from descriptive locators.
///
/// Locator grammar: `synthetic:<RRGGBB[AA]>:<W>x<H>:<duration>[:<fps>]`, e.g.
/// `synthetic:ff0000:64x36:5:30`. Frame rate defaults to 30.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticBackend;

#[derive(Clone, Copy, Debug, PartialEq)]
struct SyntheticSpec {
    color: Rgba8,
    resolution: Resolution,
    duration: f64,
    fps: Fps,
}

impl SyntheticBackend {
    /// Build a locator this back end understands.
    pub fn locator(color: Rgba8, width: u32, height: u32, duration: f64) -> String {
        format!(
            "{SYNTHETIC_SCHEME}{:02x}{:02x}{:02x}{:02x}:{width}x{height}:{duration}",
            color.r, color.g, color.b, color.a
        )
    }

    /// `true` when `locator` uses the synthetic scheme.
    pub fn handles(locator: &str) -> bool {
        locator.starts_with(SYNTHETIC_SCHEME)
    }

    fn parse(locator: &str) -> MontageResult<SyntheticSpec> {
        let unreadable = |reason: &str| MontageError::media_unreadable(locator, reason);
        let body = locator
            .strip_prefix(SYNTHETIC_SCHEME)
            .ok_or_else(|| unreadable("not a synthetic locator"))?;
        let parts: Vec<&str> = body.split(':').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(unreadable("expected <color>:<W>x<H>:<duration>[:<fps>]"));
        }

        let color = Rgba8::from_hex(parts[0]).map_err(|e| unreadable(&e.to_string()))?;
        let (w, h) = parts[1]
            .split_once('x')
            .ok_or_else(|| unreadable("size must be <W>x<H>"))?;
        let width = w.parse::<u32>().map_err(|_| unreadable("invalid width"))?;
        let height = h.parse::<u32>().map_err(|_| unreadable("invalid height"))?;
        let resolution = Resolution::new(width, height).map_err(|e| unreadable(&e.to_string()))?;
        let duration = parts[2]
            .parse::<f64>()
            .map_err(|_| unreadable("invalid duration"))?;
        let fps_num = match parts.get(3) {
            Some(s) => s.parse::<u32>().map_err(|_| unreadable("invalid fps"))?,
            None => 30,
        };
        let fps = Fps::new(fps_num, 1).map_err(|e| unreadable(&e.to_string()))?;

        Ok(SyntheticSpec {
            color,
            resolution,
            duration,
            fps,
        })
    }
}

impl MediaBackend for SyntheticBackend {
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe> {
        let spec = Self::parse(locator)?;
        Ok(MediaProbe {
            resolution: spec.resolution,
            duration: spec.duration,
            fps: spec.fps,
        })
    }

    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame> {
        let spec = Self::parse(&asset.locator)
            .map_err(|e| MontageError::decode_unavailable(asset.id, local_time, e.to_string()))?;
        if !(0.0..=spec.duration).contains(&local_time) {
            return Err(MontageError::decode_unavailable(
                asset.id,
                local_time,
                "time outside media duration",
            ));
        }
        Frame::new(
            spec.resolution.width,
            spec.resolution.height,
            PixelFormat::Rgba8,
            spec.color.to_array().repeat(spec.resolution.pixel_count()),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/synthetic.rs"]
mod tests;
