use crate::assets::ffmpeg::FfmpegBackend;
use crate::assets::media::{MediaAsset, MediaBackend, MediaProbe};
use crate::assets::still::StillImageBackend;
use crate::assets::synthetic::SyntheticBackend;
use crate::foundation::core::Fps;
use crate::foundation::error::MontageResult;
use crate::render::frame::Frame;

/// Back end dispatching on the locator: synthetic scheme, image extension, otherwise `ffmpeg`.
pub struct RoutingBackend {
    synthetic: SyntheticBackend,
    still: StillImageBackend,
    video: FfmpegBackend,
}

impl RoutingBackend {
    /// Stills are presented as `still_duration` seconds on a `fps` grid.
    pub fn new(still_duration: f64, fps: Fps) -> Self {
        Self {
            synthetic: SyntheticBackend,
            still: StillImageBackend::new(still_duration, fps),
            video: FfmpegBackend,
        }
    }

    fn route(&self, locator: &str) -> &dyn MediaBackend {
        if SyntheticBackend::handles(locator) {
            &self.synthetic
        } else if StillImageBackend::handles(locator) {
            &self.still
        } else {
            &self.video
        }
    }
}

impl MediaBackend for RoutingBackend {
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe> {
        self.route(locator).probe(locator)
    }

    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame> {
        self.route(&asset.locator).decode_frame_at(asset, local_time)
    }
}
