use crate::assets::media::{MediaAsset, MediaBackend, MediaProbe};
#[cfg(feature = "media-ffmpeg")]
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{MontageError, MontageResult};
#[cfg(feature = "media-ffmpeg")]
use crate::render::frame::PixelFormat;
use crate::render::frame::Frame;

/// Back end shelling out to the system `ffprobe`/`ffmpeg` binaries.
///
/// Without the `media-ffmpeg` feature every call fails with a descriptive error.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

#[cfg(feature = "media-ffmpeg")]
fn parse_rate(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/').unwrap_or((s, "1"));
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    (den > 0.0 && num > 0.0).then(|| num / den)
}

#[cfg(feature = "media-ffmpeg")]
impl MediaBackend for FfmpegBackend {
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            avg_frame_rate: Option<String>,
            r_frame_rate: Option<String>,
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            streams: Vec<ProbeStream>,
            format: Option<ProbeFormat>,
        }

        let out = std::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(locator)
            .output()
            .map_err(|e| {
                MontageError::media_unreadable(locator, format!("failed to run ffprobe: {e}"))
            })?;
        if !out.status.success() {
            return Err(MontageError::media_unreadable(
                locator,
                format!(
                    "ffprobe failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout).map_err(|e| {
            MontageError::media_unreadable(locator, format!("ffprobe json parse failed: {e}"))
        })?;
        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| MontageError::media_unreadable(locator, "no video stream found"))?;
        let (Some(width), Some(height)) = (video.width, video.height) else {
            return Err(MontageError::media_unreadable(
                locator,
                "missing video width/height from ffprobe",
            ));
        };
        let rate = video
            .avg_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .or_else(|| video.r_frame_rate.as_deref().and_then(parse_rate))
            .ok_or_else(|| MontageError::media_unreadable(locator, "missing frame rate"))?;
        let duration = video
            .duration
            .as_deref()
            .or_else(|| parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.trim().parse::<f64>().ok())
            .ok_or_else(|| MontageError::media_unreadable(locator, "missing duration"))?;

        let unreadable = |e: MontageError| MontageError::media_unreadable(locator, e.to_string());
        Ok(MediaProbe {
            resolution: Resolution::new(width, height).map_err(unreadable)?,
            duration,
            fps: Fps::from_f64(rate).map_err(unreadable)?,
        })
    }

    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame> {
        let unavailable = |reason: String| {
            MontageError::decode_unavailable(asset.id, local_time, reason)
        };
        let out = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{local_time:.9}")])
            .arg("-i")
            .arg(&asset.locator)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .output()
            .map_err(|e| unavailable(format!("failed to run ffmpeg for video decode: {e}")))?;

        if !out.status.success() {
            return Err(unavailable(format!(
                "ffmpeg video decode failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let expected_len = asset.resolution.pixel_count() * 4;
        if out.stdout.len() < expected_len {
            return Err(unavailable(format!(
                "decoded video frame has invalid size: got {} bytes, expected {expected_len}",
                out.stdout.len()
            )));
        }
        let mut data = out.stdout;
        data.truncate(expected_len);
        Frame::new(
            asset.resolution.width,
            asset.resolution.height,
            PixelFormat::Rgba8,
            data,
        )
    }
}

#[cfg(not(feature = "media-ffmpeg"))]
impl MediaBackend for FfmpegBackend {
    fn probe(&self, locator: &str) -> MontageResult<MediaProbe> {
        Err(MontageError::media_unreadable(
            locator,
            "video sources require the 'media-ffmpeg' feature",
        ))
    }

    fn decode_frame_at(&self, asset: &MediaAsset, local_time: f64) -> MontageResult<Frame> {
        Err(MontageError::decode_unavailable(
            asset.id,
            local_time,
            "video sources require the 'media-ffmpeg' feature",
        ))
    }
}

// No unit tests here: these functions shell out to `ffprobe`/`ffmpeg`.
