use super::*;
use crate::foundation::core::AssetId;

fn write_png(name: &str, px: [u8; 4], w: u32, h: u32) -> String {
    let dir = std::path::PathBuf::from("target").join("still_backend");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbaImage::from_raw(w, h, px.repeat((w * h) as usize)).unwrap();
    img.save(&path).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn handles_by_extension() {
    assert!(StillImageBackend::handles("a/b/photo.png"));
    assert!(StillImageBackend::handles("photo.JPG"));
    assert!(!StillImageBackend::handles("clip.mp4"));
}

#[test]
fn probe_reports_dimensions_and_configured_duration() {
    let path = write_png("probe.png", [10, 20, 30, 255], 3, 2);
    let backend = StillImageBackend::new(4.0, Fps::new(25, 1).unwrap());
    let probe = backend.probe(&path).unwrap();
    assert_eq!(probe.resolution, Resolution::new(3, 2).unwrap());
    assert_eq!(probe.duration, 4.0);
    assert_eq!(probe.fps, Fps::new(25, 1).unwrap());
}

#[test]
fn decode_premultiplies_and_caches() {
    let path = write_png("decode.png", [200, 100, 0, 128], 2, 2);
    let backend = StillImageBackend::new(1.0, Fps::new(30, 1).unwrap());
    let asset = MediaAsset::from_probe(AssetId(9), &path, backend.probe(&path).unwrap());

    let a = backend.decode_frame_at(&asset, 0.0).unwrap();
    assert_eq!(a.format, PixelFormat::Rgba8Premul);
    assert_eq!(a.pixel(1, 1), Some([100, 50, 0, 128]));

    let b = backend.decode_frame_at(&asset, 0.9).unwrap();
    assert_eq!(a, b);
}

#[test]
fn missing_file_is_unreadable() {
    let backend = StillImageBackend::new(1.0, Fps::new(30, 1).unwrap());
    let err = backend.probe("target/does/not/exist.png").unwrap_err();
    assert!(matches!(err, MontageError::MediaUnreadable { .. }));
}
