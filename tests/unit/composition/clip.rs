use super::*;
use crate::foundation::core::Fps;

fn asset(duration: f64) -> MediaAsset {
    MediaAsset {
        id: AssetId(1),
        locator: "synthetic:000000:8x8:5".to_string(),
        filename: "clip.mp4".to_string(),
        resolution: Resolution::new(8, 8).unwrap(),
        duration,
        fps: Fps::new(30, 1).unwrap(),
    }
}

#[test]
fn media_spec_without_duration_runs_to_asset_end() {
    let a = asset(5.0);
    let clip = ClipSpec::media(a.id)
        .trimmed(Trim::new(1.5, None))
        .build(ClipId(1), 2.0, Some(&a))
        .unwrap();
    assert_eq!(clip.start, 2.0);
    assert_eq!(clip.duration, 3.5);
    assert_eq!(clip.end(), 5.5);
}

#[test]
fn media_spec_without_duration_respects_trim_end() {
    let a = asset(5.0);
    let clip = ClipSpec::media(a.id)
        .trimmed(Trim::new(1.0, Some(3.0)))
        .at(0.0)
        .build(ClipId(1), 9.0, Some(&a))
        .unwrap();
    assert_eq!(clip.start, 0.0);
    assert_eq!(clip.duration, 2.0);
}

#[test]
fn text_spec_requires_duration() {
    let err = ClipSpec::text("hi").build(ClipId(3), 0.0, None).unwrap_err();
    assert!(matches!(err, MontageError::Validation(_)));
}

#[test]
fn timing_invariants_are_enforced() {
    for (start, duration) in [(-1.0, 1.0), (0.0, 0.0), (0.0, -2.0), (f64::NAN, 1.0)] {
        let res = ClipSpec::solid(Rgba8::BLACK)
            .at(start)
            .lasting(duration)
            .build(ClipId(1), 0.0, None);
        assert!(res.is_err(), "start={start} duration={duration}");
    }
}

#[test]
fn trim_window_must_fit_inside_asset() {
    let a = asset(5.0);
    let err = ClipSpec::media(a.id)
        .trimmed(Trim::new(2.0, None))
        .lasting(4.0)
        .build(ClipId(1), 0.0, Some(&a))
        .unwrap_err();
    assert!(matches!(err, MontageError::Validation(_)));

    ClipSpec::media(a.id)
        .trimmed(Trim::new(2.0, None))
        .lasting(3.0)
        .build(ClipId(1), 0.0, Some(&a))
        .unwrap();
}

#[test]
fn trim_is_rejected_on_synthetic_clips() {
    let err = ClipSpec::text("x")
        .lasting(1.0)
        .trimmed(Trim::new(0.5, None))
        .build(ClipId(1), 0.0, None)
        .unwrap_err();
    assert!(matches!(err, MontageError::Validation(_)));
}

#[test]
fn local_time_is_offset_by_trim_and_clamped() {
    let a = asset(10.0);
    let clip = ClipSpec::media(a.id)
        .at(4.0)
        .lasting(2.0)
        .trimmed(Trim::new(3.0, None))
        .build(ClipId(1), 0.0, Some(&a))
        .unwrap();
    assert_eq!(clip.local_time(5.0), 4.0);
    assert_eq!(clip.local_time(1.0), 3.0);
    assert_eq!(clip.local_time(7.0), 5.0);
}

#[test]
fn relative_position_scales_with_display() {
    let display = Resolution::new(1080, 1920).unwrap();
    let p = Position::Relative { x: 0.5, y: 0.8 };
    assert_eq!(p.to_pixels(display), (540.0, 1536.0));
    assert_eq!(
        Position::Pixels { x: 3.0, y: 4.0 }.to_pixels(display),
        (3.0, 4.0)
    );
}

#[test]
fn style_validation_rejects_out_of_range_values() {
    let bad = [
        ClipStyle {
            font_size: 0.0,
            ..ClipStyle::default()
        },
        ClipStyle {
            corner_radii: [1.0, -1.0, 0.0, 0.0],
            ..ClipStyle::default()
        },
        ClipStyle {
            opacity: 1.5,
            ..ClipStyle::default()
        },
        ClipStyle {
            word_wrap_width: Some(0.0),
            ..ClipStyle::default()
        },
        ClipStyle {
            size: Some([10.0, f64::INFINITY]),
            ..ClipStyle::default()
        },
    ];
    for style in bad {
        assert!(style.validate().is_err(), "{style:?}");
    }
    assert!(ClipStyle::default().validate().is_ok());
}

#[test]
fn style_deserializes_with_defaults_and_hex_colors() {
    let style: ClipStyle = serde_json::from_str(
        r##"{
            "font_size": 64,
            "color": "#FFFFFF",
            "font_weight": "bold",
            "background": "#000000",
            "corner_radii": [20, 20, 20, 20],
            "text_align": "center",
            "position": { "relative": { "x": 0.5, "y": 0.8 } }
        }"##,
    )
    .unwrap();
    assert_eq!(style.font_weight, FontWeight::Bold);
    assert_eq!(style.background, Some(Rgba8::BLACK));
    assert_eq!(style.text_align, TextAlign::Center);
    assert_eq!(style.opacity, 1.0);
    assert_eq!(style.fit, Fit::Contain);
}
