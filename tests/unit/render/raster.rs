use super::*;
use crate::composition::clip::{FontWeight, Position, TextAlign};

fn display() -> Resolution {
    Resolution::new(8, 4).unwrap()
}

fn stage() -> Resolution {
    Resolution::new(400, 300).unwrap()
}

fn local_fonts() -> Option<FontSet> {
    let bytes = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .into_iter()
    .find_map(|path| std::fs::read(path).ok())?;
    let mut fonts = FontSet::default();
    fonts.set(FontWeight::Normal, bytes);
    Some(fonts)
}

/// Inclusive `(x0, y0, x1, y1)` of every pixel with nonzero alpha.
fn lit_bounds(frame: &Frame) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..frame.height {
        for x in 0..frame.width {
            if frame.pixel(x, y).is_some_and(|px| px[3] > 0) {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
    }
    bounds
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 1)
}

#[test]
fn contain_letterboxes_and_centers() {
    let bx = Placement {
        x0: 0.0,
        y0: 0.0,
        width: 8.0,
        height: 4.0,
    };
    let (sx, sy, ox, oy) = fit_image(Fit::Contain, 2.0, 2.0, bx);
    assert_eq!((sx, sy), (2.0, 2.0));
    assert_eq!((ox, oy), (2.0, 0.0));
}

#[test]
fn cover_overflows_the_box() {
    let bx = Placement {
        x0: 0.0,
        y0: 0.0,
        width: 8.0,
        height: 4.0,
    };
    let (sx, sy, ox, oy) = fit_image(Fit::Cover, 2.0, 2.0, bx);
    assert_eq!((sx, sy), (4.0, 4.0));
    assert_eq!((ox, oy), (0.0, -2.0));

    let (sx, sy, ..) = fit_image(Fit::Stretch, 2.0, 2.0, bx);
    assert_eq!((sx, sy), (4.0, 2.0));
}

#[test]
fn placement_defaults_to_display_center() {
    let style = ClipStyle::default();
    let bx = Placement::centered(&style, display(), (4.0, 2.0));
    assert_eq!((bx.x0, bx.y0), (2.0, 1.0));

    let style = ClipStyle {
        position: Some(Position::Relative { x: 0.25, y: 0.5 }),
        ..ClipStyle::default()
    };
    let bx = Placement::centered(&style, display(), (2.0, 2.0));
    assert_eq!((bx.x0, bx.y0), (1.0, 1.0));
}

#[test]
fn solid_fills_the_whole_display_by_default() {
    let mut r = Rasterizer::new(display()).unwrap();
    let out = r
        .solid(Rgba8::rgb(255, 0, 0), &ClipStyle::default())
        .unwrap();
    assert_eq!(out.resolution(), display());
    assert_eq!(out.format, PixelFormat::Rgba8Premul);
    assert_eq!(out.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(7, 3), Some([255, 0, 0, 255]));
}

#[test]
fn sized_solid_leaves_the_rest_transparent() {
    let mut r = Rasterizer::new(display()).unwrap();
    let style = ClipStyle {
        size: Some([2.0, 2.0]),
        position: Some(Position::Pixels { x: 1.0, y: 1.0 }),
        ..ClipStyle::default()
    };
    let out = r.solid(Rgba8::rgb(0, 0, 255), &style).unwrap();
    assert_eq!(out.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(out.pixel(1, 1), Some([0, 0, 255, 255]));
    assert_eq!(out.pixel(5, 2), Some([0, 0, 0, 0]));
}

#[test]
fn display_sized_media_is_copied_through() {
    let mut r = Rasterizer::new(display()).unwrap();
    let frame = Frame::solid(display(), Rgba8::new(10, 20, 30, 255));
    let out = r.media(&frame, &ClipStyle::default()).unwrap();
    assert_eq!(out, frame);
}

#[test]
fn straight_media_is_premultiplied() {
    let mut r = Rasterizer::new(display()).unwrap();
    let frame = Frame::new(8, 4, PixelFormat::Rgba8, [255u8, 255, 255, 128].repeat(32)).unwrap();
    let out = r.media(&frame, &ClipStyle::default()).unwrap();
    assert_eq!(out.format, PixelFormat::Rgba8Premul);
    assert_eq!(out.pixel(3, 2), Some([128, 128, 128, 128]));
}

#[test]
fn stretched_media_covers_the_display() {
    let mut r = Rasterizer::new(display()).unwrap();
    let small = Frame::solid(Resolution::new(2, 2).unwrap(), Rgba8::rgb(0, 200, 0));
    let style = ClipStyle {
        fit: Fit::Stretch,
        ..ClipStyle::default()
    };
    let out = r.media(&small, &style).unwrap();
    assert!(close(out.pixel(0, 0).unwrap(), [0, 200, 0, 255]));
    assert!(close(out.pixel(4, 2).unwrap(), [0, 200, 0, 255]));
    assert!(close(out.pixel(7, 3).unwrap(), [0, 200, 0, 255]));
}

#[test]
fn contained_media_is_letterboxed() {
    let mut r = Rasterizer::new(display()).unwrap();
    let small = Frame::solid(Resolution::new(2, 2).unwrap(), Rgba8::rgb(0, 200, 0));
    let out = r.media(&small, &ClipStyle::default()).unwrap();
    assert_eq!(out.pixel(0, 1), Some([0, 0, 0, 0]));
    assert_eq!(out.pixel(7, 1), Some([0, 0, 0, 0]));
    assert!(close(out.pixel(4, 2).unwrap(), [0, 200, 0, 255]));
}

#[test]
fn text_without_fonts_renders_transparent() {
    let mut r = Rasterizer::new(display()).unwrap();
    let style = ClipStyle {
        background: Some(Rgba8::BLACK),
        ..ClipStyle::default()
    };
    let out = r.text("hello", &style, &FontSet::default()).unwrap();
    assert_eq!(out, Frame::transparent(display()));
}

#[test]
fn glyphs_stay_inside_the_placed_box_with_local_font_if_present() {
    let Some(fonts) = local_fonts() else {
        return;
    };
    let mut r = Rasterizer::new(stage()).unwrap();
    let style = ClipStyle {
        position: Some(Position::Pixels { x: 120.0, y: 90.0 }),
        size: Some([200.0, 60.0]),
        ..ClipStyle::default()
    };
    let out = r.text("Hello", &style, &fonts).unwrap();

    let (x0, y0, x1, y1) = lit_bounds(&out).unwrap();
    assert!(x0 >= 20 && x1 < 220, "columns {x0}..={x1}");
    assert!(y0 >= 60 && y1 < 120, "rows {y0}..={y1}");
}

#[test]
fn centered_text_is_symmetric_about_its_position_with_local_font_if_present() {
    let Some(fonts) = local_fonts() else {
        return;
    };
    let mut r = Rasterizer::new(stage()).unwrap();
    let style = ClipStyle {
        position: Some(Position::Pixels { x: 200.0, y: 150.0 }),
        text_align: TextAlign::Center,
        ..ClipStyle::default()
    };
    let out = r.text("HIH", &style, &fonts).unwrap();

    let (x0, _, x1, _) = lit_bounds(&out).unwrap();
    let left = 200.0 - f64::from(x0);
    let right = f64::from(x1 + 1) - 200.0;
    assert!((left - right).abs() <= 3.0, "left {left} right {right}");
}

#[test]
fn word_wrap_breaks_text_onto_more_lines_with_local_font_if_present() {
    let Some(fonts) = local_fonts() else {
        return;
    };
    let mut r = Rasterizer::new(stage()).unwrap();
    let text = "one two three four";
    let single = ClipStyle::default();
    let wrapped = ClipStyle {
        word_wrap_width: Some(120.0),
        ..ClipStyle::default()
    };

    let (sx0, sy0, sx1, sy1) = lit_bounds(&r.text(text, &single, &fonts).unwrap()).unwrap();
    let (wx0, wy0, wx1, wy1) = lit_bounds(&r.text(text, &wrapped, &fonts).unwrap()).unwrap();
    assert!(wy1 - wy0 > 2 * (sy1 - sy0), "wrapped rows {wy0}..={wy1}");
    assert!(wx1 - wx0 < sx1 - sx0);
    assert!(wx1 - wx0 <= 120);
}

#[test]
fn rounded_background_leaves_corners_transparent_with_local_font_if_present() {
    let Some(fonts) = local_fonts() else {
        return;
    };
    let mut r = Rasterizer::new(stage()).unwrap();
    let blue = [0, 0, 255, 255];
    let style = ClipStyle {
        background: Some(Rgba8::new(0, 0, 255, 255)),
        corner_radii: [12.0; 4],
        size: Some([100.0, 60.0]),
        ..ClipStyle::default()
    };
    let out = r.text("x", &style, &fonts).unwrap();

    // Box spans 150..250 by 120..180.
    for (x, y) in [(150, 120), (249, 120), (249, 179), (150, 179)] {
        assert_eq!(out.pixel(x, y).unwrap()[3], 0, "corner ({x}, {y})");
    }
    assert!(close(out.pixel(235, 122).unwrap(), blue));
    assert!(close(out.pixel(165, 177).unwrap(), blue));
    assert_eq!(out.pixel(140, 150), Some([0, 0, 0, 0]));
}

#[test]
fn oversized_display_is_rejected() {
    assert!(Rasterizer::new(Resolution::new(70_000, 4).unwrap()).is_err());
}
