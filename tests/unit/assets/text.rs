use super::*;

fn local_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .into_iter()
    .find_map(|path| std::fs::read(path).ok())
}

fn shape_with(engine: &mut TextLayoutEngine, face: &FontFace) -> ShapedText {
    engine
        .shape(
            "Ag",
            face,
            16.0,
            TextBrushRgba8::default(),
            None,
            TextAlign::Left,
        )
        .unwrap()
}

#[test]
fn align_offset_distributes_free_space() {
    assert_eq!(align_offset(40.0, 100.0, TextAlign::Left), 0.0);
    assert_eq!(align_offset(40.0, 100.0, TextAlign::Center), 30.0);
    assert_eq!(align_offset(40.0, 100.0, TextAlign::Right), 60.0);
}

#[test]
fn align_offset_never_goes_negative() {
    for align in [TextAlign::Left, TextAlign::Center, TextAlign::Right] {
        assert_eq!(align_offset(120.0, 100.0, align), 0.0);
    }
}

#[test]
fn font_set_falls_back_to_other_weight() {
    let mut fonts = FontSet::default();
    assert!(fonts.is_empty());
    assert!(fonts.face(FontWeight::Bold).is_none());

    fonts.set(FontWeight::Normal, vec![1, 2, 3]);
    assert!(!fonts.is_empty());
    assert_eq!(fonts.face(FontWeight::Bold).unwrap().bytes(), &[1, 2, 3]);

    fonts.set(FontWeight::Bold, vec![9]);
    assert_eq!(fonts.face(FontWeight::Bold).unwrap().bytes(), &[9]);
    assert_eq!(fonts.face(FontWeight::Normal).unwrap().bytes(), &[1, 2, 3]);
}

#[test]
fn shape_rejects_bad_font_size_before_touching_fonts() {
    let mut engine = TextLayoutEngine::new();
    let face = FontFace::new(Vec::new());
    let err = engine
        .shape(
            "hi",
            &face,
            0.0,
            TextBrushRgba8::default(),
            None,
            TextAlign::Left,
        )
        .err()
        .unwrap();
    assert!(matches!(err, MontageError::Validation(_)));
}

#[test]
fn garbage_font_bytes_are_rejected() {
    let mut engine = TextLayoutEngine::new();
    let face = FontFace::new(b"not a font".to_vec());
    let res = engine.shape(
        "hi",
        &face,
        16.0,
        TextBrushRgba8::from(Rgba8::WHITE),
        Some(100.0),
        TextAlign::Center,
    );
    assert!(res.is_err());
}

#[test]
fn faces_get_fresh_ids_even_for_equal_bytes() {
    let a = FontFace::new(vec![1, 2, 3]);
    let b = FontFace::new(vec![1, 2, 3]);
    assert_ne!(a.id(), b.id());
    assert_eq!(a.clone().id(), a.id());

    let mut fonts = FontSet::default();
    fonts.set_face(FontWeight::Normal, a.clone());
    assert_eq!(fonts.face(FontWeight::Normal).unwrap().id(), a.id());
    fonts.set(FontWeight::Normal, vec![1, 2, 3]);
    assert_ne!(fonts.face(FontWeight::Normal).unwrap().id(), a.id());
}

#[test]
fn replaced_faces_are_not_reused_with_local_font_if_present() {
    let Some(bytes) = local_font() else {
        return;
    };
    let mut engine = TextLayoutEngine::new();
    let first = FontFace::new(bytes.clone());
    shape_with(&mut engine, &first);
    shape_with(&mut engine, &first);
    assert_eq!(engine.cached_faces(), 1);

    let mut fonts = FontSet::default();
    fonts.set_face(FontWeight::Normal, first.clone());
    engine.retain_faces(&fonts);
    assert_eq!(engine.cached_faces(), 1);

    let second = FontFace::new(bytes);
    fonts.set_face(FontWeight::Normal, second.clone());
    drop(first);
    engine.retain_faces(&fonts);
    assert_eq!(engine.cached_faces(), 0);

    let shaped = shape_with(&mut engine, &second);
    assert_eq!(engine.cached_faces(), 1);
    assert!(shaped.width > 0.0);
    assert!(shaped.height > 0.0);
}
