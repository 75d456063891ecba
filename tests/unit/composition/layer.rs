use super::*;
use crate::composition::clip::{ClipKind, ClipStyle};
use crate::composition::transition::TransitionSpec;
use crate::foundation::core::Rgba8;

fn solid(id: u64, start: f64, duration: f64) -> Clip {
    Clip {
        id: ClipId(id),
        kind: ClipKind::Solid {
            color: Rgba8::BLACK,
        },
        start,
        duration,
        trim: None,
        style: ClipStyle::default(),
    }
}

fn crossfade(id: u64, from: u64, to: u64, in_d: f64, out_d: f64) -> Transition {
    Transition::from_spec(
        TransitionId(id),
        TransitionSpec::new(ClipId(from), ClipId(to), in_d, out_d),
    )
    .unwrap()
}

fn two_abutting() -> Layer {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 3.0)).unwrap();
    layer.add_clip(solid(2, 3.0, 3.0)).unwrap();
    layer
}

#[test]
fn clips_are_kept_in_start_order() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(3, 10.0, 1.0)).unwrap();
    layer.add_clip(solid(1, 0.0, 1.0)).unwrap();
    layer.add_clip(solid(2, 5.0, 1.0)).unwrap();
    assert_eq!(layer.clip_ids(), vec![ClipId(1), ClipId(2), ClipId(3)]);
    assert_eq!(layer.end(), 11.0);
    assert_eq!(layer.append_start(), 11.0);
    layer.check_invariants().unwrap();
}

#[test]
fn overlapping_clip_is_rejected_and_layer_unchanged() {
    let mut layer = two_abutting();
    let err = layer.add_clip(solid(9, 2.5, 1.0)).unwrap_err();
    assert!(matches!(
        err,
        MontageError::OverlapViolation {
            clip: ClipId(9),
            ..
        }
    ));
    assert_eq!(layer.len(), 2);

    let err = layer.add_clip(solid(9, 0.0, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::OverlapViolation { .. }));
    layer.check_invariants().unwrap();
}

#[test]
fn transition_progress_matches_window() {
    let mut layer = two_abutting();
    layer.add_transition(crossfade(1, 1, 2, 1.0, 1.0)).unwrap();
    layer.check_invariants().unwrap();

    for (t, expected) in [(2.0, 0.0), (3.0, 0.5), (4.0, 1.0)] {
        match layer.resolve_at(t) {
            Some(Active::Transition {
                from, to, progress, ..
            }) => {
                assert_eq!((from.id, to.id), (ClipId(1), ClipId(2)));
                assert_eq!(progress, expected, "t={t}");
            }
            other => panic!("expected transition at t={t}, got {other:?}"),
        }
    }
    assert!(matches!(layer.resolve_at(1.0), Some(Active::Clip(c)) if c.id == ClipId(1)));
    assert!(matches!(layer.resolve_at(5.0), Some(Active::Clip(c)) if c.id == ClipId(2)));
    assert!(layer.resolve_at(6.0).is_none());
    assert!(layer.resolve_at(-0.5).is_none());
}

#[test]
fn resolve_hits_gaps_and_boundaries() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 1.0)).unwrap();
    layer.add_clip(solid(2, 2.0, 1.0)).unwrap();
    assert!(matches!(layer.resolve_at(0.0), Some(Active::Clip(c)) if c.id == ClipId(1)));
    assert!(layer.resolve_at(1.0).is_none());
    assert!(layer.resolve_at(1.5).is_none());
    assert!(matches!(layer.resolve_at(2.0), Some(Active::Clip(c)) if c.id == ClipId(2)));
}

#[test]
fn transition_across_a_gap_blends_in_the_gap() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 2.0)).unwrap();
    layer.add_clip(solid(2, 3.0, 2.0)).unwrap();
    layer.add_transition(crossfade(1, 1, 2, 0.5, 0.5)).unwrap();
    match layer.resolve_at(2.5) {
        Some(Active::Transition { progress, .. }) => assert_eq!(progress, 0.5),
        other => panic!("expected transition, got {other:?}"),
    }
}

#[test]
fn adjacency_rules_are_enforced() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 3.0)).unwrap();
    layer.add_clip(solid(2, 3.0, 3.0)).unwrap();
    layer.add_clip(solid(3, 6.0, 3.0)).unwrap();
    layer.add_clip(solid(4, 20.0, 3.0)).unwrap();

    // Not consecutive.
    let err = layer.add_transition(crossfade(1, 1, 3, 0.5, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    // Wrong order.
    let err = layer.add_transition(crossfade(1, 2, 1, 0.5, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    // Foreign clip.
    let err = layer.add_transition(crossfade(1, 1, 99, 0.5, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    // Gap larger than the window.
    let err = layer.add_transition(crossfade(1, 3, 4, 1.0, 1.0)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));

    layer.add_transition(crossfade(1, 1, 2, 0.5, 0.5)).unwrap();
    let err = layer.add_transition(crossfade(2, 1, 2, 0.5, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    assert_eq!(layer.transitions().count(), 1);
}

#[test]
fn window_longer_than_a_clip_is_duration_exceeded() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 1.0)).unwrap();
    layer.add_clip(solid(2, 1.0, 5.0)).unwrap();
    let err = layer.add_transition(crossfade(1, 1, 2, 1.0, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::DurationExceeded(_)));
    assert_eq!(layer.transitions().count(), 0);
}

#[test]
fn windows_sharing_a_clip_must_not_intersect() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 2.0)).unwrap();
    layer.add_clip(solid(2, 2.0, 2.0)).unwrap();
    layer.add_clip(solid(3, 4.0, 2.0)).unwrap();
    layer.add_transition(crossfade(1, 1, 2, 1.0, 1.0)).unwrap();
    // [2.5, 4.5] would start before the first window [1, 3] ends.
    let err = layer.add_transition(crossfade(2, 2, 3, 1.5, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::DurationExceeded(_)));
    layer.add_transition(crossfade(2, 2, 3, 1.0, 1.0)).unwrap();
    layer.check_invariants().unwrap();
}

#[test]
fn removing_a_clip_cascades_its_transitions() {
    let mut layer = two_abutting();
    layer.add_transition(crossfade(7, 1, 2, 1.0, 1.0)).unwrap();
    let (removed, cascaded) = layer.remove_clip(ClipId(2)).unwrap();
    assert_eq!(removed.id, ClipId(2));
    assert_eq!(cascaded, vec![TransitionId(7)]);
    assert_eq!(layer.transitions().count(), 0);
    assert!(layer.outgoing(ClipId(1)).is_none());
    layer.check_invariants().unwrap();

    assert!(matches!(
        layer.remove_clip(ClipId(2)),
        Err(MontageError::NotFound(_))
    ));
}

#[test]
fn clip_cannot_be_inserted_between_bridged_clips() {
    let mut layer = Layer::new(LayerId(1));
    layer.add_clip(solid(1, 0.0, 2.0)).unwrap();
    layer.add_clip(solid(2, 3.0, 2.0)).unwrap();
    layer.add_transition(crossfade(1, 1, 2, 0.5, 0.5)).unwrap();
    let err = layer.add_clip(solid(3, 2.2, 0.5)).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    assert_eq!(layer.len(), 2);
}

#[test]
fn move_allows_overlap_only_inside_a_window() {
    let mut layer = two_abutting();
    layer.add_transition(crossfade(1, 1, 2, 1.0, 1.0)).unwrap();

    // Overlap [2.5, 3) sits inside the window around the new cut 2.75.
    layer.move_clip(ClipId(2), 2.5).unwrap();
    layer.check_invariants().unwrap();
    assert_eq!(layer.clip(ClipId(2)).unwrap().start, 2.5);
    match layer.resolve_at(2.75) {
        Some(Active::Transition { progress, .. }) => assert!((progress - 0.5).abs() < 1e-9),
        other => panic!("expected transition, got {other:?}"),
    }

    // Overlap [0.5, 3) exceeds the window; the layer is left untouched.
    let err = layer.move_clip(ClipId(2), 0.5).unwrap_err();
    assert!(matches!(err, MontageError::OverlapViolation { .. }));
    assert_eq!(layer.clip(ClipId(2)).unwrap().start, 2.5);
    layer.check_invariants().unwrap();
}

#[test]
fn move_without_transition_cannot_overlap() {
    let mut layer = two_abutting();
    let err = layer.move_clip(ClipId(1), 1.0).unwrap_err();
    assert!(matches!(err, MontageError::OverlapViolation { .. }));
    layer.move_clip(ClipId(1), 10.0).unwrap();
    assert_eq!(layer.clip_ids(), vec![ClipId(2), ClipId(1)]);
    assert_eq!(layer.end(), 13.0);
}

#[test]
fn move_breaking_adjacency_is_rejected() {
    let mut layer = two_abutting();
    layer.add_transition(crossfade(1, 1, 2, 0.5, 0.5)).unwrap();
    let err = layer.move_clip(ClipId(2), 8.0).unwrap_err();
    assert!(matches!(err, MontageError::InvalidAdjacency(_)));
    assert_eq!(layer.clip(ClipId(2)).unwrap().start, 3.0);
}

#[test]
fn resolution_scales_to_many_clips() {
    let mut layer = Layer::new(LayerId(1));
    for i in 0..10_000u64 {
        layer.add_clip(solid(i + 1, i as f64, 1.0)).unwrap();
    }
    for t in [0.0, 1234.5, 9999.9] {
        match layer.resolve_at(t) {
            Some(Active::Clip(c)) => assert!(c.range().contains(t)),
            other => panic!("expected clip at t={t}, got {other:?}"),
        }
    }
}
