use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::assets::catalog::MediaCatalog;
use crate::assets::synthetic::SyntheticBackend;
use crate::composition::clip::ClipSpec;
use crate::foundation::core::Rgba8;

fn timeline(duration: f64) -> Timeline {
    let cat = MediaCatalog::new(Arc::new(SyntheticBackend));
    let mut tl = Timeline::new();
    let layer = tl.create_layer();
    tl.add_clip(
        layer,
        ClipSpec::solid(Rgba8::WHITE).at(0.0).lasting(duration),
        &cat,
    )
    .unwrap();
    tl
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[test]
fn state_transitions() {
    let tl = timeline(10.0);
    let mut pc = PlaybackController::default();
    let t0 = Instant::now();
    assert_eq!(pc.state(), PlaybackState::Stopped);
    assert!(!pc.pause());

    assert!(pc.play(&tl, t0));
    assert!(pc.is_playing());
    assert!(!pc.play(&tl, t0));

    assert!(pc.pause());
    assert_eq!(pc.state(), PlaybackState::Paused);
    assert!(pc.play(&tl, t0));

    tl.seek(4.0);
    assert!(pc.stop(&tl));
    assert_eq!(pc.state(), PlaybackState::Stopped);
    assert_eq!(tl.time(), 0.0);
}

#[test]
fn ticks_advance_by_elapsed_wall_clock() {
    let tl = timeline(10.0);
    let mut pc = PlaybackController::default();
    let t0 = Instant::now();
    pc.play(&tl, t0);
    let tick = pc.tick(&tl, t0 + secs(1.5));
    assert!(!tick.state_changed);
    assert!((tick.time - 1.5).abs() < 1e-6);
    let tick = pc.tick(&tl, t0 + secs(2.0));
    assert!((tick.time - 2.0).abs() < 1e-6);
    assert!((tl.time() - 2.0).abs() < 1e-6);
}

#[test]
fn paused_ticks_do_not_move_the_clock() {
    let tl = timeline(10.0);
    let mut pc = PlaybackController::default();
    let t0 = Instant::now();
    pc.play(&tl, t0);
    pc.tick(&tl, t0 + secs(1.0));
    pc.pause();
    let tick = pc.tick(&tl, t0 + secs(5.0));
    assert!((tick.time - 1.0).abs() < 1e-6);

    // Time spent paused is not counted after resuming.
    pc.play(&tl, t0 + secs(5.0));
    let tick = pc.tick(&tl, t0 + secs(5.5));
    assert!((tick.time - 1.5).abs() < 1e-6);
}

#[test]
fn reaching_the_end_stops_and_rewinds_by_default() {
    let tl = timeline(5.0);
    let mut pc = PlaybackController::default();
    let t0 = Instant::now();
    pc.play(&tl, t0);
    pc.tick(&tl, t0 + secs(4.0));
    let tick = pc.tick(&tl, t0 + secs(6.0));
    assert!(tick.state_changed);
    assert_eq!(tick.time, 0.0);
    assert_eq!(pc.state(), PlaybackState::Stopped);
    assert_eq!(tl.time(), 0.0);
}

#[test]
fn hold_last_frame_stops_on_the_end() {
    let tl = timeline(5.0);
    let mut pc = PlaybackController::new(EndBehavior::HoldLastFrame);
    let t0 = Instant::now();
    pc.play(&tl, t0);
    let tick = pc.tick(&tl, t0 + secs(7.0));
    assert!(tick.state_changed);
    assert_eq!(tl.time(), 5.0);
    assert_eq!(pc.state(), PlaybackState::Stopped);

    // Playing again from the end rewinds first.
    pc.play(&tl, t0 + secs(8.0));
    assert_eq!(tl.time(), 0.0);
}

#[test]
fn loop_wraps_around() {
    let tl = timeline(5.0);
    let mut pc = PlaybackController::new(EndBehavior::Loop);
    let t0 = Instant::now();
    pc.play(&tl, t0);
    let tick = pc.tick(&tl, t0 + secs(6.0));
    assert!(!tick.state_changed);
    assert!(pc.is_playing());
    assert!((tick.time - 1.0).abs() < 1e-6);
}

#[test]
fn end_behavior_parses_aliases() {
    assert_eq!(EndBehavior::parse("loop"), Some(EndBehavior::Loop));
    assert_eq!(
        EndBehavior::parse("Hold-Last-Frame"),
        Some(EndBehavior::HoldLastFrame)
    );
    assert_eq!(
        EndBehavior::parse("stop_and_rewind"),
        Some(EndBehavior::StopAndRewind)
    );
    assert_eq!(EndBehavior::parse("bounce"), None);
}
