//! Scenario tests for SessionController
//!
//! Drives the controller against fake platform capabilities with simulated
//! time:
//! - Natural end with and without repeat
//! - Speech fallback and unrecoverable sources
//! - Pause, seek, stop and completion policy
//! - Interruption and route recovery
//! - Grant and live source bookkeeping

mod common;

use common::{audio_session, backend_with, FakeBackend, Harness};
use hush_core::PlayableSession;
use hush_playback::{
    AppLifecycle, ControlEvent, InterruptionSignal, PlaybackConfig, PlaybackError, PlaybackEvent,
    PlaybackState, RemoteCommand, RouteChangeReason, Volume,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ============================================================================
// Natural end
// ============================================================================

#[test]
fn ten_minute_session_completes_then_idles() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    assert_eq!(h.state(), PlaybackState::Playing);

    h.advance(605.0);

    assert_eq!(h.state(), PlaybackState::Idle);
    assert_eq!(
        h.states(),
        vec![
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Completed,
            PlaybackState::Idle
        ]
    );

    let completions = h.completions();
    assert_eq!(completions.len(), 1);
    let played = completions[0].duration_played.as_secs_f64();
    assert!((played - 600.0).abs() <= 1.0, "played {played}");

    // Idle invariants
    assert_eq!(h.backend.live_sources(), 0);
    assert_eq!(h.grants.lock().unwrap().outstanding(), 0);
    assert_eq!(h.controller.progress().current_time, Duration::ZERO);
    assert_eq!(h.controller.progress().normalized, 0.0);
}

#[test]
fn further_ticks_after_natural_end_do_not_record_again() {
    let mut h = Harness::new(backend_with("calm", 60));
    h.start(audio_session("calm", 60), None);

    h.advance(61.0);
    for _ in 0..10 {
        h.event(ControlEvent::Tick);
    }
    h.controller.stop();

    assert_eq!(h.completions().len(), 1);
}

#[test]
fn repeat_loops_into_a_new_episode() {
    let mut h = Harness::new(backend_with("loop", 600));
    h.controller.set_repeat_enabled(true);
    h.start(audio_session("loop", 600), None);
    let first = h.controller.episode();

    h.advance(605.0);
    assert_eq!(h.state(), PlaybackState::Playing);
    assert_ne!(h.controller.episode(), first);
    assert_eq!(
        h.states(),
        vec![
            PlaybackState::Loading,
            PlaybackState::Playing,
            PlaybackState::Completed,
            PlaybackState::Loading,
            PlaybackState::Playing
        ]
    );

    h.advance(600.0);
    let completions = h.completions();
    assert_eq!(completions.len(), 2);
    let ids: HashSet<_> = completions.iter().map(|r| r.record_id).collect();
    assert_eq!(ids.len(), 2);

    // The grant is kept across loops
    let grants = h.grants.lock().unwrap();
    assert_eq!(grants.acquired, 1);
    assert_eq!(grants.released, 0);
    drop(grants);
    assert_eq!(h.backend.live_sources(), 1);
}

#[test]
fn completion_resets_last_offset() {
    let mut h = Harness::new(backend_with("calm", 30));
    h.start(audio_session("calm", 30), None);
    h.advance(31.0);

    assert_eq!(
        h.offset_writes(),
        vec![secs(10), secs(20), Duration::ZERO]
    );
}

// ============================================================================
// Source selection
// ============================================================================

#[test]
fn missing_audio_falls_back_to_speech() {
    let transcript = "a".repeat(140);
    let session = PlayableSession::new("talk", "Talk", PathBuf::from("/audio/gone.m4a"))
        .with_transcript(transcript.clone());
    let mut h = Harness::new(FakeBackend::new());

    h.start(session, None);
    assert_eq!(h.state(), PlaybackState::Playing);
    assert!(h.controller.is_speech_active());
    assert!(h.controller.grant_held());
    assert_eq!(h.backend.speech()[0].state().transcript, transcript);
    assert_eq!(h.controller.progress().duration, secs(10));

    assert_eq!(
        h.states(),
        vec![
            PlaybackState::Loading,
            PlaybackState::Loading,
            PlaybackState::Playing
        ]
    );

    // 140 chars at 14 chars/s
    h.advance(10.0);
    assert_eq!(h.state(), PlaybackState::Idle);
    assert_eq!(h.completions().len(), 1);
    assert!(!h.states().contains(&PlaybackState::Failed));
}

#[test]
fn speech_clock_stops_while_paused() {
    let session = PlayableSession::new("talk", "Talk", PathBuf::from("/audio/gone.m4a"))
        .with_transcript("b".repeat(280));
    let mut h = Harness::new(FakeBackend::new());
    h.start(session, None);

    h.advance(5.0);
    h.controller.pause();
    h.advance(5.0);
    assert_eq!(h.controller.progress().current_time, secs(5));

    h.controller.resume();
    h.advance(5.0);
    assert_eq!(h.controller.progress().current_time, secs(10));
}

#[test]
fn missing_audio_without_transcript_fails_without_grant() {
    let mut h = Harness::new(FakeBackend::new());
    h.start(audio_session("gone", 600), None);

    assert_eq!(h.state(), PlaybackState::Failed);
    assert!(matches!(
        h.controller.last_error(),
        Some(PlaybackError::SourceUnavailable(_))
    ));
    assert_eq!(h.grants.lock().unwrap().acquired, 0);
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Error { .. })));

    h.controller.acknowledge();
    assert_eq!(h.state(), PlaybackState::Idle);
}

#[test]
fn failed_synthesis_fails_the_episode() {
    let session = PlayableSession::new("talk", "Talk", PathBuf::from("/audio/gone.m4a"))
        .with_transcript("Breathe.");
    let mut h = Harness::new(FakeBackend::new().failing_synthesis());
    h.start(session, None);

    assert_eq!(h.state(), PlaybackState::Failed);
    assert_eq!(h.grants.lock().unwrap().acquired, 0);
}

#[test]
fn denied_grant_aborts_start() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.grants.lock().unwrap().deny = true;
    h.start(audio_session("calm", 600), None);

    assert_eq!(h.state(), PlaybackState::Failed);
    assert!(matches!(
        h.controller.last_error(),
        Some(PlaybackError::GrantDenied(_))
    ));
    assert_eq!(h.backend.live_sources(), 0);
    assert!(!h.states().contains(&PlaybackState::Playing));
}

#[test]
fn restart_replaces_the_live_source() {
    let backend = backend_with("a", 600).with_file("/audio/b.m4a", Some(secs(300)));
    let mut h = Harness::new(backend);

    h.start(audio_session("a", 600), None);
    h.advance(5.0);
    h.start(audio_session("b", 300), None);

    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.backend.live_sources(), 1);
    assert!(h.backend.audio()[0].state().closed);
    assert_eq!(h.grants.lock().unwrap().outstanding(), 1);
    assert_eq!(h.controller.progress().duration, secs(300));
}

#[test]
fn resumes_from_last_offset() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600).with_last_offset(secs(120)), None);

    assert_eq!(h.controller.progress().current_time, secs(120));
    assert_eq!(h.backend.audio()[0].state().seeks, vec![secs(120)]);
}

// ============================================================================
// Transport
// ============================================================================

#[test]
fn pausing_twice_equals_pausing_once() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.controller.pause();
    let once = (h.state(), h.controller.progress());
    h.controller.pause();

    assert_eq!((h.state(), h.controller.progress()), once);
    assert_eq!(h.state(), PlaybackState::Paused);
    assert_eq!(h.grants.lock().unwrap().released, 1);
    assert!(!h.backend.audio()[0].state().playing);
}

#[test]
fn seek_round_trip() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.advance(10.0);

    h.controller.seek(secs(123)).unwrap();
    assert_eq!(h.controller.progress().current_time, secs(123));
    assert_eq!(h.published().last().unwrap().elapsed, secs(123));

    h.advance(0.5);
    assert_eq!(
        h.controller.progress().current_time,
        Duration::from_millis(123_500)
    );
}

#[test]
fn seek_clamps_to_duration() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.controller.seek(secs(9_000)).unwrap();
    assert_eq!(h.controller.progress().current_time, secs(600));
    assert_eq!(h.controller.progress().normalized, 1.0);
}

#[test]
fn audio_without_duration_is_not_seekable() {
    let session = PlayableSession::new("open", "Open", PathBuf::from("/audio/open.m4a"));
    let mut h = Harness::new(FakeBackend::new().with_file("/audio/open.m4a", None));
    h.start(session, None);

    assert_eq!(
        h.controller.seek(secs(30)),
        Err(PlaybackError::NotSeekable)
    );
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn skip_intervals_move_the_playhead() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.controller.skip_forward(secs(15)).unwrap();
    h.controller.skip_forward(secs(15)).unwrap();
    h.controller.skip_backward(secs(45)).unwrap();

    assert_eq!(h.controller.progress().current_time, Duration::ZERO);
}

#[test]
fn stop_past_threshold_counts_as_complete() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.advance(2.0);
    h.controller.seek(secs(560)).unwrap();
    h.controller.set_pending_rating(4);
    h.controller.stop();

    let completions = h.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].rating, Some(4));
    assert_eq!(h.state(), PlaybackState::Idle);
}

#[test]
fn stop_before_threshold_records_nothing() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.controller.seek(secs(300)).unwrap();
    h.controller.stop();

    assert!(h.completions().is_empty());
    assert_eq!(h.grants.lock().unwrap().outstanding(), 0);
    assert_eq!(h.backend.live_sources(), 0);
}

#[test]
fn volume_reaches_the_live_source() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.controller.set_volume(0.5);
    h.start(audio_session("calm", 600), None);

    let expected = Volume::new(0.5).gain();
    assert!((h.backend.audio()[0].state().gain - expected).abs() < f32::EPSILON);

    assert!(h.controller.toggle_mute());
    assert_eq!(h.backend.audio()[0].state().gain, 0.0);
    assert!(!h.controller.toggle_mute());
    assert!((h.controller.volume() - 0.5).abs() < f32::EPSILON);
}

// ============================================================================
// Progress and now playing
// ============================================================================

#[test]
fn offset_is_persisted_every_ten_seconds() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.advance(30.0);
    assert_eq!(h.offset_writes(), vec![secs(10), secs(20), secs(30)]);
}

#[test]
fn now_playing_refreshes_every_five_seconds() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.advance(20.0);
    let elapsed: Vec<_> = h.published().iter().map(|np| np.elapsed).collect();
    assert_eq!(
        elapsed,
        vec![Duration::ZERO, secs(5), secs(10), secs(15), secs(20)]
    );

    h.controller.pause();
    let last = h.published().last().cloned().unwrap();
    assert_eq!(last.rate, 0.0);
    assert_eq!(last.title, "Session calm");
    assert_eq!(last.subtitle.as_deref(), Some("Guided"));
}

#[test]
fn stop_clears_now_playing() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.controller.stop();

    assert_eq!(h.surface.lock().unwrap().last(), Some(&None));
}

// ============================================================================
// Interruptions, routes, lifecycle, remote
// ============================================================================

#[test]
fn interruption_recovery() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.event(ControlEvent::Interruption(InterruptionSignal::Began));
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(h.controller.grant_held());

    h.event(ControlEvent::Interruption(InterruptionSignal::Ended {
        should_resume: true,
    }));
    assert_eq!(h.state(), PlaybackState::Playing);

    h.event(ControlEvent::Interruption(InterruptionSignal::Began));
    h.event(ControlEvent::Interruption(InterruptionSignal::Ended {
        should_resume: false,
    }));
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn interruption_end_does_not_resume_a_user_pause() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.controller.pause();

    h.event(ControlEvent::Interruption(InterruptionSignal::Began));
    h.event(ControlEvent::Interruption(InterruptionSignal::Ended {
        should_resume: true,
    }));
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn losing_the_output_device_pauses_and_releases_grant() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.event(ControlEvent::RouteChanged(RouteChangeReason::NewDeviceAvailable));
    assert_eq!(h.state(), PlaybackState::Playing);

    h.event(ControlEvent::RouteChanged(RouteChangeReason::DeviceUnavailable));
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(!h.controller.grant_held());

    h.controller.resume();
    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.grants.lock().unwrap().acquired, 2);
}

#[test]
fn lifecycle_changes_never_transition() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.event(ControlEvent::Lifecycle(AppLifecycle::Background));
    assert_eq!(h.state(), PlaybackState::Playing);
    h.controller.pause();
    h.event(ControlEvent::Lifecycle(AppLifecycle::Foreground));
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn remote_commands_are_dropped_while_idle() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.event(ControlEvent::Remote(RemoteCommand::Play));
    h.event(ControlEvent::Remote(RemoteCommand::SkipForward(Some(secs(15)))));

    assert_eq!(h.state(), PlaybackState::Idle);
    assert!(h.events().is_empty());
}

#[test]
fn remote_skip_forward_moves_playhead() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);

    h.event(ControlEvent::Remote(RemoteCommand::SkipForward(Some(secs(15)))));
    assert_eq!(h.controller.progress().current_time, secs(15));

    h.event(ControlEvent::Remote(RemoteCommand::Pause));
    assert_eq!(h.state(), PlaybackState::Paused);
    h.event(ControlEvent::Remote(RemoteCommand::Play));
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn remote_skip_without_interval_uses_configured_default() {
    let config = PlaybackConfig {
        skip_interval: secs(30),
        ..PlaybackConfig::default()
    };
    let mut h = Harness::with_config(backend_with("calm", 600), config);
    h.start(audio_session("calm", 600), None);

    h.event(ControlEvent::Remote(RemoteCommand::SkipForward(None)));
    assert_eq!(h.controller.progress().current_time, secs(30));
    h.event(ControlEvent::Remote(RemoteCommand::SkipForward(None)));
    h.event(ControlEvent::Remote(RemoteCommand::SkipBackward(None)));
    assert_eq!(h.controller.progress().current_time, secs(30));
    h.event(ControlEvent::Remote(RemoteCommand::SkipBackward(Some(secs(10)))));
    assert_eq!(h.controller.progress().current_time, secs(20));
}

#[test]
fn buffering_stalls_progress() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.advance(2.0);

    h.event(ControlEvent::BufferUnderrun);
    assert_eq!(h.state(), PlaybackState::Buffering);
    h.event(ControlEvent::Tick);
    assert_eq!(h.controller.progress().current_time, secs(2));

    h.event(ControlEvent::BufferRecovered);
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn buffering_transitions_republish_now_playing() {
    let mut h = Harness::new(backend_with("calm", 600));
    h.start(audio_session("calm", 600), None);
    h.advance(2.0);
    let before = h.published().len();

    h.event(ControlEvent::BufferUnderrun);
    let stalled = h.published();
    assert_eq!(stalled.len(), before + 1);
    assert_eq!(stalled.last().unwrap().rate, 0.0);

    h.event(ControlEvent::BufferRecovered);
    let recovered = h.published();
    assert_eq!(recovered.len(), before + 2);
    assert_eq!(recovered.last().unwrap().rate, 1.0);
    assert_eq!(recovered.last().unwrap().elapsed, secs(2));
}
