//! Integration tests for an interactive playback session.
//!
//! Drives simulated players built from a `TrackList` through the
//! coordinator on a paused tokio clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use layerloop_audio::{
    perceptual_gain, AudioPlayer, PlaybackCoordinator, PlayerBackend, SimulatedPlayer,
};
use layerloop_core::{ErrorKind, PlaybackConfig, SourceHandle};
use layerloop_timeline::{Track, TrackList};
use tokio::time::advance;
use uuid::Uuid;

// ── Helpers ────────────────────────────────────────────────────

struct Session {
    tracks: TrackList,
    coordinator: PlaybackCoordinator,
    /// Track id -> coordinator handle id.
    handles: HashMap<Uuid, Uuid>,
}

impl Session {
    fn new() -> Self {
        Self {
            tracks: TrackList::new(),
            coordinator: PlaybackCoordinator::with_config(PlaybackConfig {
                drift_tolerance_ms: 50.0,
            }),
            handles: HashMap::new(),
        }
    }

    async fn add(&mut self, name: &str, duration_ms: f64) -> Uuid {
        let track = Track::new(name, SourceHandle::file(format!("{name}.wav")), duration_ms);
        let player = PlayerBackend::Simulated.create_loaded(&track).await.unwrap();
        let handle = self.coordinator.add_track_and_sync(player).await;
        let id = self.tracks.push(track);
        self.handles.insert(id, handle);
        id
    }

    fn remove(&mut self, id: Uuid) {
        for removed in self.tracks.remove(id) {
            if let Some(handle) = self.handles.remove(&removed.id) {
                self.coordinator.remove_track(handle);
            }
        }
    }
}

async fn advance_ms(ms: u64) {
    advance(Duration::from_millis(ms)).await;
}

fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1.0
}

// ── Transport ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn session_plays_in_lockstep() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    session.add("bass", 4_000.0).await;
    session.add("keys", 2_500.0).await;

    let report = session.coordinator.play_all().await;
    assert!(report.all_succeeded());
    assert!(session.coordinator.is_playing().await);

    advance_ms(1_500).await;
    assert!(approx(session.coordinator.position().await, 1_500.0));
    assert!(session.coordinator.drift().await < 1.0);

    session.coordinator.pause_all().await;
    advance_ms(1_000).await;
    assert!(!session.coordinator.is_playing().await);
    assert!(approx(session.coordinator.position().await, 1_500.0));
}

#[tokio::test(start_paused = true)]
async fn stop_resets_every_handle() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    session.add("bass", 4_000.0).await;
    session.coordinator.play_all().await;
    advance_ms(700).await;

    session.coordinator.stop_all().await;
    assert!(!session.coordinator.is_playing().await);
    assert_eq!(session.coordinator.position().await, 0.0);
    assert!(session.coordinator.playing_tracks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn looping_handles_wrap_at_their_own_length() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    let bass = session.add("bass", 4_000.0).await;
    session.coordinator.set_looping_all(true).await;
    session.coordinator.play_all().await;

    advance_ms(5_000).await;
    let positions: HashMap<Uuid, f64> = session.coordinator.positions().await.into_iter().collect();
    let bass_handle = session.handles[&bass];
    assert!(approx(positions[&bass_handle], 1_000.0));
}

// ── Drift and resync ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn speed_mismatch_is_resynced_to_mean() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    let bass = session.add("bass", 4_000.0).await;
    session.coordinator.play_all().await;
    advance_ms(1_000).await;

    let bass_handle = session.handles[&bass];
    session.coordinator.set_track_speed(bass_handle, 2.0).await.unwrap();
    advance_ms(500).await;

    // drums at 1500, bass at 2000
    assert!(approx(session.coordinator.drift().await, 500.0));
    assert!(session.coordinator.resync_if_drifting().await);
    assert_eq!(session.coordinator.drift().await, 0.0);
    assert!(approx(session.coordinator.position().await, 1_750.0));

    // Within tolerance nothing happens.
    assert!(!session.coordinator.resync_if_drifting().await);
}

#[tokio::test(start_paused = true)]
async fn late_track_joins_at_session_position() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    session.coordinator.play_all().await;
    advance_ms(2_000).await;

    let keys = session.add("keys", 8_000.0).await;
    let handle = session.handles[&keys];
    let player = session.coordinator.player(handle).unwrap();
    assert!(player.is_playing().await.unwrap());
    assert!(approx(player.position().await.unwrap(), 2_000.0));
    assert!(session.coordinator.drift().await < 1.0);
}

#[tokio::test(start_paused = true)]
async fn track_added_while_paused_stays_paused() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    let keys = session.add("keys", 8_000.0).await;

    let player = session.coordinator.player(session.handles[&keys]).unwrap();
    assert!(!player.is_playing().await.unwrap());
    assert_eq!(player.position().await.unwrap(), 0.0);
}

// ── Failure isolation ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unloaded_handle_does_not_block_the_rest() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    session.add("bass", 4_000.0).await;
    let broken = session
        .coordinator
        .add_track(Arc::new(SimulatedPlayer::new(3_000.0)));

    assert!(!session.coordinator.all_tracks_loaded().await);
    let report = session.coordinator.play_all().await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.failed, vec![(broken, ErrorKind::PlaybackFailed)]);
    assert_eq!(session.coordinator.playing_tracks().len(), 2);
    assert!(session.coordinator.is_playing().await);
}

#[tokio::test(start_paused = true)]
async fn volume_is_validated_then_tapered() {
    let mut session = Session::new();
    let drums = session.add("drums", 10_000.0).await;
    let handle = session.handles[&drums];

    let err = session
        .coordinator
        .set_track_volume(handle, 140.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    session.coordinator.set_track_volume(handle, 100.0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn track_controls_reach_the_player() {
    let mut session = Session::new();
    session.add("drums", 10_000.0).await;
    let player = Arc::new(SimulatedPlayer::new(4_000.0));
    player.load(&SourceHandle::file("bass.wav")).await.unwrap();
    let handle = session.coordinator.add_track(player.clone());

    session.coordinator.set_track_volume(handle, 50.0).await.unwrap();
    assert_eq!(player.gain(), perceptual_gain(50.0));
    assert!(player.gain() < 0.5);

    session.coordinator.set_track_speed(handle, 1.5).await.unwrap();
    assert_eq!(player.speed(), 1.5);
    // Out-of-range speeds fall back to normal playback.
    session.coordinator.set_track_speed(handle, 9.0).await.unwrap();
    assert_eq!(player.speed(), 1.0);
}

// ── Master cascade ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn removing_master_empties_coordinator() {
    let mut session = Session::new();
    let drums = session.add("drums", 10_000.0).await;
    let bass = session.add("bass", 4_000.0).await;
    session.add("keys", 2_500.0).await;

    session.remove(bass);
    assert_eq!(session.coordinator.len(), 2);

    session.remove(drums);
    assert!(session.tracks.is_empty());
    assert!(session.coordinator.is_empty());
    assert!(session.coordinator.all_tracks_loaded().await);
}
