//! Integration tests for the track model and loop math.

use layerloop_core::SourceHandle;
use layerloop_timeline::{loop_boundaries, master_loop_duration, Track, TrackList};

// ── Helpers ────────────────────────────────────────────────────

fn track(name: &str, duration_ms: f64) -> Track {
    Track::new(name, SourceHandle::file(format!("loops/{name}.wav")), duration_ms)
}

fn build_session() -> (TrackList, Vec<uuid::Uuid>) {
    let mut list = TrackList::new();
    let ids = vec![
        list.push(track("drums", 10_000.0)),
        list.push(track("bass", 4_000.0)),
        list.push(track("keys", 12_000.0)),
    ];
    (list, ids)
}

// ── Master loop ────────────────────────────────────────────────

#[test]
fn master_loop_follows_first_track_only() {
    let (list, _) = build_session();
    // The longer "keys" track does not change the master cycle.
    assert_eq!(list.master_loop_duration(), 10_000.0);
    assert_eq!(master_loop_duration(list.tracks()), 10_000.0);
}

#[test]
fn master_speed_change_rescales_cycle() {
    let (mut list, ids) = build_session();
    list.set_speed(ids[0], 0.5).unwrap();
    assert_eq!(list.master_loop_duration(), 20_000.0);

    let bass = list.loop_info(ids[1]).unwrap();
    assert_eq!(bass.loop_count, 5);
    assert_eq!(bass.boundaries, vec![0.0, 4_000.0, 8_000.0, 12_000.0, 16_000.0]);
}

#[test]
fn invalid_master_speed_is_unit_for_duration_math() {
    let (mut list, ids) = build_session();
    list.set_speed(ids[0], 0.0).unwrap();
    assert_eq!(list.master_loop_duration(), 10_000.0);
    list.set_speed(ids[0], 3.0).unwrap();
    assert_eq!(list.master_loop_duration(), 10_000.0);
}

// ── Per-track loop geometry ────────────────────────────────────

#[test]
fn short_track_boundaries_inside_master() {
    let (list, ids) = build_session();
    let bass = list.loop_info(ids[1]).unwrap();
    assert_eq!(bass.loop_count, 3);
    assert_eq!(bass.boundaries, vec![0.0, 4_000.0, 8_000.0]);
    assert_eq!(bass.total_duration, 12_000.0);
    assert_eq!(bass.boundaries, loop_boundaries(4_000.0, 10_000.0));
}

#[test]
fn long_track_plays_once() {
    let (list, ids) = build_session();
    let keys = list.loop_info(ids[2]).unwrap();
    assert_eq!(keys.loop_count, 1);
    assert_eq!(keys.boundaries, vec![0.0]);
}

#[test]
fn track_speed_changes_its_geometry() {
    let (mut list, ids) = build_session();
    list.set_speed(ids[1], 2.0).unwrap();
    let bass = list.loop_info(ids[1]).unwrap();
    assert_eq!(bass.loop_count, 5);
    assert_eq!(bass.boundaries.last(), Some(&8_000.0));
}

#[test]
fn master_has_no_loop_info() {
    let (list, ids) = build_session();
    assert!(list.is_master(ids[0]));
    assert!(list.loop_info(ids[0]).is_none());
    assert!(list.loop_info(uuid::Uuid::new_v4()).is_none());
}

// ── Removal ────────────────────────────────────────────────────

#[test]
fn removing_master_clears_session() {
    let (mut list, ids) = build_session();
    let removed = list.remove(ids[0]);
    assert_eq!(removed.len(), 3);
    assert!(list.is_empty());
    assert_eq!(list.master_loop_duration(), 0.0);
}

#[test]
fn removing_other_track_promotes_nothing() {
    let (mut list, ids) = build_session();
    let removed = list.remove(ids[1]);
    assert_eq!(removed.len(), 1);
    assert_eq!(list.len(), 2);
    assert!(list.is_master(ids[0]));
    assert_eq!(list.position_of(ids[2]), Some(1));
}

#[test]
fn volume_outside_range_rejected() {
    let (mut list, ids) = build_session();
    assert!(list.set_volume(ids[1], 101.0).is_err());
    assert!(list.set_volume(ids[1], -1.0).is_err());
    list.set_volume(ids[1], 40.0).unwrap();
    assert_eq!(list.get(ids[1]).unwrap().volume, 40.0);
}
