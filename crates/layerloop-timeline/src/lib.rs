//! LayerLoop Timeline - Track data model
//!
//! Implements the shared cyclic timeline:
//! - Tracks and the ordered collection whose first element is the master
//! - Loop timing math (master loop duration, loop counts, boundaries)

pub mod loop_math;
pub mod track;

pub use loop_math::{
    is_master_track, loop_boundaries, loop_count, master_loop_duration, master_track,
    normalize_speed, speed_adjusted_duration, track_loop_info, TrackLoopInfo,
};
pub use track::{validate_volume, Track, TrackList};
