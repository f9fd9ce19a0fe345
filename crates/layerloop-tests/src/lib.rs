//! Integration test crate for LayerLoop.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple layerloop crates to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod mixdown;
