//! `siren`: a small command-line audio player.
//!
//! This crate provides:
//! - Demuxing and decoding through Symphonia
//! - A streaming bridge from packet decoding to a pull-based audio callback
//! - Audio output through cpal (feature `output`)
//!
//! The bridge is the interesting part: the output device asks for a fixed number of frames
//! per callback, while the decoder yields however many samples each packet happens to hold.
//! The [`pump::OutputPump`] absorbs that mismatch through a [`frame_queue::FrameQueue`].

// Crate-wide error type.
pub mod error;
pub use error::{Error, Result};

// Stream descriptors and configuration.
pub mod opts;
pub mod params;

// Demux/decode collaborators.
pub mod decoder;
pub mod source;

// The streaming bridge.
pub mod adapter;
pub mod frame_queue;
pub mod pump;
pub mod repack;

// Opening files for playback.
pub mod session;

// Logging configuration.
#[cfg(feature = "logging")]
pub mod logging;

// Device output and the playback loop.
#[cfg(feature = "output")]
pub mod output;
#[cfg(feature = "output")]
pub mod player;
