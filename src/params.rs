//! Stream descriptors shared by every stage of the playback bridge.
//!
//! `StreamParameters` is computed once when a source is opened and never mutated
//! afterwards. The sample-frame size derived from it is the stride used by the repacker,
//! the frame queue and the output pump alike.

use std::fmt;

/// Sample encodings the bridge can hand to an output device.
///
/// All samples are carried as native-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    U16,
    U32,
    S8,
    S16,
    S32,
    F32,
    F64,
}

impl SampleFormat {
    pub const ALL: [SampleFormat; 8] = [
        SampleFormat::U8,
        SampleFormat::U16,
        SampleFormat::U32,
        SampleFormat::S8,
        SampleFormat::S16,
        SampleFormat::S32,
        SampleFormat::F32,
        SampleFormat::F64,
    ];

    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::U16 | SampleFormat::S16 => 2,
            SampleFormat::U32 | SampleFormat::S32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32 | SampleFormat::F64)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::U16 => "u16",
            SampleFormat::U32 => "u32",
            SampleFormat::S8 => "s8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Immutable description of an open audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParameters {
    channels: u16,
    sample_format: SampleFormat,
    planar: bool,
    sample_rate: u32,
    buffer_frames: u32,
}

impl StreamParameters {
    /// `channels` must be non-zero; a zero-channel stream has no sample-frame to speak of.
    pub fn new(
        channels: u16,
        sample_format: SampleFormat,
        planar: bool,
        sample_rate: u32,
        buffer_frames: u32,
    ) -> Option<Self> {
        if channels == 0 {
            return None;
        }

        Some(Self {
            channels,
            sample_format,
            planar,
            sample_rate,
            buffer_frames,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    /// Whether decoded frames arrive as one plane per channel.
    pub fn is_planar(&self) -> bool {
        self.planar
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames the output device is asked to pull per callback.
    pub fn buffer_frames(&self) -> u32 {
        self.buffer_frames
    }

    /// Size in bytes of one interleaved sample-frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * self.bytes_per_sample()
    }
}
