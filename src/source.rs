// src/source.rs

//! Where siren's compressed packets come from.
//!
//! The pump only sees [`PacketSource`]. [`SymphoniaSource`] opens a container, settles on
//! one audio track and then hands out its packets (and any other track's) in file order.
//! Running off the end of the file is the normal end of playback; any other read failure
//! is an error the pump reports.

use std::io::ErrorKind;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{Error, Result};

/// One demuxed, still-compressed unit of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPacket {
    /// Index (track id) of the stream this packet belongs to.
    pub stream_index: u32,
    /// Presentation timestamp in the stream's time base.
    pub pts: u64,
    /// Duration in the stream's time base.
    pub duration: u64,
    pub data: Box<[u8]>,
}

impl CompressedPacket {
    pub fn new(stream_index: u32, pts: u64, data: impl Into<Box<[u8]>>) -> Self {
        Self {
            stream_index,
            pts,
            duration: 0,
            data: data.into(),
        }
    }
}

impl From<Packet> for CompressedPacket {
    fn from(packet: Packet) -> Self {
        Self {
            stream_index: packet.track_id(),
            pts: packet.ts,
            duration: packet.dur,
            data: packet.data,
        }
    }
}

/// Something that yields compressed packets in container order.
pub trait PacketSource {
    /// `Ok(None)` means the source is exhausted.
    fn next_packet(&mut self) -> Result<Option<CompressedPacket>>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn next_packet(&mut self) -> Result<Option<CompressedPacket>> {
        (**self).next_packet()
    }
}

// Must be a power of two larger than 32 KiB.
const PROBE_BUFFER_LEN: usize = 256 * 1024;

fn is_playable(track: &Track) -> bool {
    track.codec_params.codec != CODEC_TYPE_NULL && track.codec_params.sample_rate.is_some()
}

/// A `PacketSource` backed by a Symphonia `FormatReader`.
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    track: Track,
}

impl SymphoniaSource {
    /// Identify the container in `source` and select the track to play.
    ///
    /// The first track with a real codec and a known sample rate wins. `hint_extension`
    /// is the file extension, if any; it only matters for containers without a magic
    /// number.
    pub fn probe(source: Box<dyn MediaSource>, hint_extension: Option<&str>) -> Result<Self> {
        let stream = MediaSourceStream::new(
            source,
            MediaSourceStreamOptions {
                buffer_len: PROBE_BUFFER_LEN,
            },
        );

        let mut hint = Hint::new();
        if let Some(ext) = hint_extension {
            hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Probe(e.to_string()))?
            .format;

        let track = format
            .tracks()
            .iter()
            .find(|t| is_playable(t))
            .cloned()
            .ok_or(Error::NoAudioStream)?;

        debug!(
            stream_index = track.id,
            streams = format.tracks().len(),
            codec = ?track.codec_params.codec,
            "selected audio stream"
        );

        Ok(Self { format, track })
    }

    /// The selected audio track.
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn stream_index(&self) -> u32 {
        self.track.id
    }
}

impl PacketSource for SymphoniaSource {
    /// Read the next packet. Hitting the end of the file is `Ok(None)`.
    fn next_packet(&mut self) -> Result<Option<CompressedPacket>> {
        loop {
            match self.format.next_packet() {
                Ok(p) => return Ok(Some(p.into())),
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                // Chained streams may reset the reader; keep reading from the new segment.
                Err(SymphoniaError::ResetRequired) => {
                    debug!("format reader requested a reset");
                    continue;
                }
                Err(e) => return Err(Error::Source(e.to_string())),
            }
        }
    }
}
