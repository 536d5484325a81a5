//! Decoder adapter: one compressed packet in, per-channel byte buffers out.
//!
//! The adapter submits a packet, then drains every frame the decoder produces for it into
//! caller-owned [`ChannelBuffers`]. Decoder storage is reused between frames, so each
//! frame is fully copied out before the next one is requested.

use thiserror::Error;
use tracing::trace;

use crate::decoder::{FrameDecoder, Received, SubmitRejected};
use crate::params::StreamParameters;
use crate::source::CompressedPacket;

/// Why a packet produced no usable audio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The decoder refused the packet. Playback cannot continue.
    #[error(transparent)]
    SubmitRejected(#[from] SubmitRejected),

    /// This packet is bad; the next one may decode fine.
    #[error("failed to decode packet: {0}")]
    Corrupt(String),
}

impl DecodeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::SubmitRejected(_))
    }
}

/// Decoded bytes for one packet.
///
/// Planar streams get one buffer per channel; interleaved streams get a single buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBuffers {
    planes: Vec<Vec<u8>>,
}

impl ChannelBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_planes(planes: Vec<Vec<u8>>) -> Self {
        Self { planes }
    }

    pub fn planes(&self) -> &[Vec<u8>] {
        &self.planes
    }

    pub fn is_empty(&self) -> bool {
        self.planes.iter().all(Vec::is_empty)
    }

    /// Empty every buffer, keeping allocations.
    pub fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
    }

    fn reset_to(&mut self, count: usize) {
        self.planes.resize_with(count, Vec::new);
        self.clear();
    }
}

pub struct DecoderAdapter<D> {
    decoder: D,
    params: StreamParameters,
}

impl<D: FrameDecoder> DecoderAdapter<D> {
    pub fn new(decoder: D, params: StreamParameters) -> Self {
        Self { decoder, params }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode one packet into `out`, replacing its previous contents.
    ///
    /// The packet is consumed whatever the outcome. On error `out` may hold a partial
    /// packet and should be discarded by the caller.
    pub fn decode(
        &mut self,
        packet: CompressedPacket,
        out: &mut ChannelBuffers,
    ) -> Result<usize, DecodeError> {
        out.reset_to(if self.params.is_planar() {
            usize::from(self.params.channels())
        } else {
            1
        });

        self.decoder.submit(packet)?;
        self.drain_frames(out)
    }

    /// Pull frames already sitting in the decoder into `out` without submitting anything.
    ///
    /// Appends to `out`. Returns the number of sample-frames collected.
    pub fn drain_frames(&mut self, out: &mut ChannelBuffers) -> Result<usize, DecodeError> {
        let planar = self.params.is_planar();
        let channels = usize::from(self.params.channels());
        let bytes_per_sample = self.params.bytes_per_sample();
        let frame_size = self.params.frame_size();

        out.planes.resize_with(if planar { channels } else { 1 }, Vec::new);

        let mut collected = 0usize;
        loop {
            let frame = match self.decoder.receive() {
                Received::Frame(frame) => frame,
                Received::NeedMoreInput => return Ok(collected),
                Received::Error(reason) => return Err(DecodeError::Corrupt(reason)),
            };

            if planar {
                if frame.planes.len() < channels {
                    return Err(DecodeError::Corrupt(format!(
                        "expected {channels} planes, decoder produced {}",
                        frame.planes.len()
                    )));
                }

                // Only the payload; anything past `frames * width` is padding.
                let line = frame.frames * bytes_per_sample;
                for (dst, src) in out.planes.iter_mut().zip(frame.planes) {
                    dst.extend_from_slice(&src[..line.min(src.len())]);
                }
            } else {
                let Some(src) = frame.planes.first() else {
                    return Err(DecodeError::Corrupt(
                        "decoder produced a frame without data".to_string(),
                    ));
                };
                let line = frame.frames * frame_size;
                out.planes[0].extend_from_slice(&src[..line.min(src.len())]);
            }

            trace!(frames = frame.frames, "decoded frame");
            collected += frame.frames;
        }
    }
}
