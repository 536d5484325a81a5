// src/decoder.rs

//! Stateful packet decoders.
//!
//! The output pump talks to decoders through the two-step `FrameDecoder` contract: submit a
//! packet, then pull frames until the decoder asks for more input. `SymphoniaDecoder`
//! implements that contract on top of Symphonia's one-shot `decode` call.
//!
//! A packet Symphonia cannot decode (`DecodeError`, `IoError`, or `ResetRequired`, after
//! which the codec is reset) costs only that packet. Any other codec error means the
//! decoder is unusable and the packet is rejected.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{Packet, Track};
use symphonia::core::sample::{Sample, i24, u24};
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};
use crate::params::SampleFormat;
use crate::source::CompressedPacket;

/// The decoder refused a packet and is in a state it cannot recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decoder rejected packet: {0}")]
pub struct SubmitRejected(pub String);

/// One decoder output unit.
///
/// `planes` holds one byte plane per channel for planar layouts, or a single interleaved
/// plane. A plane may be longer than its payload (alignment padding); `frames` is the
/// authoritative sample count. The storage belongs to the decoder and is reused.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    pub planes: &'a [Vec<u8>],
    pub frames: usize,
}

/// Result of asking a decoder for its next frame.
#[derive(Debug)]
pub enum Received<'a> {
    Frame(DecodedFrame<'a>),
    /// The submitted packet is exhausted. Not an error.
    NeedMoreInput,
    /// The current packet could not be decoded; later packets may still be fine.
    Error(String),
}

pub trait FrameDecoder {
    fn submit(&mut self, packet: CompressedPacket) -> std::result::Result<(), SubmitRejected>;
    fn receive(&mut self) -> Received<'_>;
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn submit(&mut self, packet: CompressedPacket) -> std::result::Result<(), SubmitRejected> {
        (**self).submit(packet)
    }

    fn receive(&mut self) -> Received<'_> {
        (**self).receive()
    }
}

/// Channel count, sample encoding and rate of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedLayout {
    pub channels: usize,
    pub sample_format: SampleFormat,
    pub sample_rate: u32,
}

impl DecodedLayout {
    fn of(decoded: &AudioBufferRef<'_>) -> Self {
        // 24-bit samples travel in their 32-bit container.
        let sample_format = match decoded {
            AudioBufferRef::U8(_) => SampleFormat::U8,
            AudioBufferRef::U16(_) => SampleFormat::U16,
            AudioBufferRef::U24(_) | AudioBufferRef::U32(_) => SampleFormat::U32,
            AudioBufferRef::S8(_) => SampleFormat::S8,
            AudioBufferRef::S16(_) => SampleFormat::S16,
            AudioBufferRef::S24(_) | AudioBufferRef::S32(_) => SampleFormat::S32,
            AudioBufferRef::F32(_) => SampleFormat::F32,
            AudioBufferRef::F64(_) => SampleFormat::F64,
        };

        Self {
            channels: decoded.spec().channels.count(),
            sample_format,
            sample_rate: decoded.spec().rate,
        }
    }
}

/// Look up a codec for `track` in Symphonia's default registry.
pub fn make_decoder_for_track(track: &Track) -> Result<Box<dyn Decoder>> {
    symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::NoDecoder(format!("stream {}: {e}", track.id)))
}

enum Pending {
    Nothing,
    Frame,
    Corrupt(String),
}

/// `FrameDecoder` over a Symphonia codec.
///
/// Symphonia buffers are always planar, so every frame comes out as one plane per channel.
/// The layout is locked by the first decoded frame; a later frame with a different layout
/// is reported as a per-packet error.
pub struct SymphoniaDecoder {
    decoder: Box<dyn Decoder>,
    planes: Vec<Vec<u8>>,
    frames: usize,
    layout: Option<DecodedLayout>,
    pending: Pending,
}

impl SymphoniaDecoder {
    pub fn new(decoder: Box<dyn Decoder>) -> Self {
        Self {
            decoder,
            planes: Vec::new(),
            frames: 0,
            layout: None,
            pending: Pending::Nothing,
        }
    }

    pub fn for_track(track: &Track) -> Result<Self> {
        Ok(Self::new(make_decoder_for_track(track)?))
    }

    /// Layout of the decoded audio, known once the first frame has been decoded.
    pub fn layout(&self) -> Option<DecodedLayout> {
        self.layout
    }
}

impl FrameDecoder for SymphoniaDecoder {
    fn submit(&mut self, packet: CompressedPacket) -> std::result::Result<(), SubmitRejected> {
        let packet = Packet::new_from_boxed_slice(
            packet.stream_index,
            packet.pts,
            packet.duration,
            packet.data,
        );

        let mut reset = false;
        self.pending = match self.decoder.decode(&packet) {
            Ok(decoded) => {
                let layout = DecodedLayout::of(&decoded);
                match self.layout {
                    Some(locked) if locked != layout => Pending::Corrupt(format!(
                        "decoded layout changed mid-stream ({} ch {} @ {} Hz)",
                        layout.channels, layout.sample_format, layout.sample_rate
                    )),
                    _ => {
                        self.layout = Some(layout);
                        self.frames = copy_planes_ref(&decoded, &mut self.planes);
                        Pending::Frame
                    }
                }
            }
            Err(SymphoniaError::DecodeError(e)) => Pending::Corrupt(e.to_string()),
            Err(SymphoniaError::IoError(e)) => Pending::Corrupt(e.to_string()),
            Err(SymphoniaError::ResetRequired) => {
                reset = true;
                Pending::Corrupt("decoder reset required".to_string())
            }
            Err(e) => {
                self.pending = Pending::Nothing;
                return Err(SubmitRejected(e.to_string()));
            }
        };

        if reset {
            debug!("resetting decoder");
            self.decoder.reset();
        }

        Ok(())
    }

    fn receive(&mut self) -> Received<'_> {
        match std::mem::replace(&mut self.pending, Pending::Nothing) {
            Pending::Nothing => Received::NeedMoreInput,
            Pending::Frame => Received::Frame(DecodedFrame {
                planes: &self.planes,
                frames: self.frames,
            }),
            Pending::Corrupt(reason) => Received::Error(reason),
        }
    }
}

/// Native-endian byte encoding of one decoded sample.
trait RawSample: Copy {
    fn put(self, out: &mut Vec<u8>);
}

macro_rules! raw_sample {
    ($($t:ty),*) => {
        $(
            impl RawSample for $t {
                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

raw_sample!(u8, u16, u32, i8, i16, i32, f32, f64);

impl RawSample for i24 {
    fn put(self, out: &mut Vec<u8>) {
        widen_s24(self.inner()).put(out);
    }
}

impl RawSample for u24 {
    fn put(self, out: &mut Vec<u8>) {
        widen_u24(self.inner()).put(out);
    }
}

fn widen_s24(sample: i32) -> i32 {
    sample << 8
}

fn widen_u24(sample: u32) -> u32 {
    sample << 8
}

fn copy_planes_ref(decoded: &AudioBufferRef<'_>, planes: &mut Vec<Vec<u8>>) -> usize {
    match decoded {
        AudioBufferRef::U8(buf) => copy_planes(buf, planes),
        AudioBufferRef::U16(buf) => copy_planes(buf, planes),
        AudioBufferRef::U24(buf) => copy_planes(buf, planes),
        AudioBufferRef::U32(buf) => copy_planes(buf, planes),
        AudioBufferRef::S8(buf) => copy_planes(buf, planes),
        AudioBufferRef::S16(buf) => copy_planes(buf, planes),
        AudioBufferRef::S24(buf) => copy_planes(buf, planes),
        AudioBufferRef::S32(buf) => copy_planes(buf, planes),
        AudioBufferRef::F32(buf) => copy_planes(buf, planes),
        AudioBufferRef::F64(buf) => copy_planes(buf, planes),
    }
}

/// Copy every channel plane of `buf` into `planes` as raw bytes, reusing allocations.
fn copy_planes<S: Sample + RawSample>(buf: &AudioBuffer<S>, planes: &mut Vec<Vec<u8>>) -> usize {
    let src = buf.planes();
    let src = src.planes();

    planes.resize_with(src.len(), Vec::new);
    for (dst, plane) in planes.iter_mut().zip(src) {
        dst.clear();
        for &sample in plane.iter() {
            sample.put(dst);
        }
    }

    buf.frames()
}
