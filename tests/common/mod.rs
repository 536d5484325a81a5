#![allow(dead_code)]

use std::collections::VecDeque;

use siren::decoder::{DecodedFrame, FrameDecoder, Received, SubmitRejected};
use siren::params::{SampleFormat, StreamParameters};
use siren::source::{CompressedPacket, PacketSource};

/// Plays back a fixed list of packets, then reports end-of-source (or a read failure).
pub struct ScriptedSource {
    packets: VecDeque<CompressedPacket>,
    fail_at_end: bool,
    pub reads: usize,
}

impl ScriptedSource {
    pub fn new(packets: impl IntoIterator<Item = CompressedPacket>) -> Self {
        Self {
            packets: packets.into_iter().collect(),
            fail_at_end: false,
            reads: 0,
        }
    }

    /// Fail with a read error instead of reporting end-of-source.
    pub fn failing_at_end(mut self) -> Self {
        self.fail_at_end = true;
        self
    }
}

impl PacketSource for ScriptedSource {
    fn next_packet(&mut self) -> siren::Result<Option<CompressedPacket>> {
        self.reads += 1;
        match self.packets.pop_front() {
            Some(packet) => Ok(Some(packet)),
            None if self.fail_at_end => Err(siren::Error::Source("disk went away".to_string())),
            None => Ok(None),
        }
    }
}

/// `count` packets of `stream_index`, with pts 0..count.
pub fn packets(stream_index: u32, count: u64) -> Vec<CompressedPacket> {
    (0..count)
        .map(|pts| CompressedPacket::new(stream_index, pts, vec![pts as u8; 8]))
        .collect()
}

/// Left channel carries the running frame number, right carries its negation.
pub fn sample(frame: i32, channel: usize) -> i16 {
    let n = frame as i16;
    if channel == 0 { n } else { n.wrapping_neg() }
}

/// A stereo s16 decoder whose output is a numbered ramp.
///
/// Every good packet yields `frames_per_packet` frames, split into decoder frames of at
/// most `frames_per_receive`. Sample numbering only advances on good packets, so the
/// concatenated output of a healthy run is the unbroken ramp 0, 1, 2, ...
pub struct RampDecoder {
    pub frames_per_packet: usize,
    pub frames_per_receive: usize,
    pub interleaved: bool,
    pub corrupt: Vec<u64>,
    pub reject: Vec<u64>,
    pub submitted: Vec<u64>,
    next_frame: i32,
    pending: VecDeque<Pending>,
    current: Vec<Vec<u8>>,
}

enum Pending {
    Frame(Vec<Vec<u8>>, usize),
    Error,
}

impl RampDecoder {
    pub fn new(frames_per_packet: usize) -> Self {
        Self {
            frames_per_packet,
            frames_per_receive: frames_per_packet,
            interleaved: false,
            corrupt: Vec::new(),
            reject: Vec::new(),
            submitted: Vec::new(),
            next_frame: 0,
            pending: VecDeque::new(),
            current: Vec::new(),
        }
    }

    pub fn params(&self, buffer_frames: u32) -> StreamParameters {
        StreamParameters::new(2, SampleFormat::S16, !self.interleaved, 44_100, buffer_frames)
            .expect("valid params")
    }

    fn render(&mut self, frames: usize) -> Vec<Vec<u8>> {
        let start = self.next_frame;
        self.next_frame += frames as i32;

        if self.interleaved {
            let mut plane = Vec::with_capacity(frames * 4 + 6);
            for f in start..self.next_frame {
                plane.extend_from_slice(&sample(f, 0).to_ne_bytes());
                plane.extend_from_slice(&sample(f, 1).to_ne_bytes());
            }
            // Alignment padding that must never reach the output.
            plane.extend_from_slice(&[0x7F; 6]);
            return vec![plane];
        }

        (0..2)
            .map(|ch| {
                let mut plane = Vec::with_capacity(frames * 2 + 2);
                for f in start..self.next_frame {
                    plane.extend_from_slice(&sample(f, ch).to_ne_bytes());
                }
                plane.extend_from_slice(&[0x7F; 2]);
                plane
            })
            .collect()
    }
}

impl FrameDecoder for RampDecoder {
    fn submit(&mut self, packet: CompressedPacket) -> Result<(), SubmitRejected> {
        self.submitted.push(packet.pts);

        if self.reject.contains(&packet.pts) {
            return Err(SubmitRejected("decoder is closed".to_string()));
        }

        if self.corrupt.contains(&packet.pts) {
            // A corrupt packet may still yield a frame before the error surfaces.
            let partial = self.frames_per_receive.min(self.frames_per_packet);
            let planes = self.render(partial);
            self.next_frame -= partial as i32;
            self.pending.push_back(Pending::Frame(planes, partial));
            self.pending.push_back(Pending::Error);
            return Ok(());
        }

        let mut left = self.frames_per_packet;
        while left > 0 {
            let frames = left.min(self.frames_per_receive);
            let planes = self.render(frames);
            self.pending.push_back(Pending::Frame(planes, frames));
            left -= frames;
        }
        Ok(())
    }

    fn receive(&mut self) -> Received<'_> {
        match self.pending.pop_front() {
            None => Received::NeedMoreInput,
            Some(Pending::Error) => Received::Error("crc mismatch".to_string()),
            Some(Pending::Frame(planes, frames)) => {
                self.current = planes;
                Received::Frame(DecodedFrame {
                    planes: &self.current,
                    frames,
                })
            }
        }
    }
}

/// Split interleaved stereo s16 bytes into (left, right) pairs.
pub fn stereo_frames(bytes: &[u8]) -> Vec<(i16, i16)> {
    bytes
        .chunks_exact(4)
        .map(|f| {
            (
                i16::from_ne_bytes([f[0], f[1]]),
                i16::from_ne_bytes([f[2], f[3]]),
            )
        })
        .collect()
}

/// The frames a healthy ramp of `count` frames produces.
pub fn ramp(count: i32) -> Vec<(i16, i16)> {
    (0..count).map(|f| (sample(f, 0), sample(f, 1))).collect()
}
