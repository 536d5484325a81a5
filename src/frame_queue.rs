//! FIFO of interleaved sample-frames awaiting delivery to the output device.
//!
//! The queue is the elastic joint between irregular decoder yield and fixed-size output
//! pulls. It is not a concurrency primitive: the output pump is its only producer and
//! consumer, and it runs one callback at a time.
//!
//! Frames are stored back-to-back in a single byte deque, so the total length is always a
//! whole multiple of the frame size.

use std::collections::VecDeque;

use thiserror::Error;

/// A block handed to [`FrameQueue::push`] was not exactly one sample-frame long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sample-frame must be {expected} bytes, got {actual}")]
pub struct FrameSizeMismatch {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Clone)]
pub struct FrameQueue {
    frame_size: usize,
    bytes: VecDeque<u8>,
}

impl FrameQueue {
    /// Create an empty queue for frames of `frame_size` bytes.
    pub fn new(frame_size: usize) -> Self {
        Self::with_capacity(frame_size, 0)
    }

    /// Create an empty queue with room for `frames` frames before reallocating.
    pub fn with_capacity(frame_size: usize, frames: usize) -> Self {
        Self {
            frame_size,
            bytes: VecDeque::with_capacity(frame_size.saturating_mul(frames)),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of whole frames queued.
    pub fn len(&self) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        self.bytes.len() / self.frame_size
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append one sample-frame at the back.
    pub fn push(&mut self, frame: &[u8]) -> Result<(), FrameSizeMismatch> {
        if frame.len() != self.frame_size || self.frame_size == 0 {
            return Err(FrameSizeMismatch {
                expected: self.frame_size,
                actual: frame.len(),
            });
        }

        self.bytes.extend(frame);
        Ok(())
    }

    /// Remove and return the oldest frame.
    pub fn pop_front(&mut self) -> Option<Vec<u8>> {
        if self.len() == 0 {
            return None;
        }
        Some(self.bytes.drain(..self.frame_size).collect())
    }

    /// Move up to `out.len() / frame_size` frames into `out`, oldest first.
    ///
    /// Returns the number of frames copied. Bytes of `out` past the copied frames are left
    /// as they were.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        if self.frame_size == 0 {
            return 0;
        }

        let frames = self.len().min(out.len() / self.frame_size);
        let n = frames * self.frame_size;

        let (front, back) = self.bytes.as_slices();
        let head = front.len().min(n);
        out[..head].copy_from_slice(&front[..head]);
        out[head..n].copy_from_slice(&back[..n - head]);

        self.bytes.drain(..n);
        frames
    }

    /// Drop every queued frame.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn push_rejects_wrong_sized_blocks() {
        let mut queue = FrameQueue::new(4);
        let err = queue.push(&[0u8; 3]).unwrap_err();
        assert_eq!(
            err,
            FrameSizeMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_front_on_empty_queue_is_none() {
        let mut queue = FrameQueue::new(2);
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn drain_into_copies_whole_frames_only() {
        let mut queue = FrameQueue::new(2);
        for i in 0..3u8 {
            queue.push(&[i, i]).expect("frame sized block");
        }

        // Room for two frames and a stray byte.
        let mut out = [0xAAu8; 5];
        assert_eq!(queue.drain_into(&mut out), 2);
        assert_eq!(out, [0, 0, 1, 1, 0xAA]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_into_handles_wrapped_storage() {
        let mut queue = FrameQueue::with_capacity(2, 2);
        queue.push(&[1, 1]).expect("frame");
        queue.push(&[2, 2]).expect("frame");
        assert_eq!(queue.pop_front(), Some(vec![1, 1]));
        queue.push(&[3, 3]).expect("frame");
        queue.push(&[4, 4]).expect("frame");

        let mut out = [0u8; 6];
        assert_eq!(queue.drain_into(&mut out), 3);
        assert_eq!(out, [2, 2, 3, 3, 4, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn random_interleavings_preserve_insertion_order() {
        for seed in 0..32u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let frame_size = rng.gen_range(1..=8usize);
            let mut queue = FrameQueue::new(frame_size);

            let mut next_in = 0u32;
            let mut next_out = 0u32;

            for _ in 0..500 {
                if rng.gen_bool(0.55) {
                    let frame = vec![(next_in % 251) as u8; frame_size];
                    queue.push(&frame).expect("frame sized block");
                    next_in += 1;
                } else if rng.gen_bool(0.5) {
                    if let Some(frame) = queue.pop_front() {
                        assert_eq!(frame, vec![(next_out % 251) as u8; frame_size]);
                        next_out += 1;
                    }
                } else {
                    let want = rng.gen_range(0..6usize);
                    let mut out = vec![0u8; want * frame_size];
                    let got = queue.drain_into(&mut out);
                    for chunk in out[..got * frame_size].chunks_exact(frame_size) {
                        assert_eq!(chunk, vec![(next_out % 251) as u8; frame_size].as_slice());
                        next_out += 1;
                    }
                }

                assert_eq!(queue.len() as u32, next_in - next_out);
            }
        }
    }
}
