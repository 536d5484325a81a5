//! Turns per-packet channel buffers into interleaved sample-frames.
//!
//! Planar input is transposed from channel-major to sample-major order; interleaved input
//! is sliced at the frame stride. The stride always comes from the stream parameters
//! (`channels * bytes_per_sample`), never from the decoder's buffer sizes. A trailing
//! partial frame is decoder padding and is dropped.

use crate::adapter::ChannelBuffers;
use crate::frame_queue::{FrameQueue, FrameSizeMismatch};
use crate::params::StreamParameters;

pub struct SampleRepacker {
    params: StreamParameters,
    // One sample-frame being assembled.
    scratch: Vec<u8>,
}

impl SampleRepacker {
    pub fn new(params: StreamParameters) -> Self {
        Self {
            params,
            scratch: Vec::with_capacity(params.frame_size()),
        }
    }

    /// Push every whole sample-frame in `buffers` onto `queue`, in order.
    ///
    /// Returns the number of frames pushed.
    pub fn repack(
        &mut self,
        buffers: &ChannelBuffers,
        queue: &mut FrameQueue,
    ) -> Result<usize, FrameSizeMismatch> {
        if self.params.is_planar() {
            self.repack_planar(buffers.planes(), queue)
        } else {
            repack_interleaved(buffers.planes(), self.params.frame_size(), queue)
        }
    }

    fn repack_planar(
        &mut self,
        planes: &[Vec<u8>],
        queue: &mut FrameQueue,
    ) -> Result<usize, FrameSizeMismatch> {
        let width = self.params.bytes_per_sample();
        let channels = usize::from(self.params.channels());
        let Some(planes) = planes.get(..channels) else {
            return Ok(0);
        };

        // The shortest plane bounds how many complete frames exist.
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0) / width;

        for offset in (0..frames * width).step_by(width) {
            self.scratch.clear();
            for plane in planes {
                self.scratch.extend_from_slice(&plane[offset..offset + width]);
            }
            queue.push(&self.scratch)?;
        }

        Ok(frames)
    }
}

fn repack_interleaved(
    planes: &[Vec<u8>],
    frame_size: usize,
    queue: &mut FrameQueue,
) -> Result<usize, FrameSizeMismatch> {
    let Some(data) = planes.first() else {
        return Ok(0);
    };

    let mut frames = 0;
    for frame in data.chunks_exact(frame_size) {
        queue.push(frame)?;
        frames += 1;
    }
    Ok(frames)
}
