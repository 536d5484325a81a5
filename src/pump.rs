//! The fill callback that feeds the output device.
//!
//! Each call asks for `N` frames. The pump tops the frame queue up from the packet source
//! (decode → repack) until it holds at least `N` frames or the source runs dry, then copies
//! frames out oldest first.
//!
//! The whole body runs as one unit on the audio callback thread. Nothing else touches the
//! queue, the decoder or the demux cursor, so none of them are synchronized.
//!
//! State: `Streaming` → (`Draining`, within a single call) → `Stopped`. Once a call returns
//! [`FillStatus::Complete`] the pump is finished.

use tracing::{Span, debug, error, info, trace, warn};

use crate::adapter::{ChannelBuffers, DecodeError, DecoderAdapter};
use crate::decoder::FrameDecoder;
use crate::frame_queue::FrameQueue;
use crate::params::StreamParameters;
use crate::repack::SampleRepacker;
use crate::source::PacketSource;

/// What a fill call tells the audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// The buffer was filled completely; keep calling.
    Continue,
    /// Playback is over. The buffer may hold fewer frames than requested.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Streaming,
    /// Emptying the queue into the final buffer. Only held inside the call that
    /// completes, so callers never observe it.
    Draining,
    Stopped,
}

/// Why the pump signalled [`FillStatus::Complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    EndOfStream,
    DecoderFailed(String),
    SourceFailed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Sample-frames copied to the output.
    pub frames_delivered: u64,
    /// Packets of the selected stream that decoded successfully.
    pub packets_decoded: u64,
    /// Corrupt packets that were skipped.
    pub packets_skipped: u64,
    /// Packets from other streams, dropped without decoding.
    pub packets_discarded: u64,
}

pub struct OutputPump<S, D> {
    source: S,
    adapter: DecoderAdapter<D>,
    repacker: SampleRepacker,
    queue: FrameQueue,
    buffers: ChannelBuffers,
    params: StreamParameters,
    stream_index: u32,
    state: PumpState,
    finish: Option<FinishReason>,
    stats: PumpStats,
    span: Span,
}

impl<S: PacketSource, D: FrameDecoder> OutputPump<S, D> {
    /// Build a pump that plays packets of `stream_index` from `source`.
    pub fn new(source: S, decoder: D, params: StreamParameters, stream_index: u32) -> Self {
        let frame_size = params.frame_size();
        // Enough headroom that a typical packet never forces a reallocation mid-callback.
        let capacity = (params.buffer_frames() as usize).max(1) * 8;

        Self {
            source,
            adapter: DecoderAdapter::new(decoder, params),
            repacker: SampleRepacker::new(params),
            queue: FrameQueue::with_capacity(frame_size, capacity),
            buffers: ChannelBuffers::new(),
            params,
            stream_index,
            state: PumpState::Streaming,
            finish: None,
            stats: PumpStats::default(),
            span: Span::none(),
        }
    }

    /// Attribute the pump's log events to `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn params(&self) -> &StreamParameters {
        &self.params
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn stats(&self) -> PumpStats {
        self.stats
    }

    /// Frames currently buffered.
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Set once the pump has returned [`FillStatus::Complete`].
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn decoder(&self) -> &D {
        self.adapter.decoder()
    }

    /// Move frames the decoder already holds into the queue.
    ///
    /// Used after opening a source, when the first packet was decoded to discover the
    /// stream layout.
    pub fn absorb_pending(&mut self) -> Result<usize, DecodeError> {
        self.buffers.clear();
        self.adapter.drain_frames(&mut self.buffers)?;
        self.repacker
            .repack(&self.buffers, &mut self.queue)
            .map_err(|e| DecodeError::Corrupt(e.to_string()))
    }

    /// Fill `output` with `requested` frames.
    ///
    /// `output` must hold `requested * frame_size` bytes; a shorter buffer caps the request
    /// at the frames that fit. On [`FillStatus::Complete`] the part of the request that
    /// could not be served is zero-filled.
    pub fn fill(&mut self, output: &mut [u8], requested: usize) -> FillStatus {
        let span = self.span.clone();
        let _enter = span.enter();

        let frame_size = self.params.frame_size();
        let fits = output.len() / frame_size;
        let requested = if requested > fits {
            warn!(requested, fits, "output buffer too small for request");
            fits
        } else {
            requested
        };
        let output = &mut output[..requested * frame_size];

        if self.state == PumpState::Stopped {
            output.fill(0);
            return FillStatus::Complete;
        }

        if let Err(reason) = self.refill(requested) {
            return self.finish(output, reason);
        }

        let copied = self.queue.drain_into(output);
        self.stats.frames_delivered += copied as u64;
        FillStatus::Continue
    }

    /// Decode until the queue holds `wanted` frames.
    ///
    /// `Err` means no more audio will arrive, for the given reason.
    fn refill(&mut self, wanted: usize) -> Result<(), FinishReason> {
        if self.queue.len() < wanted {
            trace!(queued = self.queue.len(), wanted, "refilling frame queue");
        }

        while self.queue.len() < wanted {
            let packet = match self.source.next_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => return Err(FinishReason::EndOfStream),
                Err(e) => {
                    error!(error = %e, "packet source failed");
                    return Err(FinishReason::SourceFailed(e.to_string()));
                }
            };

            if packet.stream_index != self.stream_index {
                self.stats.packets_discarded += 1;
                trace!(stream_index = packet.stream_index, "discarding foreign packet");
                continue;
            }

            let pts = packet.pts;
            match self.adapter.decode(packet, &mut self.buffers) {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(pts, error = %e, "decoder failed");
                    return Err(FinishReason::DecoderFailed(e.to_string()));
                }
                Err(e) => {
                    self.stats.packets_skipped += 1;
                    warn!(pts, error = %e, "skipping packet");
                    continue;
                }
            }

            match self.repacker.repack(&self.buffers, &mut self.queue) {
                Ok(frames) => {
                    self.stats.packets_decoded += 1;
                    debug!(pts, frames, "decoded packet");
                }
                Err(e) => {
                    error!(pts, error = %e, "repacked frame has the wrong size");
                    return Err(FinishReason::DecoderFailed(e.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Drain whatever is queued into `output`, zero the rest, and stop.
    fn finish(&mut self, output: &mut [u8], reason: FinishReason) -> FillStatus {
        self.state = PumpState::Draining;

        let copied = self.queue.drain_into(output);
        self.stats.frames_delivered += copied as u64;
        output[copied * self.params.frame_size()..].fill(0);

        match &reason {
            FinishReason::EndOfStream => info!(
                frames_delivered = self.stats.frames_delivered,
                packets_skipped = self.stats.packets_skipped,
                "end of stream"
            ),
            FinishReason::DecoderFailed(_) | FinishReason::SourceFailed(_) => {
                // Frames still queued after a failure are not worth keeping.
                self.queue.clear();
            }
        }

        self.finish = Some(reason);
        self.state = PumpState::Stopped;
        FillStatus::Complete
    }
}
