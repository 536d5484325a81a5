//! Opening a source for playback.
//!
//! Symphonia only reveals the concrete sample encoding once audio has been decoded, so
//! opening primes the decoder: packets of the selected track are decoded until the first
//! frame comes out, the stream parameters are derived from it, and that frame is handed to
//! the pump so playback starts with it.

use std::fs::File;
use std::path::Path;

use symphonia::core::io::MediaSource;
use tracing::{Span, info, info_span, warn};

use crate::decoder::{DecodedLayout, FrameDecoder, Received, SymphoniaDecoder};
use crate::error::{Error, Result};
use crate::opts::PlayerOpts;
use crate::params::StreamParameters;
use crate::pump::OutputPump;
use crate::source::{PacketSource, SymphoniaSource};

pub type SymphoniaPump = OutputPump<SymphoniaSource, SymphoniaDecoder>;

/// An opened source, ready to be attached to an output device.
pub struct PlaybackSession {
    params: StreamParameters,
    pump: SymphoniaPump,
}

impl PlaybackSession {
    /// Negotiated stream parameters for the output device.
    pub fn params(&self) -> &StreamParameters {
        &self.params
    }

    pub fn pump_mut(&mut self) -> &mut SymphoniaPump {
        &mut self.pump
    }

    pub fn into_pump(self) -> SymphoniaPump {
        self.pump
    }
}

/// Open an audio file for playback.
///
/// The file extension is used as a probe hint unless `opts.hint_extension` is set.
pub fn open_file(path: impl AsRef<Path>, opts: &PlayerOpts) -> Result<PlaybackSession> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let hint = opts
        .hint_extension
        .clone()
        .or_else(|| path.extension().and_then(|e| e.to_str()).map(str::to_owned));

    let span = info_span!("playback", path = %path.display());
    open_in_span(Box::new(file), hint.as_deref(), opts, span)
}

/// Open any Symphonia media source (a file, an in-memory cursor, ...) for playback.
pub fn open_media_source(source: Box<dyn MediaSource>, opts: &PlayerOpts) -> Result<PlaybackSession> {
    open_in_span(
        source,
        opts.hint_extension.as_deref(),
        opts,
        info_span!("playback"),
    )
}

fn open_in_span(
    source: Box<dyn MediaSource>,
    hint_extension: Option<&str>,
    opts: &PlayerOpts,
    span: Span,
) -> Result<PlaybackSession> {
    let _enter = span.enter();

    let mut source = SymphoniaSource::probe(source, hint_extension)?;
    let mut decoder = SymphoniaDecoder::for_track(source.track())?;
    let stream_index = source.stream_index();

    let layout = prime(&mut source, &mut decoder, stream_index)?;
    let channels = u16::try_from(layout.channels)
        .map_err(|_| Error::msg(format!("too many channels: {}", layout.channels)))?;
    let sample_rate = opts.sample_rate.unwrap_or(layout.sample_rate);

    let params = StreamParameters::new(
        channels,
        layout.sample_format,
        true,
        sample_rate,
        opts.buffer_frames,
    )
    .ok_or(Error::NoDecodableAudio)?;

    info!(
        channels,
        sample_format = %layout.sample_format,
        sample_rate,
        source_sample_rate = layout.sample_rate,
        buffer_frames = opts.buffer_frames,
        "opened audio stream"
    );

    if sample_rate != layout.sample_rate {
        warn!(
            sample_rate,
            source_sample_rate = layout.sample_rate,
            "output rate differs from source rate; audio will play at the wrong speed"
        );
    }

    let mut pump = OutputPump::new(source, decoder, params, stream_index).with_span(span.clone());
    pump.absorb_pending()
        .map_err(|e| Error::msg(format!("failed to queue first frame: {e}")))?;

    Ok(PlaybackSession { params, pump })
}

/// Decode packets of `stream_index` until the decoder reports its output layout.
fn prime(
    source: &mut SymphoniaSource,
    decoder: &mut SymphoniaDecoder,
    stream_index: u32,
) -> Result<DecodedLayout> {
    loop {
        let Some(packet) = source.next_packet()? else {
            return Err(Error::NoDecodableAudio);
        };

        if packet.stream_index != stream_index {
            continue;
        }

        decoder
            .submit(packet)
            .map_err(|e| Error::NoDecoder(e.to_string()))?;

        if let Some(layout) = decoder.layout() {
            return Ok(layout);
        }

        if let Received::Error(reason) = decoder.receive() {
            warn!(%reason, "skipping undecodable packet while opening");
        }
    }
}
