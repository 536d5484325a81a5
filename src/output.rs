//! Audio output using cpal.
//!
//! The output pump is moved into the device's data callback. From then on only the
//! callback thread touches it, and it is dropped together with the stream, so decoder
//! state never outlives (or predeceases) the callback that uses it.
//!
//! cpal callbacks cannot report "stream complete", so completion and stream errors are
//! forwarded to the player as [`PlaybackEvent`]s.

use std::sync::mpsc::Sender;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig};
use tracing::{debug, error, info, warn};

use crate::decoder::FrameDecoder;
use crate::error::{Error, Result};
use crate::params::{SampleFormat, StreamParameters};
use crate::player::PlaybackEvent;
use crate::pump::{FillStatus, FinishReason, OutputPump};
use crate::source::PacketSource;

pub struct AudioOutput {
    stream: Stream,
    device_name: String,
}

impl AudioOutput {
    /// Open the default output device and attach `pump` to a new stream.
    ///
    /// The stream is created paused; call [`AudioOutput::start`] to begin pulling audio.
    pub fn open<S, D>(pump: OutputPump<S, D>, events: Sender<PlaybackEvent>) -> Result<Self>
    where
        S: PacketSource + Send + 'static,
        D: FrameDecoder + Send + 'static,
    {
        let params = *pump.params();
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no audio output device found".to_string()))?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!(device = %device_name, "using default audio device");

        warn_if_unsupported(&device, &params);

        let config = stream_config(&params);
        debug!(
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            buffer_size = ?config.buffer_size,
            sample_format = %params.sample_format(),
            "audio config"
        );

        let stream = device
            .build_output_stream_raw(
                &config,
                cpal_format(params.sample_format()),
                data_callback(pump, events.clone()),
                move |err| {
                    error!(error = %err, "audio stream error");
                    let _ = events.send(PlaybackEvent::DeviceError(err.to_string()));
                },
                None,
            )
            .map_err(|e| Error::Device(format!("failed to build output stream: {e}")))?;

        Ok(Self {
            stream,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn start(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| Error::Device(format!("failed to start stream: {e}")))?;
        info!("audio stream started");
        Ok(())
    }

    /// Stop the stream and release it, together with the pump it owns.
    ///
    /// A failure to stop is logged; the stream is released either way.
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            warn!(error = %e, "failed to stop audio stream");
        }
        drop(self.stream);
        debug!("audio stream released");
    }
}

fn data_callback<S, D>(
    mut pump: OutputPump<S, D>,
    events: Sender<PlaybackEvent>,
) -> impl FnMut(&mut cpal::Data, &cpal::OutputCallbackInfo) + Send + 'static
where
    S: PacketSource + Send + 'static,
    D: FrameDecoder + Send + 'static,
{
    let channels = usize::from(pump.params().channels());
    let mut finished = false;

    move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
        let requested = data.len() / channels;
        let bytes = data.bytes_mut();

        // The device keeps pulling until the player stops it.
        if finished {
            bytes.fill(0);
            return;
        }

        if pump.fill(bytes, requested) == FillStatus::Complete {
            finished = true;
            let reason = pump
                .finish_reason()
                .cloned()
                .unwrap_or(FinishReason::EndOfStream);
            let _ = events.send(PlaybackEvent::Finished {
                reason,
                stats: pump.stats(),
            });
        }
    }
}

fn stream_config(params: &StreamParameters) -> StreamConfig {
    StreamConfig {
        channels: params.channels(),
        sample_rate: SampleRate(params.sample_rate()),
        buffer_size: BufferSize::Fixed(params.buffer_frames()),
    }
}

fn cpal_format(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::U8 => cpal::SampleFormat::U8,
        SampleFormat::U16 => cpal::SampleFormat::U16,
        SampleFormat::U32 => cpal::SampleFormat::U32,
        SampleFormat::S8 => cpal::SampleFormat::I8,
        SampleFormat::S16 => cpal::SampleFormat::I16,
        SampleFormat::S32 => cpal::SampleFormat::I32,
        SampleFormat::F32 => cpal::SampleFormat::F32,
        SampleFormat::F64 => cpal::SampleFormat::F64,
    }
}

/// Log when the device does not advertise the configuration we are about to request.
///
/// Some backends accept configurations they do not list, so this is not fatal.
fn warn_if_unsupported(device: &Device, params: &StreamParameters) {
    let wanted = cpal_format(params.sample_format());
    let rate = params.sample_rate();

    let supported = match device.supported_output_configs() {
        Ok(mut configs) => configs.any(|c| {
            c.channels() == params.channels()
                && c.sample_format() == wanted
                && c.min_sample_rate().0 <= rate
                && c.max_sample_rate().0 >= rate
        }),
        Err(e) => {
            debug!(error = %e, "could not query device configurations");
            return;
        }
    };

    if !supported {
        warn!(
            channels = params.channels(),
            sample_rate = rate,
            sample_format = %params.sample_format(),
            "device does not list this configuration; trying anyway"
        );
    }
}
