//! Ties an opened session to the output device and waits for playback to end.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{info, info_span};

use crate::error::{Error, Result};
use crate::opts::PlayerOpts;
use crate::output::AudioOutput;
use crate::params::StreamParameters;
use crate::pump::{FinishReason, PumpStats};
use crate::session::{PlaybackSession, open_file};

/// Messages delivered to the thread running [`Player::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The pump signalled completion.
    Finished {
        reason: FinishReason,
        stats: PumpStats,
    },
    /// The audio device reported an error.
    DeviceError(String),
    /// The user asked to stop.
    Quit,
}

/// How a playback run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished {
        reason: FinishReason,
        stats: PumpStats,
    },
    Stopped,
}

pub struct Player {
    params: StreamParameters,
    output: AudioOutput,
    events: Receiver<PlaybackEvent>,
    sender: Sender<PlaybackEvent>,
}

impl Player {
    /// Open `path` and attach it to the default output device.
    pub fn open(path: impl AsRef<Path>, opts: &PlayerOpts) -> Result<Self> {
        Self::from_session(open_file(path, opts)?)
    }

    pub fn from_session(session: PlaybackSession) -> Result<Self> {
        let params = *session.params();
        let (sender, events) = mpsc::channel();
        let output = AudioOutput::open(session.into_pump(), sender.clone())?;

        Ok(Self {
            params,
            output,
            events,
            sender,
        })
    }

    pub fn params(&self) -> &StreamParameters {
        &self.params
    }

    pub fn device_name(&self) -> &str {
        self.output.device_name()
    }

    /// A handle other threads can use to send [`PlaybackEvent::Quit`].
    pub fn quit_handle(&self) -> Sender<PlaybackEvent> {
        self.sender.clone()
    }

    /// Start the stream and block until playback finishes, fails, or is stopped.
    ///
    /// The stream (and the decoder it owns) is released before this returns.
    pub fn run(self) -> Result<PlaybackOutcome> {
        let span = info_span!("player", device = %self.output.device_name());
        let _enter = span.enter();

        self.output.start()?;

        let outcome = loop {
            match self.events.recv() {
                Ok(PlaybackEvent::Finished { reason, stats }) => {
                    break Ok(PlaybackOutcome::Finished { reason, stats });
                }
                Ok(PlaybackEvent::DeviceError(message)) => break Err(Error::Device(message)),
                Ok(PlaybackEvent::Quit) | Err(_) => {
                    info!("playback stopped");
                    break Ok(PlaybackOutcome::Stopped);
                }
            }
        };

        self.output.stop();
        outcome
    }
}
