use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Siren's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Siren's crate-wide error type.
///
/// Open-time variants are fatal: the player reports them and exits without attempting
/// playback. Per-packet decode problems never show up here; they are handled inside the
/// output pump (see [`crate::adapter::DecodeError`]).
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open \"{}\"", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not probe media stream: {0}")]
    Probe(String),

    #[error("no audio stream found")]
    NoAudioStream,

    #[error("no decoder for audio stream: {0}")]
    NoDecoder(String),

    #[error("stream contains no decodable audio")]
    NoDecodableAudio,

    #[error("failed reading packet: {0}")]
    Source(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
