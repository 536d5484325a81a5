use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::level_filters::LevelFilter;

use siren::logging::{self, LogFormat};
use siren::opts::{DEFAULT_BUFFER_FRAMES, PlayerOpts};
use siren::player::{PlaybackEvent, PlaybackOutcome, Player};
use siren::pump::FinishReason;

fn main() -> Result<()> {
    let params = Params::parse();
    logging::init(params.verbosity, params.log_format);

    let opts = PlayerOpts {
        sample_rate: params.sample_rate,
        buffer_frames: params.buffer_frames,
        hint_extension: None,
    };

    let player = Player::open(&params.audio_path, &opts)?;

    // Enter (or a closed stdin) stops playback early.
    let quit = player.quit_handle();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = quit.send(PlaybackEvent::Quit);
    });

    let format = player.params();
    println!(
        "Playing {} on {} ({} ch {} @ {} Hz) ... press <Enter> to quit",
        params.audio_path.display(),
        player.device_name(),
        format.channels(),
        format.sample_format(),
        format.sample_rate(),
    );

    match player.run()? {
        PlaybackOutcome::Finished {
            reason: FinishReason::EndOfStream,
            ..
        }
        | PlaybackOutcome::Stopped => Ok(()),
        PlaybackOutcome::Finished {
            reason: FinishReason::DecoderFailed(msg),
            ..
        } => bail!("playback stopped: decoder failed: {msg}"),
        PlaybackOutcome::Finished {
            reason: FinishReason::SourceFailed(msg),
            ..
        } => bail!("playback stopped: could not read source: {msg}"),
    }
}

#[derive(Parser, Debug)]
#[command(name = "siren")]
#[command(about = "Play an audio file on the default output device")]
struct Params {
    /// Path to the audio file.
    #[arg(value_name = "PATH")]
    pub audio_path: PathBuf,

    /// Log level (trace, debug, info, warn, error, off). `SIREN_LOG` takes precedence.
    #[arg(short = 'v', long = "verbosity", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Open the device at this sample rate instead of the file's own (no resampling).
    #[arg(short = 's', long = "sample-rate", value_parser = clap::value_parser!(u32).range(1..))]
    pub sample_rate: Option<u32>,

    /// Frames pulled by the device per callback.
    #[arg(
        short = 'b',
        long = "buffer-frames",
        default_value_t = DEFAULT_BUFFER_FRAMES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub buffer_frames: u32,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
