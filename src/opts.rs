/// The device buffer size used when nothing else is requested.
pub const DEFAULT_BUFFER_FRAMES: u32 = 256;

/// Options that control how a file is opened and played.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI maps user input into this type so that other frontends and tests can
/// construct options programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOpts {
    /// Open the device at this rate instead of the source's own.
    ///
    /// No resampling happens: a rate that differs from the source changes playback speed
    /// and pitch.
    pub sample_rate: Option<u32>,

    /// Frames the device pulls per callback.
    pub buffer_frames: u32,

    /// Optional container hint (e.g. "flac", "ogg"). When `None`, the file extension is used.
    pub hint_extension: Option<String>,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            sample_rate: None,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            hint_extension: None,
        }
    }
}
