use std::time::Duration;

// Output stream parameters shared by the silence clip and the transcoder
pub const SAMPLE_RATE: u32 = 44100; // 44.1 kHz sample rate
pub const CHANNELS: u16 = 2; // Stereo channel
pub const BITRATE_KBPS: u32 = 128;

/// Clips smaller than this are treated as corrupt and regenerated.
pub const MIN_SILENCE_CLIP_BYTES: u64 = 100;

/// Length of the emergency clip rendered when the cached one is unusable.
pub const EMERGENCY_SILENCE_SECS: f64 = 0.1;

/// Bytes the transcoding pump accumulates before starting the encoder.
pub const PREBUFFER_BYTES: usize = 64 * 1024;

pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
pub const TRANSCODER_EXIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const TRANSCODER_RESTART_DELAY: Duration = Duration::from_secs(3);

pub const NOW_PLAYING_FILE: &str = ".now_playing.json";
pub const NOW_PLAYING_FILE_TMP: &str = ".now_playing.json.tmp";
