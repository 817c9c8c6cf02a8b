//! Test infrastructure for radio-dj integration tests.
//!
//! Stand-ins for every external service (speech, LLM, feeds, ffmpeg, the
//! clock) so whole station flows run offline.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use tempfile::TempDir;

pub use radio_dj::catalog::{PodcastCatalog, TrackCatalog};
pub use radio_dj::config::{Config, IcecastConfig, StreamConfig};
pub use radio_dj::dj::Transition;
pub use radio_dj::encoder::Encoder;
pub use radio_dj::history::{PlaybackHistory, SharedHistory};
pub use radio_dj::producer::{Bulletin, Collaborators, Commentary, SegmentProducer};
pub use radio_dj::queue::{segment_queue, SegmentReceiver, SegmentSender};
pub use radio_dj::schedule::Clock;
pub use radio_dj::segment::{Segment, SegmentKind, TrackInfo};
pub use radio_dj::silence::SilenceReservoir;
pub use radio_dj::stream::SegmentStream;
pub use radio_dj::voices::{Synthesizer, TtsCache};

/// Byte the fake encoder fills silence with.
pub const SILENCE_BYTE: u8 = 0xFF;

/// Installs the process-wide TLS provider reqwest clients need.
pub fn init_tls() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Creates an mp3-looking file. The contents are not real audio, so tag
/// probing falls back to the `Artist - Title` file name.
pub fn write_mp3(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A music folder holding one file per name.
pub fn music_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        write_mp3(dir.path(), name, format!("MUSIC {name}").as_bytes());
    }
    dir
}

/// Reference-zone time (UTC+3) on 1 June 2024.
pub fn at_hour(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 6, 1, hour, minute, 0)
        .unwrap()
}

/// Clock the test moves by hand.
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap()
    }
}

/// Writes the text itself as the "audio", so tests can read back what was
/// said. Fails for any text starting with one of `failing_prefixes`.
#[derive(Default)]
pub struct StubVoice {
    pub calls: AtomicUsize,
    failing_prefixes: Vec<String>,
}

impl StubVoice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing_prefixes: vec![prefix.to_string()],
        })
    }
}

#[async_trait]
impl Synthesizer for StubVoice {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_prefixes.iter().any(|p| text.starts_with(p)) {
            return Err(anyhow!("voice unavailable"));
        }
        tokio::fs::write(dest, text.as_bytes()).await?;
        Ok(())
    }
}

pub struct StubBulletin(pub String);

#[async_trait]
impl Bulletin for StubBulletin {
    async fn bulletin(&self) -> String {
        self.0.clone()
    }
}

/// Predictable DJ lines.
pub struct StubDj;

#[async_trait]
impl Commentary for StubDj {
    async fn comment(&self, track: &TrackInfo) -> String {
        format!("About {track}")
    }

    fn transition(&self, next: &Transition) -> String {
        match next {
            Transition::Track(track) => format!("Next: {track}"),
            Transition::News => "News time".to_string(),
            Transition::Weather => "Weather time".to_string(),
            Transition::Podcast => "Podcast time".to_string(),
        }
    }
}

/// Renders 1000 bytes of [SILENCE_BYTE] per second and counts renders.
#[derive(Default)]
pub struct FakeEncoder {
    pub renders: AtomicUsize,
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn render_silence(&self, dest: &Path, secs: f64) -> Result<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let len = (secs * 1000.0) as usize;
        tokio::fs::write(dest, vec![SILENCE_BYTE; len]).await?;
        Ok(())
    }

    async fn wav_to_mp3(&self, wav: &Path, mp3: &Path) -> Result<()> {
        tokio::fs::copy(wav, mp3).await?;
        Ok(())
    }
}

/// Config pointing at temp folders, with no scheduled specials.
pub fn test_config(music: &Path, podcasts: &Path, cache: &Path) -> Config {
    let mut config = Config::default();
    config.paths.music_dir = music.to_path_buf();
    config.paths.podcasts_dir = podcasts.to_path_buf();
    config.paths.cache_dir = cache.to_path_buf();
    config.schedule.news_hours.clear();
    config.schedule.weather_hours.clear();
    config.schedule.podcast_hours.clear();
    config.schedule.queue_capacity = 64;
    config.schedule.low_water = 64;
    config.schedule.cycle_interval_ms = 20;
    config
}

/// A producer wired to stubs, plus everything a test needs to inspect it.
pub struct Studio {
    pub producer: SegmentProducer,
    pub rx: SegmentReceiver,
    pub voice: Arc<StubVoice>,
    pub clock: Arc<FixedClock>,
    pub music: TempDir,
    pub podcasts: TempDir,
    pub cache: TempDir,
}

impl Studio {
    pub fn new(tracks: &[&str], config: impl FnOnce(&mut Config)) -> Self {
        Self::with_voice(tracks, StubVoice::new(), config)
    }

    pub fn with_voice(
        tracks: &[&str],
        voice: Arc<StubVoice>,
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let music = music_dir(tracks);
        let podcasts = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();

        let mut config = test_config(music.path(), podcasts.path(), cache.path());
        configure(&mut config);

        let clock = FixedClock::new(at_hour(3, 0));
        let collaborators = Collaborators {
            tts: TtsCache::new(cache.path(), voice.clone()),
            dj: Arc::new(StubDj),
            news: Arc::new(StubBulletin("Headlines of the hour".to_string())),
            weather: Arc::new(StubBulletin("Sunny all day".to_string())),
            clock: clock.clone(),
        };

        let (tx, rx) = segment_queue(config.schedule.queue_capacity);
        let producer = SegmentProducer::new(
            &config,
            TrackCatalog::with_seed(music.path(), 7),
            PodcastCatalog::new(podcasts.path()),
            collaborators,
            tx,
        );

        Self {
            producer,
            rx,
            voice,
            clock,
            music,
            podcasts,
            cache,
        }
    }

    /// Everything queued so far, in order.
    pub fn drain(&mut self) -> Vec<Segment> {
        std::iter::from_fn(|| self.rx.try_pop()).collect()
    }
}

pub fn kinds(segments: &[Segment]) -> Vec<SegmentKind> {
    segments.iter().map(|segment| segment.kind).collect()
}

/// What a spoken segment says, as written by [StubVoice].
pub fn spoken(segment: &Segment) -> String {
    std::fs::read_to_string(&segment.path).unwrap()
}

pub fn distinct_paths(segments: &[&Segment]) -> usize {
    segments
        .iter()
        .map(|segment| segment.path.clone())
        .collect::<HashSet<_>>()
        .len()
}

/// A segment stream fed by a fresh queue, padded by [FakeEncoder] silence.
pub fn test_stream(cache: &Path, config: StreamConfig) -> (SegmentSender, SegmentStream, SharedHistory) {
    let (tx, rx) = segment_queue(8);
    let silence = Arc::new(SilenceReservoir::new(
        cache,
        Arc::new(FakeEncoder::default()),
        config.silence_clip_secs,
    ));
    let history = PlaybackHistory::shared(config.history_window());
    let stream = SegmentStream::new(rx, silence, history.clone(), config);
    (tx, stream, history)
}

/// Stream settings that keep test underruns short.
pub fn quick_stream_config() -> StreamConfig {
    StreamConfig {
        chunk_size: 500,
        dequeue_wait_ms: 50,
        ..Default::default()
    }
}
