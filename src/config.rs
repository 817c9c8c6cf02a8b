use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs::read_to_string;

use crate::constants::BITRATE_KBPS;
use crate::lang::Language;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub music_dir: PathBuf,
    pub podcasts_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("music"),
            podcasts_dir: PathBuf::from("podcasts"),
            cache_dir: PathBuf::from("cache"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    pub name: String,
    pub description: String,
    pub language: Language,

    /// Offset of the reference timezone used for the hourly schedule
    pub utc_offset_hours: i32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: "NAVO RADIO".to_string(),
            description: "NAVO RADIO 24/7".to_string(),
            language: Language::default(),
            utc_offset_hours: 3,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            city: "Dushanbe".to_string(),
            latitude: 38.56,
            longitude: 68.78,
            timezone: "Asia/Dushanbe".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub news_hours: BTreeSet<u32>,
    pub weather_hours: BTreeSet<u32>,
    pub podcast_hours: BTreeSet<u32>,
    pub news_items: usize,

    /// Maximum number of segments waiting for the broadcaster
    pub queue_capacity: usize,

    /// The producer only generates while the queue is shorter than this
    pub low_water: usize,

    pub cycle_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            news_hours: [9, 12, 15, 18, 21].into(),
            weather_hours: [7, 10, 13, 16, 19].into(),
            podcast_hours: [11, 14, 17, 20].into(),
            news_items: 8,
            queue_capacity: 5,
            low_water: 5,
            cycle_interval_ms: 1000,
        }
    }
}

impl ScheduleConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn low_water_mark(&self) -> usize {
        self.low_water.clamp(1, self.queue_capacity.max(1))
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Write segment bytes straight to the server
    #[default]
    Raw,

    /// Normalize everything through one ffmpeg pass
    Transcode,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct IcecastConfig {
    pub url: String,
    pub mount: String,
    pub password: String,
    pub public: bool,
    pub mode: BroadcastMode,
    pub bitrate_kbps: u32,

    /// Sending slightly faster than real time keeps the server buffer topped up
    pub stream_rate_multiplier: f64,

    pub reconnect_delay_secs: u64,
    pub handshake_timeout_secs: u64,
}

impl Default for IcecastConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            mount: "/live".to_string(),
            password: "hackme".to_string(),
            public: true,
            mode: BroadcastMode::default(),
            bitrate_kbps: BITRATE_KBPS,
            stream_rate_multiplier: 1.10,
            reconnect_delay_secs: 5,
            handshake_timeout_secs: 10,
        }
    }
}

impl IcecastConfig {
    /// Splits `url` into host and port, defaulting to 127.0.0.1:8000.
    pub fn host_port(&self) -> Result<(String, u16)> {
        let trimmed = self.url.trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("icecast://"))
            .unwrap_or(trimmed);
        let authority = rest.split('/').next().unwrap_or_default();

        if authority.is_empty() {
            return Ok(("127.0.0.1".to_string(), 8000));
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .with_context(|| format!("Invalid Icecast port in {}", self.url))?;
                Ok((host.to_string(), port))
            }
            None => Ok((authority.to_string(), 8000)),
        }
    }

    pub fn byte_rate(&self) -> f64 {
        self.bitrate_kbps as f64 * 1000.0 / 8.0 * self.stream_rate_multiplier
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    pub chunk_size: usize,
    pub dequeue_wait_ms: u64,
    pub underrun_silence_secs: f64,
    pub boundary_pad_secs: f64,
    pub silence_clip_secs: f64,
    pub now_playing_delay_secs: u64,
    pub history_window_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            dequeue_wait_ms: 500,
            underrun_silence_secs: 1.0,
            boundary_pad_secs: 0.12,
            silence_clip_secs: 3.0,
            now_playing_delay_secs: 15,
            history_window_secs: 300,
        }
    }
}

impl StreamConfig {
    pub fn dequeue_wait(&self) -> Duration {
        Duration::from_millis(self.dequeue_wait_ms)
    }

    /// How far listeners' players lag behind the stream.
    pub fn now_playing_delay(&self) -> Duration {
        Duration::from_secs(self.now_playing_delay_secs)
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_secs(self.history_window_secs)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Edge,
    ElevenLabs,
    Espeak,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TtsConfig {
    pub provider: TtsProvider,

    /// edge-tts voice, or the espeak voice name
    pub voice: String,
    pub rate: String,
    pub volume: String,

    /// Path or name of the edge-tts executable
    pub edge_binary: String,

    pub voice_id: String,
    pub model_id: String,
    pub api_key_env: String,
    pub base_url: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            voice: "en-GB-SoniaNeural".to_string(),
            rate: "+0%".to_string(),
            volume: "+0%".to_string(),
            edge_binary: "edge-tts".to_string(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
            base_url: "https://api.elevenlabs.io".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub ffmpeg: PathBuf,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub station: StationConfig,
    pub region: RegionConfig,
    pub schedule: ScheduleConfig,
    pub icecast: IcecastConfig,
    pub stream: StreamConfig,
    pub tts: TtsConfig,
    pub llm: LlmConfig,
    pub encoder: EncoderConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.schedule.queue_capacity == 0 {
            return Err(anyhow!("schedule.queue_capacity must be at least 1"));
        }
        if self.stream.chunk_size == 0 {
            return Err(anyhow!("stream.chunk_size must be at least 1"));
        }
        if !(-12..=14).contains(&self.station.utc_offset_hours) {
            return Err(anyhow!(
                "station.utc_offset_hours out of range: {}",
                self.station.utc_offset_hours
            ));
        }
        let hours = self
            .schedule
            .news_hours
            .iter()
            .chain(&self.schedule.weather_hours)
            .chain(&self.schedule.podcast_hours);
        for hour in hours {
            if *hour > 23 {
                return Err(anyhow!("Schedule hour out of range: {hour}"));
            }
        }
        self.icecast.host_port()?;
        Ok(())
    }
}

pub fn parse(config: &str) -> Result<Config> {
    let config: Config = toml::from_str(config)?;
    config.validate()?;

    Ok(config)
}

pub async fn load(path: &Path) -> Result<Config> {
    let config = read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse(&config)
}
