#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use radio_dj::catalog::{PodcastCatalog, TrackCatalog};
use radio_dj::config::{self, BroadcastMode, Config};
use radio_dj::constants::SHUTDOWN_GRACE;
use radio_dj::dj::DjVoice;
use radio_dj::encoder::{Encoder, Ffmpeg};
use radio_dj::history::PlaybackHistory;
use radio_dj::icecast::Broadcaster;
use radio_dj::news::NewsDesk;
use radio_dj::producer::{Collaborators, SegmentProducer};
use radio_dj::queue::segment_queue;
use radio_dj::schedule::{Clock, SystemClock};
use radio_dj::silence::SilenceReservoir;
use radio_dj::stream::SegmentStream;
use radio_dj::transcode::TranscodingPump;
use radio_dj::voices::{self, TtsCache};
use radio_dj::weather::WeatherDesk;

const DEFAULT_CONFIG_PATH: &str = "Config.toml";

fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

async fn read_config() -> Result<Config> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        info!("Loading config from {}", path.display());
        config::load(&path).await
    } else {
        info!("{} not found, using defaults", path.display());
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }
}

async fn create_dirs(config: &Config) -> Result<()> {
    for dir in [
        &config.paths.music_dir,
        &config.paths.podcasts_dir,
        &config.paths.cache_dir,
    ] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    // Unreadable folders are a configuration error, not a degraded state
    TrackCatalog::new(&config.paths.music_dir)
        .list_tracks()
        .await
        .context("Music folder is not readable")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = read_config().await?;
    create_dirs(&config).await?;

    let cache_dir = config.paths.cache_dir.clone();
    let encoder: Arc<dyn Encoder> = Arc::new(Ffmpeg::new(&config.encoder.ffmpeg));

    let silence = Arc::new(SilenceReservoir::new(
        &cache_dir,
        encoder.clone(),
        config.stream.silence_clip_secs,
    ));
    silence
        .ensure_clip()
        .await
        .context("Unable to render the silence clip, is ffmpeg installed?")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.station.utc_offset_hours)?);
    let language = config.station.language;

    let synthesizer = voices::from_config(&config.tts, encoder.clone())?;
    let collaborators = Collaborators {
        tts: TtsCache::new(&cache_dir, synthesizer),
        dj: Arc::new(DjVoice::new(
            config.llm.clone(),
            language,
            config.region.city.clone(),
        )?),
        news: Arc::new(NewsDesk::new(
            language,
            config.schedule.news_items,
            clock.clone(),
        )?),
        weather: Arc::new(WeatherDesk::new(config.region.clone(), language)?),
        clock,
    };

    let (tx, rx) = segment_queue(config.schedule.queue_capacity);
    let mut producer = SegmentProducer::new(
        &config,
        TrackCatalog::new(&config.paths.music_dir),
        PodcastCatalog::new(&config.paths.podcasts_dir),
        collaborators,
        tx,
    );
    producer.start().await;

    let history = PlaybackHistory::shared(config.stream.history_window());
    let stream = SegmentStream::new(rx, silence.clone(), history, config.stream.clone())
        .with_now_playing_dir(&cache_dir);
    let target = config.icecast.target(&config.station)?;

    let cancel = CancellationToken::new();
    let producer_task = tokio::spawn(producer.run(cancel.clone()));
    let broadcaster_task = match config.icecast.mode {
        BroadcastMode::Raw => {
            info!(
                "Streaming to {}:{}{}",
                target.host, target.port, target.mount
            );
            let broadcaster = Broadcaster::new(target, stream, &config.icecast);
            tokio::spawn(broadcaster.run(cancel.clone()))
        }
        BroadcastMode::Transcode => {
            info!(
                "Streaming through {} to {}:{}{}",
                config.encoder.ffmpeg.display(),
                target.host,
                target.port,
                target.mount
            );
            let pump = TranscodingPump::new(
                &config.encoder.ffmpeg,
                target,
                stream,
                silence,
                config.stream.chunk_size,
            );
            tokio::spawn(pump.run(cancel.clone()))
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();

    let shutdown = async {
        let _ = producer_task.await;
        let _ = broadcaster_task.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, shutdown).await.is_err() {
        warn!("Background tasks did not stop within {SHUTDOWN_GRACE:?}");
    }

    Ok(())
}
