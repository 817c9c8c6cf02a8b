//! Decides what airs next and keeps the segment queue topped up.
//!
//! Each generation cycle produces either one scheduled special (news,
//! weather or a podcast, introduced by a DJ line) or the next music track
//! wrapped in DJ commentary about the previous one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio_util::sync::CancellationToken;

use crate::catalog::{PodcastCatalog, TrackCatalog};
use crate::config::Config;
use crate::dj::Transition;
use crate::lang::{self, Language, Phrase};
use crate::metadata::probe_track;
use crate::queue::SegmentSender;
use crate::schedule::{hourly_salt, Clock, ScheduleState, Special};
use crate::segment::{Segment, SegmentKind, TrackInfo};
use crate::voices::TtsCache;

const DJ_DIR: &str = "dj";
const NEWS_DIR: &str = "news";
const WEATHER_DIR: &str = "weather";
const SYSTEM_DIR: &str = "system";

/// Stale catalog entries skipped per cycle before giving up
const MAX_TRACK_ATTEMPTS: usize = 3;

/// A spoken bulletin. Failures are turned into a fallback phrase by the
/// implementation, never returned.
#[async_trait]
pub trait Bulletin: Send + Sync {
    async fn bulletin(&self) -> String;
}

/// The DJ's voice between segments.
#[async_trait]
pub trait Commentary: Send + Sync {
    /// A short remark about a track that just finished.
    async fn comment(&self, track: &TrackInfo) -> String;

    fn transition(&self, next: &Transition) -> String;
}

/// External services the producer talks to.
pub struct Collaborators {
    pub tts: TtsCache,
    pub dj: Arc<dyn Commentary>,
    pub news: Arc<dyn Bulletin>,
    pub weather: Arc<dyn Bulletin>,
    pub clock: Arc<dyn Clock>,
}

pub struct SegmentProducer {
    catalog: TrackCatalog,
    podcasts: PodcastCatalog,
    schedule: ScheduleState,
    tts: TtsCache,
    dj: Arc<dyn Commentary>,
    news: Arc<dyn Bulletin>,
    weather: Arc<dyn Bulletin>,
    clock: Arc<dyn Clock>,
    queue: SegmentSender,
    language: Language,

    /// Commentary lags one track behind
    last_track: Option<TrackInfo>,

    low_water: usize,
    cycle_interval: Duration,
}

impl SegmentProducer {
    pub fn new(
        config: &Config,
        catalog: TrackCatalog,
        podcasts: PodcastCatalog,
        collaborators: Collaborators,
        queue: SegmentSender,
    ) -> Self {
        Self {
            catalog,
            podcasts,
            schedule: ScheduleState::new(&config.schedule),
            tts: collaborators.tts,
            dj: collaborators.dj,
            news: collaborators.news,
            weather: collaborators.weather,
            clock: collaborators.clock,
            low_water: config.schedule.low_water_mark().min(queue.capacity()),
            queue,
            language: config.station.language,
            last_track: None,
            cycle_interval: config.schedule.cycle_interval(),
        }
    }

    pub fn last_track(&self) -> Option<&TrackInfo> {
        self.last_track.as_ref()
    }

    /// Queues the opening segment: the first track, or an announcement that
    /// the music folder is empty. Returns how many segments were queued.
    pub async fn start(&mut self) -> usize {
        match self.playable_track().await {
            Some(segment) => {
                let info = segment.track.clone().unwrap_or_default();
                info!("Opening with {info}");
                self.last_track = Some(info);
                self.enqueue(segment).await
            }
            None => {
                warn!(
                    "No tracks in {}, announcing it instead",
                    self.catalog.dir().display()
                );
                let text = lang::phrase(self.language, Phrase::Welcome);
                self.speak(text, SYSTEM_DIR, "", SegmentKind::SystemFallback)
                    .await
            }
        }
    }

    /// Runs one generation cycle. Returns how many segments were queued.
    pub async fn generate_cycle(&mut self) -> usize {
        let now = self.clock.now();

        match self.schedule.take_due(&now) {
            Some(special) => {
                info!("Airing {special} for the {}:00 slot", now.format("%H"));
                self.special(special, &now).await
            }
            None => self.next_track().await,
        }
    }

    async fn special(&mut self, special: Special, now: &DateTime<FixedOffset>) -> usize {
        let transition = match special {
            Special::News => Transition::News,
            Special::Weather => Transition::Weather,
            Special::Podcast => Transition::Podcast,
        };
        let line = self.dj.transition(&transition);
        let mut queued = self
            .speak(&line, DJ_DIR, "", SegmentKind::Transition)
            .await;

        queued += match special {
            Special::News => {
                let text = self.news.bulletin().await;
                self.speak(&text, NEWS_DIR, &hourly_salt(now), SegmentKind::News)
                    .await
            }
            Special::Weather => {
                let text = self.weather.bulletin().await;
                self.speak(&text, WEATHER_DIR, &hourly_salt(now), SegmentKind::Weather)
                    .await
            }
            Special::Podcast => match self.podcasts.next_podcast().await {
                Some(path) => self.enqueue_file(path, SegmentKind::Podcast, None).await,
                None => {
                    info!("No podcasts to air");
                    0
                }
            },
        };

        queued
    }

    /// Picks the next track whose file can still be opened. The listing may
    /// be stale, so a vanished file is skipped in favour of the next one.
    async fn playable_track(&mut self) -> Option<Segment> {
        for _ in 0..MAX_TRACK_ATTEMPTS {
            let path = self.catalog.next_track().await?;
            match Segment::from_file(&path, SegmentKind::Track, None).await {
                Ok(mut segment) => {
                    segment.track = Some(probe_track(&path).await);
                    return Some(segment);
                }
                Err(e) => warn!("Skipping track: {e:#}"),
            }
        }

        None
    }

    async fn next_track(&mut self) -> usize {
        let Some(segment) = self.playable_track().await else {
            debug!("No tracks available");
            return 0;
        };
        let info = segment.track.clone().unwrap_or_default();
        let mut queued = 0;

        if let Some(previous) = self.last_track.take() {
            let comment = self.dj.comment(&previous).await;
            queued += self
                .speak(&comment, DJ_DIR, "", SegmentKind::Transition)
                .await;
        }

        let line = self.dj.transition(&Transition::Track(info.clone()));
        queued += self
            .speak(&line, DJ_DIR, "", SegmentKind::Transition)
            .await;

        self.last_track = Some(info);
        queued + self.enqueue(segment).await
    }

    /// Synthesizes `text` and queues it. A failed synthesis only drops this
    /// one line.
    async fn speak(&self, text: &str, subdir: &str, salt: &str, kind: SegmentKind) -> usize {
        match self.tts.synthesize(text, subdir, salt).await {
            Ok(path) => self.enqueue_file(path, kind, None).await,
            Err(e) => {
                warn!("Skipping {kind} segment: {e}");
                0
            }
        }
    }

    async fn enqueue_file(&self, path: PathBuf, kind: SegmentKind, track: Option<TrackInfo>) -> usize {
        match Segment::from_file(path, kind, track).await {
            Ok(segment) => self.enqueue(segment).await,
            Err(e) => {
                warn!("Skipping {kind} segment: {e:#}");
                0
            }
        }
    }

    async fn enqueue(&self, segment: Segment) -> usize {
        debug!("Queueing [{}] {}", segment.kind, segment.file_name());
        match self.queue.send(segment).await {
            Ok(()) => 1,
            Err(e) => {
                warn!("{e}");
                0
            }
        }
    }

    /// Generates while the queue is below its low-water mark, then sleeps for
    /// one cycle interval. Exits once `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            while self.queue.len() < self.low_water {
                let queued = tokio::select! {
                    _ = cancel.cancelled() => break,
                    queued = self.generate_cycle() => queued,
                };

                if queued == 0 {
                    break;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.cycle_interval) => {}
            }
        }

        info!("Segment producer stopped");
    }
}
