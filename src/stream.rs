//! Endless byte source shared by both broadcaster variants.
//!
//! Pulls segments off the queue, pads segment boundaries with silence and
//! fills every gap (empty queue, vanished file, read error) with silence so
//! the output never stops.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::StreamConfig;
use crate::history::SharedHistory;
use crate::queue::SegmentReceiver;
use crate::segment::Segment;
use crate::silence::SilenceReservoir;

/// Pause after an underrun that produced no silence at all.
const EMPTY_SILENCE_BACKOFF: Duration = Duration::from_millis(100);

pub struct SegmentStream {
    rx: SegmentReceiver,
    silence: Arc<SilenceReservoir>,
    history: SharedHistory,
    config: StreamConfig,

    /// Where `.now_playing.json` is written, if anywhere
    now_playing_dir: Option<PathBuf>,

    pending: VecDeque<Bytes>,
    current: Option<ReaderStream<File>>,
}

impl SegmentStream {
    pub fn new(
        rx: SegmentReceiver,
        silence: Arc<SilenceReservoir>,
        history: SharedHistory,
        config: StreamConfig,
    ) -> Self {
        Self {
            rx,
            silence,
            history,
            config,
            now_playing_dir: None,
            pending: VecDeque::new(),
            current: None,
        }
    }

    pub fn with_now_playing_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.now_playing_dir = Some(dir.into());
        self
    }

    pub fn history(&self) -> SharedHistory {
        self.history.clone()
    }

    /// Next piece of the broadcast. Never fails and never waits longer than
    /// the dequeue bound plus one silence render.
    pub async fn next_chunk(&mut self) -> Bytes {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return chunk;
            }

            if let Some(reader) = &mut self.current {
                match reader.next().await {
                    Some(Ok(chunk)) => return chunk,
                    Some(Err(e)) => {
                        warn!("Segment read error: {e}");
                        self.current = None;
                        self.queue_silence(self.config.underrun_silence_secs).await;
                        continue;
                    }
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            self.advance().await;
        }
    }

    async fn queue_silence(&mut self, secs: f64) {
        let chunks = self.silence.chunks(secs, self.config.chunk_size).await;
        self.pending.extend(chunks);
    }

    async fn underrun(&mut self) {
        self.queue_silence(self.config.underrun_silence_secs).await;
        if self.pending.is_empty() {
            tokio::time::sleep(EMPTY_SILENCE_BACKOFF).await;
        }
    }

    async fn advance(&mut self) {
        let Some(segment) = self.rx.pop_timeout(self.config.dequeue_wait()).await else {
            debug!("Queue empty, sending silence");
            self.underrun().await;
            return;
        };

        if segment.playable().await.is_none() {
            warn!("Segment missing or empty: {}", segment.path.display());
            self.underrun().await;
            return;
        }

        let file = match File::open(&segment.path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {}: {e}", segment.path.display());
                self.underrun().await;
                return;
            }
        };

        self.on_air(&segment).await;

        self.queue_silence(self.config.boundary_pad_secs).await;
        self.current = Some(ReaderStream::with_capacity(file, self.config.chunk_size));
    }

    async fn on_air(&self, segment: &Segment) {
        match &segment.track {
            Some(track) => info!("Playing [{}]: {track}", segment.kind),
            None => info!("Playing [{}]: {}", segment.kind, segment.file_name()),
        }

        let now = Utc::now();
        let mut history = self.history.write().await;
        history.record(segment, now);

        if let Some(dir) = &self.now_playing_dir {
            let delay = self.config.now_playing_delay();
            if let Err(e) = history.persist(dir, now, delay).await {
                warn!("Failed to write now playing file: {e:#}");
            }
        }
    }
}
