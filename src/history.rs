//! Rolling log of what went on air, for "now playing" lookups.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants::{NOW_PLAYING_FILE, NOW_PLAYING_FILE_TMP};
use crate::segment::{Segment, SegmentKind, TrackInfo};

pub type SharedHistory = Arc<RwLock<PlaybackHistory>>;

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub started_at: DateTime<Utc>,
    pub kind: SegmentKind,
    pub artist: String,
    pub title: String,
}

/// On-disk shape read by the web front-end.
#[derive(Debug, Deserialize, Serialize)]
pub struct NowPlayingEntry {
    /// Unix time in seconds
    pub t: f64,
    pub artist: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NowPlayingFile {
    /// What listeners hear right now, allowing for player lag
    #[serde(default)]
    pub current: Option<NowPlayingEntry>,
    pub history: Vec<NowPlayingEntry>,
}

impl From<&HistoryEntry> for NowPlayingEntry {
    fn from(entry: &HistoryEntry) -> Self {
        NowPlayingEntry {
            t: entry.started_at.timestamp_millis() as f64 / 1000.0,
            artist: entry.artist.clone(),
            title: entry.title.clone(),
            kind: entry.kind,
        }
    }
}

#[derive(Debug)]
pub struct PlaybackHistory {
    window: Duration,
    entries: VecDeque<HistoryEntry>,

    /// Spoken segments are attributed to the last track heard
    last_track: Option<TrackInfo>,
}

impl PlaybackHistory {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
            last_track: None,
        }
    }

    pub fn shared(window: Duration) -> SharedHistory {
        Arc::new(RwLock::new(Self::new(window)))
    }

    /// Logs a segment that just started streaming and drops entries older
    /// than the window.
    pub fn record(&mut self, segment: &Segment, now: DateTime<Utc>) {
        let info = match segment.kind {
            SegmentKind::Track => {
                let info = segment.track.clone().unwrap_or_default();
                self.last_track = Some(info.clone());
                info
            }
            SegmentKind::Transition | SegmentKind::SystemFallback => {
                self.last_track.clone().unwrap_or_default()
            }
            SegmentKind::News | SegmentKind::Weather | SegmentKind::Podcast => {
                TrackInfo::default()
            }
        };

        self.entries.push_back(HistoryEntry {
            started_at: now,
            kind: segment.kind,
            artist: info.artist,
            title: info.title,
        });
        self.prune(now);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let Ok(window) = chrono::Duration::from_std(self.window) else {
            return;
        };
        let cutoff = now - window;

        while self
            .entries
            .front()
            .is_some_and(|entry| entry.started_at < cutoff)
        {
            self.entries.pop_front();
        }
    }

    /// The entry listeners are hearing, given that players lag `delay`
    /// behind the stream. Falls back to the oldest entry while everything
    /// logged is still inside the delay.
    pub fn now_playing(&self, now: DateTime<Utc>, delay: Duration) -> Option<&HistoryEntry> {
        let delay = chrono::Duration::from_std(delay).unwrap_or_default();
        let audible_at = now - delay;

        self.entries
            .iter()
            .rev()
            .find(|entry| entry.started_at <= audible_at)
            .or_else(|| self.entries.front())
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the window and the entry audible at `now` (see [Self::now_playing])
    /// to `<dir>/.now_playing.json` via a temp file and a rename, so readers
    /// never see a partial file.
    pub async fn persist(&self, dir: &Path, now: DateTime<Utc>, delay: Duration) -> Result<()> {
        let file = NowPlayingFile {
            current: self.now_playing(now, delay).map(NowPlayingEntry::from),
            history: self.entries.iter().map(NowPlayingEntry::from).collect(),
        };
        let json = serde_json::to_vec(&file)?;

        let tmp = dir.join(NOW_PLAYING_FILE_TMP);
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, dir.join(NOW_PLAYING_FILE))
            .await
            .context("Failed to replace now playing file")?;

        Ok(())
    }
}
