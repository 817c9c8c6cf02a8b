use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentKind {
    Track,
    /// Spoken DJ line: commentary or a transition
    Transition,
    News,
    Weather,
    Podcast,
    /// Announcement aired when there is nothing else to play
    SystemFallback,
}

impl SegmentKind {
    pub fn is_spoken(&self) -> bool {
        !matches!(self, SegmentKind::Track | SegmentKind::Podcast)
    }
}

impl Display for SegmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SegmentKind::Track => "track",
            SegmentKind::Transition => "transition",
            SegmentKind::News => "news",
            SegmentKind::Weather => "weather",
            SegmentKind::Podcast => "podcast",
            SegmentKind::SystemFallback => "system-fallback",
        };
        write!(f, "{name}")
    }
}

/// Display metadata of a music track.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
}

impl TrackInfo {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

impl Display for TrackInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// One playable audio file, handed from the producer to the broadcaster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub kind: SegmentKind,
    pub size: u64,

    /// Only present for [SegmentKind::Track]
    pub track: Option<TrackInfo>,
}

impl Segment {
    /// Builds a segment from an existing, non-empty file.
    pub async fn from_file(
        path: impl Into<PathBuf>,
        kind: SegmentKind,
        track: Option<TrackInfo>,
    ) -> Result<Segment> {
        let path = path.into();
        let size = playable_size(&path)
            .await
            .with_context(|| format!("Segment file {} is not playable", path.display()))?;

        Ok(Segment {
            path,
            kind,
            size,
            track: if kind == SegmentKind::Track { track } else { None },
        })
    }

    /// Current size of the backing file, or `None` if it vanished or is empty.
    pub async fn playable(&self) -> Option<u64> {
        playable_size(&self.path).await.ok()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

async fn playable_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path).await?;

    if !metadata.is_file() {
        return Err(anyhow!("not a regular file"));
    }
    if metadata.len() == 0 {
        return Err(anyhow!("file is empty"));
    }

    Ok(metadata.len())
}
