//! Music and podcast folders.
//!
//! Both folders are re-read from disk while the station runs, so files
//! dropped in mid-broadcast are picked up without a restart.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const PLAYABLE_EXTENSIONS: [&str; 1] = ["mp3"];

pub fn is_playable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PLAYABLE_EXTENSIONS
                .iter()
                .any(|playable| ext.eq_ignore_ascii_case(playable))
        })
        .unwrap_or(false)
}

/// Lists playable files in `dir` as sorted, canonical, unique paths.
pub async fn scan_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if !is_playable(&path) || !entry.file_type().await?.is_file() {
            continue;
        }

        match tokio::fs::canonicalize(&path).await {
            Ok(path) => files.push(path),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }

    Ok(files.into_iter().sorted().dedup().collect())
}

/// Music tracks in shuffled cyclic order.
pub struct TrackCatalog {
    dir: PathBuf,
    tracks: Vec<PathBuf>,
    cursor: usize,
    rng: StdRng,
}

impl TrackCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_rng(dir, StdRng::from_os_rng())
    }

    /// Deterministic shuffling, for tests.
    pub fn with_seed(dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self::with_rng(dir, StdRng::seed_from_u64(seed))
    }

    fn with_rng(dir: impl Into<PathBuf>, rng: StdRng) -> Self {
        Self {
            dir: dir.into(),
            tracks: Vec::new(),
            cursor: 0,
            rng,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn list_tracks(&self) -> Result<Vec<PathBuf>> {
        scan_audio_files(&self.dir).await
    }

    /// Returns the next track, reshuffling a fresh listing after every full
    /// pass. `None` means the music folder is empty.
    pub async fn next_track(&mut self) -> Option<PathBuf> {
        if self.tracks.is_empty() {
            self.reload().await;
        }

        let track = self.tracks.get(self.cursor).cloned()?;
        self.cursor += 1;

        if self.cursor >= self.tracks.len() {
            debug!("Full pass over {} tracks, rescanning", self.tracks.len());
            self.reload().await;
        }

        Some(track)
    }

    async fn reload(&mut self) {
        self.tracks = match self.list_tracks().await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Error while scanning music folder: {e:?}");
                Vec::new()
            }
        };
        self.tracks.shuffle(&mut self.rng);
        self.cursor = 0;
    }
}

/// Pre-rendered podcast episodes, aired round-robin in file name order.
pub struct PodcastCatalog {
    dir: PathBuf,
    index: usize,
}

impl PodcastCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: 0,
        }
    }

    pub async fn next_podcast(&mut self) -> Option<PathBuf> {
        let episodes = match scan_audio_files(&self.dir).await {
            Ok(episodes) => episodes,
            Err(e) => {
                debug!("No podcasts available: {e}");
                return None;
            }
        };

        if episodes.is_empty() {
            return None;
        }

        let episode = episodes[self.index % episodes.len()].clone();
        self.index += 1;
        Some(episode)
    }
}
