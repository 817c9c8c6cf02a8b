//! Cached silent MP3 clip used for boundary padding and queue underruns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;

use crate::constants::{EMERGENCY_SILENCE_SECS, MIN_SILENCE_CLIP_BYTES};
use crate::encoder::Encoder;

pub struct SilenceReservoir {
    dir: PathBuf,
    encoder: Arc<dyn Encoder>,
    clip_secs: f64,
}

fn clip_name(secs: f64) -> String {
    format!("silence_{}ms", (secs * 1000.0).round() as u64)
}

async fn usable_clip(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.is_file() && metadata.len() >= MIN_SILENCE_CLIP_BYTES,
        Err(_) => false,
    }
}

impl SilenceReservoir {
    pub fn new(dir: impl Into<PathBuf>, encoder: Arc<dyn Encoder>, clip_secs: f64) -> Self {
        Self {
            dir: dir.into(),
            encoder,
            clip_secs: if clip_secs > 0.0 { clip_secs } else { 3.0 },
        }
    }

    pub fn clip_path(&self, secs: f64) -> PathBuf {
        self.dir.join(format!("{}.mp3", clip_name(secs)))
    }

    /// Makes sure the default clip exists, rendering it only when it is
    /// missing or too small to be valid.
    pub async fn ensure_clip(&self) -> Result<PathBuf> {
        self.ensure(self.clip_secs).await
    }

    async fn ensure(&self, secs: f64) -> Result<PathBuf> {
        let path = self.clip_path(secs);
        if usable_clip(&path).await {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        // ffmpeg picks the container from the extension, so keep .mp3 last
        let tmp = self.dir.join(format!("{}.tmp.mp3", clip_name(secs)));
        self.encoder.render_silence(&tmp, secs).await?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move silence clip to {}", path.display()))?;

        if !usable_clip(&path).await {
            return Err(anyhow!("Rendered silence clip {} is too small", path.display()));
        }

        info!("Silence clip ready: {}", path.display());
        Ok(path)
    }

    async fn read_clip(&self, secs: f64) -> Result<Bytes> {
        let path = self.ensure(secs).await?;
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Bytes::from(data))
    }

    /// About `secs` seconds of silence split into `chunk_size` pieces, cut
    /// proportionally from the cached clip. Never fails: an unusable clip
    /// falls back to a tiny freshly rendered one, and if that fails too the
    /// result is empty.
    pub async fn chunks(&self, secs: f64, chunk_size: usize) -> Vec<Bytes> {
        let chunk_size = chunk_size.max(1);

        match self.read_clip(self.clip_secs).await {
            Ok(clip) => {
                let wanted = (clip.len() as f64 * secs / self.clip_secs) as usize;
                let data = clip.slice(..wanted.min(clip.len()));
                return split(data, chunk_size);
            }
            Err(e) => warn!("Silence clip unavailable: {e:#}"),
        }

        match self.read_clip(EMERGENCY_SILENCE_SECS).await {
            Ok(clip) => split(clip, chunk_size),
            Err(e) => {
                error!("Emergency silence failed: {e:#}");
                Vec::new()
            }
        }
    }
}

fn split(data: Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect()
}
