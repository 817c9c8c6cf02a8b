//! Text-to-speech providers and the on-disk cache in front of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::{TtsConfig, TtsProvider};
use crate::encoder::Encoder;
use crate::error::TtsError;

pub mod edge;
pub mod elevenlabs;
#[cfg(feature = "espeak")]
pub mod espeak;

/// Renders speech for `text` as an MP3 file at `dest`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<()>;
}

#[cfg_attr(not(feature = "espeak"), allow(unused_variables))]
pub fn from_config(config: &TtsConfig, encoder: Arc<dyn Encoder>) -> Result<Arc<dyn Synthesizer>> {
    match config.provider {
        TtsProvider::Edge => Ok(Arc::new(edge::EdgeTts::new(config))),
        TtsProvider::ElevenLabs => Ok(Arc::new(elevenlabs::ElevenLabs::from_env(config)?)),
        #[cfg(feature = "espeak")]
        TtsProvider::Espeak => Ok(Arc::new(espeak::Espeak::new(&config.voice, encoder))),
        #[cfg(not(feature = "espeak"))]
        TtsProvider::Espeak => Err(anyhow!(
            "espeak support requires building with the `espeak` feature"
        )),
    }
}

/// Cache key for `text` rendered with `salt`.
pub fn cache_key(text: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Content-addressed cache of synthesized speech.
///
/// Identical `(text, salt)` pairs map to the same file, so repeated lines
/// are only synthesized once.
#[derive(Clone)]
pub struct TtsCache {
    root: PathBuf,
    synth: Arc<dyn Synthesizer>,
}

impl TtsCache {
    pub fn new(root: impl Into<PathBuf>, synth: Arc<dyn Synthesizer>) -> Self {
        Self {
            root: root.into(),
            synth,
        }
    }

    pub fn path_for(&self, text: &str, subdir: &str, salt: &str) -> PathBuf {
        self.root
            .join(subdir)
            .join(format!("{}.mp3", cache_key(text, salt)))
    }

    pub async fn synthesize(&self, text: &str, subdir: &str, salt: &str) -> Result<PathBuf, TtsError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::Failed(anyhow!("Nothing to say")));
        }

        let path = self.path_for(text, subdir, salt);
        if let Ok(metadata) = tokio::fs::metadata(&path).await {
            if metadata.len() > 0 {
                trace!("TTS cache hit: {}", path.display());
                return Ok(path);
            }
        }

        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let tmp = path.with_extension("tmp.mp3");
        if let Err(e) = self.synth.synthesize(text, &tmp).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(TtsError::Failed(e));
        }

        let size = tokio::fs::metadata(&tmp).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(TtsError::EmptyAudio);
        }

        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move speech to {}", path.display()))?;

        debug!("Synthesized {size} bytes into {}", path.display());
        Ok(path)
    }
}
