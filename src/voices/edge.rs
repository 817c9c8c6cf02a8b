//! Microsoft Edge neural voices through the `edge-tts` command line tool.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use super::Synthesizer;
use crate::config::TtsConfig;

pub struct EdgeTts {
    binary: String,
    voice: String,
    rate: String,
    volume: String,
}

impl EdgeTts {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            binary: config.edge_binary.clone(),
            voice: config.voice.clone(),
            rate: config.rate.clone(),
            volume: config.volume.clone(),
        }
    }

    pub fn args(&self, text: &str, dest: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            self.voice.clone(),
            // `=` form so negative percentages are not taken for flags
            format!("--rate={}", self.rate),
            format!("--volume={}", self.volume),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            dest.display().to_string(),
        ]
    }
}

#[async_trait]
impl Synthesizer for EdgeTts {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<()> {
        let output = tokio::process::Command::new(&self.binary)
            .args(self.args(text, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed (exit code {code}): {stderr}",
                self.binary,
                code = output.status.code().unwrap_or_default(),
                stderr = String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(())
    }
}
