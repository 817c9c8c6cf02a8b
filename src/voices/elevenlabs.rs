//! ElevenLabs HTTP text-to-speech.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;

use super::Synthesizer;
use crate::config::TtsConfig;

const OUTPUT_FORMAT: &str = "mp3_44100_128";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabs {
    client: reqwest::Client,
    base_url: String,
    voice_id: String,
    model_id: String,
    api_key: String,
}

impl ElevenLabs {
    pub fn from_env(config: &TtsConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("{} is not set", config.api_key_env))?;

        Self::new(config, api_key)
    }

    pub fn new(config: &TtsConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Synthesizer for ElevenLabs {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<()> {
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={OUTPUT_FORMAT}",
            self.base_url, self.voice_id
        );
        let request = SpeechRequest {
            text,
            model_id: &self.model_id,
        };

        let audio = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "audio/mpeg")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .context("ElevenLabs request failed")?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::write(dest, &audio)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))
    }
}
