//! What the DJ says between segments.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::fallback::{Chain, Outcome};
use crate::lang::{self, Language, Phrase};
use crate::producer::Commentary;
use crate::segment::TrackInfo;

const MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// What comes after the DJ line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Track(TrackInfo),
    News,
    Weather,
    Podcast,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct DjVoice {
    client: reqwest::Client,
    llm: LlmConfig,
    api_key: Option<String>,
    language: Language,
    city: String,
}

impl DjVoice {
    /// Reads the LLM key from the environment variable named in `llm`.
    pub fn new(llm: LlmConfig, language: Language, city: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(&llm.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            info!(
                "{} not set, DJ comments will use the built-in lines",
                llm.api_key_env
            );
        }
        Self::with_api_key(llm, api_key, language, city)
    }

    pub fn with_api_key(
        llm: LlmConfig,
        api_key: Option<String>,
        language: Language,
        city: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            llm,
            api_key,
            language,
            city: city.into(),
        })
    }

    async fn ask_llm(&self, track: &TrackInfo) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} not set", self.llm.api_key_env))?;

        let request = ChatRequest {
            model: &self.llm.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: lang::phrase(self.language, Phrase::DjSystem).to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: lang::format(
                        self.language,
                        Phrase::DjPrompt,
                        &[
                            ("artist", &track.artist),
                            ("title", &track.title),
                            ("city", &self.city),
                        ],
                    ),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.llm.base_url.trim_end_matches('/')
        );
        let body = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()?
            .bytes()
            .await?;

        let response: ChatResponse =
            serde_json::from_slice(&body).context("Malformed chat completion")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("Empty chat completion"))
    }

    fn fallback_comment(&self, track: &TrackInfo) -> String {
        lang::format(
            self.language,
            Phrase::DjFallback,
            &[("artist", &track.artist), ("title", &track.title)],
        )
    }
}

#[async_trait]
impl Commentary for DjVoice {
    async fn comment(&self, track: &TrackInfo) -> String {
        let outcome = Chain::new().then("llm", self.ask_llm(track)).run().await;

        if let Outcome::Success { source, .. } = &outcome {
            debug!("DJ comment for {track} from {source}");
        }
        outcome.unwrap_or_else(|_| self.fallback_comment(track))
    }

    fn transition(&self, next: &Transition) -> String {
        let lang = self.language;
        match next {
            Transition::Track(track) => lang::format(
                lang,
                Phrase::TransitionTrack,
                &[("artist", &track.artist), ("title", &track.title)],
            ),
            Transition::News => lang::phrase(lang, Phrase::TransitionNews).to_string(),
            Transition::Weather => lang::phrase(lang, Phrase::TransitionWeather).to_string(),
            Transition::Podcast => lang::phrase(lang, Phrase::TransitionPodcast).to_string(),
        }
    }
}
