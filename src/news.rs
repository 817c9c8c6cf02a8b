//! Hourly news bulletin assembled from RSS headlines.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::lang::{self, Language, Phrase};
use crate::producer::Bulletin;
use crate::schedule::Clock;

const HEADLINES_PER_FEED: usize = 3;
const FEED_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref ITEM_RE: Regex =
        Regex::new(r"(?s)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)>").unwrap();
    static ref TITLE_RE: Regex = Regex::new(r"(?s)<title\b[^>]*>(.*?)</title>").unwrap();
    static ref CDATA_RE: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

pub struct NewsDesk {
    client: reqwest::Client,
    feeds: Vec<String>,
    limit: usize,
    language: Language,
    clock: Arc<dyn Clock>,
}

impl NewsDesk {
    pub fn new(language: Language, limit: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        let feeds = lang::news_feeds(language)
            .iter()
            .map(|feed| feed.to_string())
            .collect();
        Self::with_feeds(feeds, language, limit, clock)
    }

    pub fn with_feeds(
        feeds: Vec<String>,
        language: Language,
        limit: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FEED_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            feeds,
            limit,
            language,
            clock,
        })
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        self.client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("Failed to read feed body from {url}"))
    }

    /// Collects up to `limit` unique headlines, feed by feed.
    pub async fn headlines(&self) -> Vec<String> {
        let mut headlines: Vec<String> = Vec::new();

        for url in &self.feeds {
            if headlines.len() >= self.limit {
                break;
            }

            let body = match self.fetch_feed(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Skipping news feed: {e:#}");
                    continue;
                }
            };

            for title in parse_titles(&body).into_iter().take(HEADLINES_PER_FEED) {
                if headlines.len() >= self.limit {
                    break;
                }
                if !headlines.contains(&title) {
                    headlines.push(title);
                }
            }
        }

        headlines
    }

    pub fn render(&self, headlines: &[String]) -> String {
        if headlines.is_empty() {
            return lang::phrase(self.language, Phrase::NewsUnavailable).to_string();
        }

        let date = lang::date_str(self.language, self.clock.now().date_naive());
        let intro = lang::format(self.language, Phrase::NewsIntro, &[("date", &date)]);

        std::iter::once(intro)
            .chain(
                headlines
                    .iter()
                    .enumerate()
                    .map(|(i, title)| format!("{}. {title}", i + 1)),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Bulletin for NewsDesk {
    async fn bulletin(&self) -> String {
        let headlines = self.headlines().await;
        info!("News bulletin with {} headlines", headlines.len());
        self.render(&headlines)
    }
}

/// Extracts item titles from an RSS or Atom document, in document order.
pub fn parse_titles(feed: &str) -> Vec<String> {
    ITEM_RE
        .captures_iter(feed)
        .filter_map(|item| {
            let title = TITLE_RE.captures(item.get(1)?.as_str())?.get(1)?.as_str();
            let title = clean_text(title);
            (!title.is_empty()).then_some(title)
        })
        .collect()
}

fn clean_text(raw: &str) -> String {
    let text = CDATA_RE.replace_all(raw, "$1");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    WHITESPACE_RE.replace_all(text.trim(), " ").to_string()
}
