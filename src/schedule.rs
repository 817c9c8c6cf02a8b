//! Hour-slot bookkeeping for news, weather and podcasts.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

use crate::config::ScheduleConfig;

/// Source of "now" in the station's reference timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("Invalid UTC offset: {utc_offset_hours} hours"))?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Segments that interrupt the music at configured hours, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Special {
    News,
    Weather,
    Podcast,
}

impl Special {
    pub const BY_PRIORITY: [Special; 3] = [Special::News, Special::Weather, Special::Podcast];
}

impl Display for Special {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Special::News => "news",
            Special::Weather => "weather",
            Special::Podcast => "podcast",
        };
        write!(f, "{name}")
    }
}

/// A configured hour on a given day.
pub type Slot = (NaiveDate, u32);

pub fn slot_of(now: &DateTime<FixedOffset>) -> Slot {
    (now.date_naive(), now.hour())
}

/// Cache salt that changes once per reference-zone hour.
pub fn hourly_salt(now: &DateTime<FixedOffset>) -> String {
    now.format("%Y-%m-%d-%H").to_string()
}

#[derive(Clone, Debug, Default)]
pub struct ScheduleState {
    news_hours: BTreeSet<u32>,
    weather_hours: BTreeSet<u32>,
    podcast_hours: BTreeSet<u32>,

    last_news: Option<Slot>,
    last_weather: Option<Slot>,
    last_podcast: Option<Slot>,
}

impl ScheduleState {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self {
            news_hours: config.news_hours.clone(),
            weather_hours: config.weather_hours.clone(),
            podcast_hours: config.podcast_hours.clone(),
            ..Default::default()
        }
    }

    fn slot(&self, special: Special) -> (&BTreeSet<u32>, &Option<Slot>) {
        match special {
            Special::News => (&self.news_hours, &self.last_news),
            Special::Weather => (&self.weather_hours, &self.last_weather),
            Special::Podcast => (&self.podcast_hours, &self.last_podcast),
        }
    }

    fn last_mut(&mut self, special: Special) -> &mut Option<Slot> {
        match special {
            Special::News => &mut self.last_news,
            Special::Weather => &mut self.last_weather,
            Special::Podcast => &mut self.last_podcast,
        }
    }

    /// Whether `special` is configured for this hour and has not aired in it yet.
    pub fn is_due(&self, special: Special, now: &DateTime<FixedOffset>) -> bool {
        let current = slot_of(now);
        let (hours, last) = self.slot(special);

        hours.contains(&current.1) && *last != Some(current)
    }

    /// Picks at most one due special, highest priority first, and marks its
    /// slot consumed right away. Lower priority specials due in the same hour
    /// stay due for later calls.
    pub fn take_due(&mut self, now: &DateTime<FixedOffset>) -> Option<Special> {
        let special = Special::BY_PRIORITY
            .into_iter()
            .find(|special| self.is_due(*special, now))?;

        *self.last_mut(special) = Some(slot_of(now));
        Some(special)
    }
}
