//! Current conditions from the Open-Meteo forecast API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::RegionConfig;
use crate::lang::{self, Language, Phrase};
use crate::producer::Bulletin;

const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,\
weather_code,wind_speed_10m,wind_direction_10m,pressure_msl,precipitation";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Current {
    pub temperature_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub weather_code: Option<u32>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub pressure_msl: Option<f64>,
    pub precipitation: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Daily {
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Forecast {
    pub current: Current,
    #[serde(default)]
    pub daily: Option<Daily>,
}

pub struct WeatherDesk {
    client: reqwest::Client,
    base_url: String,
    region: RegionConfig,
    language: Language,
}

impl WeatherDesk {
    pub fn new(region: RegionConfig, language: Language) -> Result<Self> {
        Self::with_base_url(OPEN_METEO_URL, region, language)
    }

    pub fn with_base_url(base_url: &str, region: RegionConfig, language: Language) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            region,
            language,
        })
    }

    pub async fn forecast(&self) -> Result<Forecast> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v1/forecast", self.base_url),
            &[
                ("latitude", self.region.latitude.to_string()),
                ("longitude", self.region.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", self.region.timezone.clone()),
                ("forecast_days", "1".to_string()),
            ],
        )
        .context("Invalid weather service URL")?;

        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()?
            .bytes()
            .await?;

        serde_json::from_slice(&body).context("Malformed weather response")
    }

    pub fn render(&self, forecast: &Forecast) -> String {
        let lang = self.language;
        let current = &forecast.current;
        let round = |value: f64| format!("{}", value.round() as i64);

        let desc = lang::weather_desc(lang, current.weather_code.unwrap_or(2));
        let mut parts = vec![lang::format(
            lang,
            Phrase::WeatherIntro,
            &[("city", &self.region.city), ("desc", desc)],
        )];

        if let Some(temp) = current.temperature_2m {
            let mut line = lang::format(lang, Phrase::TempFormat, &[("n", &round(temp))]);
            if let Some(feels) = current.apparent_temperature {
                if feels.round() != temp.round() {
                    line.push_str(", ");
                    line.push_str(&lang::format(lang, Phrase::FeelsFormat, &[("n", &round(feels))]));
                }
            }
            parts.push(format!("{line}."));
        }

        let today = forecast.daily.as_ref().and_then(|daily| {
            Some((
                (*daily.temperature_2m_max.first()?)?,
                (*daily.temperature_2m_min.first()?)?,
            ))
        });
        if let Some((max, min)) = today {
            parts.push(format!(
                "{}.",
                lang::format(lang, Phrase::DailyFormat, &[("max", &round(max)), ("min", &round(min))])
            ));
        }

        if let Some(humidity) = current.relative_humidity_2m {
            parts.push(format!(
                "{}.",
                lang::format(lang, Phrase::HumidityFormat, &[("n", &round(humidity))])
            ));
        }

        if let Some(speed) = current.wind_speed_10m {
            let dir = lang::wind_direction(lang, current.wind_direction_10m.unwrap_or(0.0));
            parts.push(format!(
                "{}.",
                lang::format(lang, Phrase::WindFormat, &[("speed", &round(speed)), ("dir", dir)])
            ));
        }

        if let Some(pressure) = current.pressure_msl {
            parts.push(format!(
                "{}.",
                lang::format(lang, Phrase::PressureFormat, &[("n", &round(pressure))])
            ));
        }

        if let Some(precip) = current.precipitation.filter(|precip| *precip > 0.0) {
            parts.push(format!(
                "{}.",
                lang::format(lang, Phrase::PrecipFormat, &[("n", &format!("{precip:.1}"))])
            ));
        }

        parts.join(" ")
    }

    fn unavailable(&self) -> String {
        lang::format(
            self.language,
            Phrase::WeatherUnavailable,
            &[("city", &self.region.city)],
        )
    }
}

#[async_trait]
impl Bulletin for WeatherDesk {
    async fn bulletin(&self) -> String {
        match self.forecast().await {
            Ok(forecast) => self.render(&forecast),
            Err(e) => {
                warn!("Weather unavailable: {e:#}");
                self.unavailable()
            }
        }
    }
}
