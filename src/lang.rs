//! Localized phrases spoken by the station.
//!
//! Templates use `{name}` placeholders filled by [`fill`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phrase {
    DjFallback,
    DjSystem,
    DjPrompt,
    TransitionNews,
    TransitionWeather,
    TransitionPodcast,
    TransitionTrack,
    NewsUnavailable,
    NewsIntro,
    WeatherUnavailable,
    WeatherIntro,
    TempFormat,
    FeelsFormat,
    DailyFormat,
    HumidityFormat,
    WindFormat,
    PressureFormat,
    PrecipFormat,
    Welcome,
}

pub fn phrase(lang: Language, key: Phrase) -> &'static str {
    match lang {
        Language::En => english(key),
        Language::Ru => russian(key),
    }
}

fn english(key: Phrase) -> &'static str {
    match key {
        Phrase::DjFallback => "That was {artist} with «{title}». Great track! Up next.",
        Phrase::DjSystem => "You are a radio DJ. Reply in 2-3 short phrases in English only. Write an interesting fact about the artist or the song. No greetings, straight to the point.",
        Phrase::DjPrompt => "Artist: {artist}. Song: {title}. Listeners' city: {city}.",
        Phrase::TransitionNews => "And now, the news briefing!",
        Phrase::TransitionWeather => "And now about the weather.",
        Phrase::TransitionPodcast => "And now, a podcast!",
        Phrase::TransitionTrack => "Up next, {artist}, «{title}».",
        Phrase::NewsUnavailable => "News is temporarily unavailable. Back to the music.",
        Phrase::NewsIntro => "News bulletin. {date}.",
        Phrase::WeatherUnavailable => "Weather for {city} is temporarily unavailable.",
        Phrase::WeatherIntro => "Weather in {city}. {desc}.",
        Phrase::TempFormat => "Currently {n} degrees",
        Phrase::FeelsFormat => "feels like {n} degrees",
        Phrase::DailyFormat => "High {max}, low {min} degrees",
        Phrase::HumidityFormat => "Humidity {n} percent",
        Phrase::WindFormat => "Wind {speed} kilometers per hour, {dir}",
        Phrase::PressureFormat => "Pressure {n} hectopascals",
        Phrase::PrecipFormat => "Precipitation {n} millimeters",
        Phrase::Welcome => "Welcome to AI Radio. Add mp3 files to the music folder and restart.",
    }
}

fn russian(key: Phrase) -> &'static str {
    match key {
        Phrase::DjFallback => "Только что прозвучал {artist} — «{title}». Отличный трек! Следующий.",
        Phrase::DjSystem => "Ты диджей на радио. Отвечай ТОЛЬКО 2-3 короткими фразами на русском. Напиши интересный факт об исполнителе или о песне. Без приветствий, сразу по делу.",
        Phrase::DjPrompt => "Исполнитель: {artist}. Песня: {title}. Город слушателей: {city}.",
        Phrase::TransitionNews => "А теперь выпуск новостей!",
        Phrase::TransitionWeather => "А теперь о погоде.",
        Phrase::TransitionPodcast => "А сейчас подкаст!",
        Phrase::TransitionTrack => "А сейчас — {artist}, «{title}».",
        Phrase::NewsUnavailable => "Новости временно недоступны. Возвращаемся к музыке.",
        Phrase::NewsIntro => "Краткий выпуск новостей. {date}.",
        Phrase::WeatherUnavailable => "Прогноз погоды для {city} временно недоступен.",
        Phrase::WeatherIntro => "Погода в {city}. {desc}.",
        Phrase::TempFormat => "Сейчас {n} градусов",
        Phrase::FeelsFormat => "ощущается как {n} градусов",
        Phrase::DailyFormat => "Днём до {max}, ночью до {min} градусов",
        Phrase::HumidityFormat => "Влажность {n} процентов",
        Phrase::WindFormat => "Ветер {speed} километров в час, {dir}",
        Phrase::PressureFormat => "Давление {n} гектопаскалей",
        Phrase::PrecipFormat => "Осадки {n} миллиметров",
        Phrase::Welcome => "Добро пожаловать на AI Радио. Добавьте mp3 в папку music и перезапустите.",
    }
}

/// Replaces every `{name}` placeholder with its value.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
}

pub fn format(lang: Language, key: Phrase, values: &[(&str, &str)]) -> String {
    fill(phrase(lang, key), values)
}

const MONTHS_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const MONTHS_RU: [&str; 12] = [
    "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября",
    "октября", "ноября", "декабря",
];

pub fn date_str(lang: Language, date: NaiveDate) -> String {
    let months = match lang {
        Language::En => &MONTHS_EN,
        Language::Ru => &MONTHS_RU,
    };
    format!("{} {}", date.day(), months[date.month0() as usize])
}

/// Describes a WMO weather code, falling back to "partly cloudy".
pub fn weather_desc(lang: Language, code: u32) -> &'static str {
    let desc = match lang {
        Language::En => match code {
            0 => Some("clear sky"),
            1 => Some("mainly clear"),
            2 => Some("partly cloudy"),
            3 => Some("overcast"),
            45 => Some("foggy"),
            48 => Some("rime fog"),
            51 => Some("light drizzle"),
            53 => Some("drizzle"),
            55 => Some("dense drizzle"),
            61 => Some("slight rain"),
            63 => Some("rain"),
            65 => Some("heavy rain"),
            66 => Some("freezing rain"),
            67 => Some("heavy freezing rain"),
            71 => Some("slight snow"),
            73 => Some("snow"),
            75 => Some("heavy snow"),
            77 => Some("snow grains"),
            80 => Some("slight rain showers"),
            81 => Some("rain showers"),
            82 => Some("heavy rain showers"),
            85 => Some("slight snow showers"),
            86 => Some("heavy snow showers"),
            95 => Some("thunderstorm"),
            96 => Some("thunderstorm with hail"),
            99 => Some("heavy thunderstorm with hail"),
            _ => None,
        },
        Language::Ru => match code {
            0 => Some("ясно"),
            1 => Some("преимущественно ясно"),
            2 => Some("переменная облачность"),
            3 => Some("пасмурно"),
            45 => Some("туман"),
            48 => Some("изморозь"),
            51 | 53 | 55 => Some("морось"),
            61 => Some("небольшой дождь"),
            63 => Some("дождь"),
            65 => Some("сильный дождь"),
            66 => Some("ледяной дождь"),
            67 => Some("сильный ледяной дождь"),
            71 => Some("небольшой снег"),
            73 => Some("снег"),
            75 => Some("сильный снег"),
            77 => Some("снежная крупа"),
            80 => Some("небольшой ливень"),
            81 => Some("ливень"),
            82 => Some("сильный ливень"),
            85 => Some("небольшой снегопад"),
            86 => Some("снегопад"),
            95 => Some("гроза"),
            96 => Some("гроза с градом"),
            99 => Some("гроза с сильным градом"),
            _ => None,
        },
    };

    desc.unwrap_or_else(|| weather_desc(lang, 2))
}

/// Names the compass point a wind blows from, in 45 degree sectors.
pub fn wind_direction(lang: Language, degrees: f64) -> &'static str {
    const EN: [&str; 8] = [
        "north", "northeast", "east", "southeast", "south", "southwest", "west", "northwest",
    ];
    const RU: [&str; 8] = [
        "северный",
        "северо-восточный",
        "восточный",
        "юго-восточный",
        "южный",
        "юго-западный",
        "западный",
        "северо-западный",
    ];

    let sector = ((degrees.rem_euclid(360.0) + 22.5) / 45.0) as usize % 8;
    match lang {
        Language::En => EN[sector],
        Language::Ru => RU[sector],
    }
}

/// RSS feeds read for the news bulletin in each language.
pub fn news_feeds(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::En => &[
            "https://feeds.bbci.co.uk/news/rss.xml",
            "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
            "https://feeds.npr.org/1001/rss.xml",
            "https://www.theguardian.com/world/rss",
        ],
        Language::Ru => &[
            "https://ria.ru/export/rss2/archive/index.xml",
            "https://lenta.ru/rss/news",
            "https://www.vedomosti.ru/rss/news",
            "https://tass.ru/rss/v2.xml",
        ],
    }
}
