//! Unit tests for the config module

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::{parse, BroadcastMode, Config, IcecastConfig, TtsProvider};
    use crate::lang::Language;

    #[test]
    fn test_empty_file_is_a_valid_config() {
        let config = parse("").unwrap();

        assert_eq!(config.schedule.queue_capacity, 5);
        assert_eq!(config.stream.chunk_size, 8192);
        assert_eq!(config.icecast.mode, BroadcastMode::Raw);
        assert_eq!(config.tts.provider, TtsProvider::Edge);
        assert_eq!(config.station.language, Language::En);
        assert!(config.schedule.news_hours.contains(&9));
    }

    #[test]
    fn test_stream_defaults() {
        let config = parse("").unwrap();

        // One underrun must not hold back a freshly queued segment for long
        assert_eq!(config.stream.underrun_silence_secs, 1.0);
        assert_eq!(config.stream.now_playing_delay(), Duration::from_secs(15));

        let config = parse("[stream]\nnow_playing_delay_secs = 4\n").unwrap();
        assert_eq!(config.stream.now_playing_delay(), Duration::from_secs(4));
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse(
            r#"
            [station]
            name = "Test FM"
            language = "ru"

            [schedule]
            news_hours = [8]
            queue_capacity = 3
            low_water = 10

            [icecast]
            url = "http://radio.example.com:8010/"
            mode = "transcode"

            [tts]
            provider = "elevenlabs"
            "#,
        )
        .unwrap();

        assert_eq!(config.station.name, "Test FM");
        assert_eq!(config.station.language, Language::Ru);
        assert_eq!(config.schedule.news_hours.len(), 1);
        assert_eq!(config.schedule.low_water_mark(), 3);
        assert_eq!(config.icecast.mode, BroadcastMode::Transcode);
        assert_eq!(config.tts.provider, TtsProvider::ElevenLabs);
        assert_eq!(
            config.icecast.host_port().unwrap(),
            ("radio.example.com".to_string(), 8010)
        );
    }

    #[test]
    fn test_invalid_hour_is_rejected() {
        let result = parse("[schedule]\nweather_hours = [25]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = parse("[schedule]\nqueue_capacity = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_host_port_defaults() {
        let mut icecast = IcecastConfig {
            url: "icecast://stream.local".to_string(),
            ..Default::default()
        };
        assert_eq!(
            icecast.host_port().unwrap(),
            ("stream.local".to_string(), 8000)
        );

        icecast.url = String::new();
        assert_eq!(icecast.host_port().unwrap(), ("127.0.0.1".to_string(), 8000));

        icecast.url = "http://host:notaport".to_string();
        assert!(icecast.host_port().is_err());
    }

    #[test]
    fn test_byte_rate_includes_multiplier() {
        let icecast = IcecastConfig {
            bitrate_kbps: 128,
            stream_rate_multiplier: 1.0,
            ..Default::default()
        };
        assert_eq!(icecast.byte_rate(), 16_000.0);
        assert_eq!(icecast.reconnect_delay(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config.toml");
        std::fs::write(&path, "[paths]\nmusic_dir = \"/srv/music\"\n").unwrap();

        let config = crate::config::load(&path).await.unwrap();

        assert_eq!(config.paths.music_dir.to_str(), Some("/srv/music"));
        assert_eq!(config.paths.cache_dir, Config::default().paths.cache_dir);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(crate::config::load(&dir.path().join("missing.toml")).await.is_err());
    }
}
