//! Unit tests for the voices module

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::config::TtsConfig;
    use crate::error::TtsError;
    use crate::voices::edge::EdgeTts;
    use crate::voices::{cache_key, Synthesizer, TtsCache};

    enum Mode {
        Speak,
        Silent,
        Fail,
    }

    struct StubVoice {
        calls: AtomicUsize,
        mode: Mode,
    }

    impl StubVoice {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                mode,
            })
        }
    }

    #[async_trait]
    impl Synthesizer for StubVoice {
        async fn synthesize(&self, text: &str, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Speak => Ok(tokio::fs::write(dest, text.as_bytes()).await?),
                Mode::Silent => Ok(tokio::fs::write(dest, b"").await?),
                Mode::Fail => Err(anyhow!("voice service down")),
            }
        }
    }

    #[test]
    fn test_cache_key_depends_on_text_and_salt() {
        assert_eq!(cache_key("hello", ""), cache_key("hello", ""));
        assert_ne!(cache_key("hello", ""), cache_key("hello", "2024-01-01-09"));
        assert_ne!(cache_key("hello", ""), cache_key("hullo", ""));
        assert_eq!(cache_key("hello", "").len(), 64);
    }

    #[tokio::test]
    async fn test_identical_requests_synthesize_once() {
        let dir = tempfile::tempdir().unwrap();
        let voice = StubVoice::new(Mode::Speak);
        let cache = TtsCache::new(dir.path(), voice.clone());

        let first = cache.synthesize("Good evening", "dj", "").await.unwrap();
        let second = cache.synthesize("Good evening", "dj", "").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(voice.calls.load(Ordering::SeqCst), 1);
        assert!(first.starts_with(dir.path().join("dj")));
        assert_eq!(std::fs::read(&first).unwrap(), b"Good evening");
    }

    #[tokio::test]
    async fn test_salt_forces_fresh_audio() {
        let dir = tempfile::tempdir().unwrap();
        let voice = StubVoice::new(Mode::Speak);
        let cache = TtsCache::new(dir.path(), voice.clone());

        let nine = cache.synthesize("Headlines", "news", "2024-06-01-09").await.unwrap();
        let noon = cache.synthesize("Headlines", "news", "2024-06-01-12").await.unwrap();

        assert_ne!(nine, noon);
        assert_eq!(voice.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_audio_is_distinct_from_failure() {
        let dir = tempfile::tempdir().unwrap();

        let silent = TtsCache::new(dir.path(), StubVoice::new(Mode::Silent));
        let err = silent.synthesize("hello", "dj", "").await.unwrap_err();
        assert!(matches!(err, TtsError::EmptyAudio));
        assert!(!silent.path_for("hello", "dj", "").exists());

        let broken = TtsCache::new(dir.path(), StubVoice::new(Mode::Fail));
        let err = broken.synthesize("hello", "dj", "").await.unwrap_err();
        assert!(matches!(err, TtsError::Failed(_)));
    }

    #[tokio::test]
    async fn test_blank_text_is_not_sent() {
        let dir = tempfile::tempdir().unwrap();
        let voice = StubVoice::new(Mode::Speak);
        let cache = TtsCache::new(dir.path(), voice.clone());

        assert!(cache.synthesize("   ", "dj", "").await.is_err());
        assert_eq!(voice.calls.load(Ordering::SeqCst), 0);
    }

    struct NoEncoder;

    #[async_trait]
    impl crate::encoder::Encoder for NoEncoder {
        async fn render_silence(&self, _dest: &Path, _secs: f64) -> Result<()> {
            Err(anyhow!("unused"))
        }

        async fn wav_to_mp3(&self, _wav: &Path, _mp3: &Path) -> Result<()> {
            Err(anyhow!("unused"))
        }
    }

    #[test]
    fn test_provider_selection() {
        let edge = TtsConfig::default();
        assert!(crate::voices::from_config(&edge, Arc::new(NoEncoder)).is_ok());

        let espeak = TtsConfig {
            provider: crate::config::TtsProvider::Espeak,
            ..Default::default()
        };
        let selected = crate::voices::from_config(&espeak, Arc::new(NoEncoder));
        assert_eq!(selected.is_ok(), cfg!(feature = "espeak"));
    }

    #[test]
    fn test_edge_arguments() {
        let config = TtsConfig {
            voice: "ru-RU-DmitryNeural".to_string(),
            rate: "-10%".to_string(),
            ..Default::default()
        };
        let edge = EdgeTts::new(&config);

        let args = edge.args("Привет", Path::new("/tmp/out.mp3"));

        assert_eq!(
            args,
            vec![
                "--voice",
                "ru-RU-DmitryNeural",
                "--rate=-10%",
                "--volume=+0%",
                "--text",
                "Привет",
                "--write-media",
                "/tmp/out.mp3",
            ]
        );
    }
}
