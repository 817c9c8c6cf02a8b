//! Unit tests for the silence module

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::encoder::Encoder;
    use crate::silence::SilenceReservoir;

    /// Writes 1000 bytes per second of "silence", or fails on demand
    #[derive(Default)]
    struct FakeEncoder {
        renders: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        async fn render_silence(&self, dest: &Path, secs: f64) -> Result<()> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(anyhow!("encoder missing"));
            }
            let len = (secs * 1000.0) as usize;
            tokio::fs::write(dest, vec![0xFFu8; len]).await?;
            Ok(())
        }

        async fn wav_to_mp3(&self, _wav: &Path, _mp3: &Path) -> Result<()> {
            Err(anyhow!("unused"))
        }
    }

    fn reservoir(dir: &Path, encoder: Arc<FakeEncoder>) -> SilenceReservoir {
        SilenceReservoir::new(dir, encoder, 3.0)
    }

    #[tokio::test]
    async fn test_ensure_clip_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::default());
        let silence = reservoir(dir.path(), encoder.clone());

        let first = silence.ensure_clip().await.unwrap();
        let second = silence.ensure_clip().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(encoder.renders.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::metadata(&first).unwrap().len(), 3000);
    }

    #[tokio::test]
    async fn test_corrupt_clip_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder::default());
        let silence = reservoir(dir.path(), encoder.clone());

        let path = silence.ensure_clip().await.unwrap();
        std::fs::write(&path, b"tiny").unwrap();
        silence.ensure_clip().await.unwrap();

        assert_eq!(encoder.renders.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3000);
    }

    #[tokio::test]
    async fn test_chunks_are_proportional_slices() {
        let dir = tempfile::tempdir().unwrap();
        let silence = reservoir(dir.path(), Arc::new(FakeEncoder::default()));

        let full = silence.chunks(3.0, 1024).await;
        assert_eq!(full.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![1024, 1024, 952]);

        let pad = silence.chunks(0.12, 1024).await;
        assert_eq!(pad.iter().map(|c| c.len()).sum::<usize>(), 120);

        let more_than_clip = silence.chunks(10.0, 8192).await;
        assert_eq!(more_than_clip.iter().map(|c| c.len()).sum::<usize>(), 3000);
    }

    #[tokio::test]
    async fn test_chunks_never_fail() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = Arc::new(FakeEncoder {
            broken: true,
            ..Default::default()
        });
        let silence = reservoir(dir.path(), encoder.clone());

        let chunks = silence.chunks(3.0, 1024).await;

        assert!(chunks.is_empty());
        // default clip, then the emergency clip
        assert_eq!(encoder.renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_emergency_clip_when_default_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the clip path makes the default unusable
        let silence = reservoir(dir.path(), Arc::new(FakeEncoder::default()));
        std::fs::create_dir(silence.clip_path(3.0)).unwrap();

        let chunks = silence.chunks(3.0, 1024).await;

        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 100);
    }
}
