use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::constants::{CHANNELS, SAMPLE_RATE};

/// External audio encoder used for silence clips and WAV conversion.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Writes `secs` seconds of stereo MP3 silence to `dest`.
    async fn render_silence(&self, dest: &Path, secs: f64) -> Result<()>;

    async fn wav_to_mp3(&self, wav: &Path, mp3: &Path) -> Result<()>;
}

pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} failed (exit code {code}): {stderr}",
                self.binary.display(),
                code = output.status.code().unwrap_or_default(),
                stderr = String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(())
    }
}

pub fn silence_args(dest: &Path, secs: f64) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        format!("anullsrc=r={SAMPLE_RATE}:cl=stereo"),
        "-t".into(),
        format!("{secs:.3}"),
        "-q:a".into(),
        "9".into(),
        "-acodec".into(),
        "libmp3lame".into(),
        dest.display().to_string(),
    ]
}

pub fn wav_to_mp3_args(wav: &Path, mp3: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        wav.display().to_string(),
        "-ar".into(),
        SAMPLE_RATE.to_string(),
        "-ac".into(),
        CHANNELS.to_string(),
        "-acodec".into(),
        "libmp3lame".into(),
        "-b:a".into(),
        "128k".into(),
        mp3.display().to_string(),
    ]
}

#[async_trait]
impl Encoder for Ffmpeg {
    async fn render_silence(&self, dest: &Path, secs: f64) -> Result<()> {
        debug!("Rendering {secs:.2}s of silence to {}", dest.display());
        self.run(silence_args(dest, secs)).await
    }

    async fn wav_to_mp3(&self, wav: &Path, mp3: &Path) -> Result<()> {
        self.run(wav_to_mp3_args(wav, mp3)).await
    }
}
