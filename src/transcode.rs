//! Broadcaster variant that pipes the stream through one ffmpeg process.
//!
//! Music and speech files differ in sample rate and bitrate; re-encoding
//! everything into one constant format keeps picky clients happy. ffmpeg
//! does the Icecast handshake itself.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::constants::{
    BITRATE_KBPS, CHANNELS, PREBUFFER_BYTES, SAMPLE_RATE, TRANSCODER_EXIT_TIMEOUT,
    TRANSCODER_RESTART_DELAY,
};
use crate::icecast::IcecastTarget;
use crate::silence::SilenceReservoir;
use crate::stream::SegmentStream;

/// Longest we wait to fill the prebuffer before starting anyway.
const PREBUFFER_DEADLINE: Duration = Duration::from_secs(10);
const STDERR_TAIL: usize = 3;

pub struct TranscodingPump {
    binary: PathBuf,
    target: IcecastTarget,
    stream: SegmentStream,
    silence: Arc<SilenceReservoir>,
    chunk_size: usize,
    restart_delay: Duration,
}

impl TranscodingPump {
    pub fn new(
        binary: impl Into<PathBuf>,
        target: IcecastTarget,
        stream: SegmentStream,
        silence: Arc<SilenceReservoir>,
        chunk_size: usize,
    ) -> Self {
        Self {
            binary: binary.into(),
            target,
            stream,
            silence,
            chunk_size,
            restart_delay: TRANSCODER_RESTART_DELAY,
        }
    }

    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    /// ffmpeg arguments: MP3 on stdin, constant bitrate MP3 to Icecast.
    /// Corrupt input packets are dropped instead of aborting the encoder, and
    /// `-re` makes ffmpeg consume input at real time so the pipe paces us.
    pub fn command_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-loglevel",
            "warning",
            "-re",
            "-fflags",
            "+discardcorrupt",
            "-err_detect",
            "ignore_err",
            "-f",
            "mp3",
            "-i",
            "pipe:0",
            "-c:a",
            "libmp3lame",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        args.extend([
            "-b:a".to_string(),
            format!("{BITRATE_KBPS}k"),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-ac".to_string(),
            CHANNELS.to_string(),
            "-f".to_string(),
            "mp3".to_string(),
            "-content_type".to_string(),
            "audio/mpeg".to_string(),
            "-ice_name".to_string(),
            self.target.name.clone(),
            "-ice_description".to_string(),
            self.target.description.clone(),
            "-ice_public".to_string(),
            if self.target.public { "1" } else { "0" }.to_string(),
            self.target.source_url(),
        ]);

        args
    }

    /// Runs transcoder sessions back to back until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            if let Err(e) = self.session(&cancel).await {
                error!("Transcoder error: {e:#}");
            }
            if cancel.is_cancelled() {
                break;
            }

            info!("Restarting transcoder in {:?}", self.restart_delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.restart_delay) => {}
            }
        }

        info!("Transcoding pump stopped");
    }

    async fn prebuffer(&mut self, cancel: &CancellationToken) -> Vec<u8> {
        info!("Prebuffering {} KB", PREBUFFER_BYTES / 1024);
        let deadline = Instant::now() + PREBUFFER_DEADLINE;
        let mut buffer = Vec::with_capacity(PREBUFFER_BYTES);

        while buffer.len() < PREBUFFER_BYTES && Instant::now() < deadline {
            tokio::select! {
                _ = cancel.cancelled() => break,
                chunk = self.stream.next_chunk() => buffer.extend_from_slice(&chunk),
            }
        }

        if buffer.is_empty() {
            warn!("Prebuffer empty, using silence");
            for chunk in self.silence.chunks(1.0, self.chunk_size).await {
                buffer.extend_from_slice(&chunk);
            }
        }

        buffer
    }

    fn spawn(&self) -> Result<Child> {
        Command::new(&self.binary)
            .args(self.command_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.binary.display()))
    }

    async fn session(&mut self, cancel: &CancellationToken) -> Result<()> {
        let prebuffer = self.prebuffer(cancel).await;
        if cancel.is_cancelled() {
            return Ok(());
        }

        info!("Starting transcoder stream");
        let mut child = self.spawn()?;
        let mut stdin = child.stdin.take().context("Failed to get transcoder stdin")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to get transcoder stderr")?;
        let diagnostics = spawn_stderr_reader(stderr);

        let mut written = match stdin.write_all(&prebuffer).await {
            Ok(()) => prebuffer.len() as u64,
            Err(e) => {
                warn!("Transcoder rejected the prebuffer: {e}");
                0
            }
        };

        while written > 0 {
            if let Some(status) = child.try_wait()? {
                warn!("Transcoder exited: {status}");
                break;
            }

            let chunk = tokio::select! {
                _ = cancel.cancelled() => break,
                chunk = self.stream.next_chunk() => chunk,
            };

            if let Err(e) = stdin.write_all(&chunk).await {
                warn!("Transcoder pipe closed: {e}");
                break;
            }
            written += chunk.len() as u64;
        }

        drop(stdin);
        match timeout(TRANSCODER_EXIT_TIMEOUT, child.wait()).await {
            Ok(status) => debug!("Transcoder finished: {:?}", status),
            Err(_) => {
                warn!("Transcoder did not exit, killing it");
                child.kill().await.ok();
            }
        }

        if let Ok(Ok(tail)) = timeout(Duration::from_secs(2), diagnostics).await {
            if !tail.is_empty() {
                warn!("Transcoder last words: {}", tail.into_iter().collect::<Vec<_>>().join("; "));
            }
        }

        info!("Transcoder session ended after {written} bytes");
        Ok(())
    }
}

/// Logs ffmpeg diagnostics as they arrive so a full stderr pipe never stalls
/// the encoder. Yields the last few lines once the pipe closes.
fn spawn_stderr_reader(stderr: tokio::process::ChildStderr) -> JoinHandle<VecDeque<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        let mut reader = tokio::io::BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            debug!("ffmpeg: {line}");

            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        tail
    })
}
