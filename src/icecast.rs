//! Icecast source client speaking the legacy HTTP/1.0 `PUT` ingest.
//!
//! Icecast does not accept chunked transfer encoding, so the body is a raw
//! byte stream of unknown length and we pace it ourselves.

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{IcecastConfig, StationConfig};
use crate::error::IcecastError;
use crate::stream::SegmentStream;

const SOURCE_USER: &str = "source";
const MAX_RESPONSE_HEADER: usize = 16 * 1024;

/// Where and as whom the station streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IcecastTarget {
    pub host: String,
    pub port: u16,
    pub mount: String,
    pub password: String,
    pub name: String,
    pub description: String,
    pub public: bool,
}

impl IcecastConfig {
    pub fn target(&self, station: &StationConfig) -> anyhow::Result<IcecastTarget> {
        let (host, port) = self.host_port()?;
        let mount = if self.mount.starts_with('/') {
            self.mount.clone()
        } else {
            format!("/{}", self.mount)
        };

        Ok(IcecastTarget {
            host,
            port,
            mount,
            password: self.password.clone(),
            name: station.name.clone(),
            description: station.description.clone(),
            public: self.public,
        })
    }
}

fn sanitize(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

impl IcecastTarget {
    pub fn authorization(&self) -> String {
        let credentials = format!("{SOURCE_USER}:{}", self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(credentials))
    }

    /// Request head sent before the audio body.
    pub fn request(&self) -> String {
        format!(
            "PUT {mount} HTTP/1.0\r\n\
             Host: {host}:{port}\r\n\
             Authorization: {auth}\r\n\
             Content-Type: audio/mpeg\r\n\
             Ice-Public: {public}\r\n\
             Ice-Name: {name}\r\n\
             Ice-Description: {description}\r\n\
             \r\n",
            mount = sanitize(&self.mount),
            host = self.host,
            port = self.port,
            auth = self.authorization(),
            public = if self.public { 1 } else { 0 },
            name = sanitize(&self.name),
            description = sanitize(&self.description),
        )
    }

    /// `icecast://` URL with embedded credentials, as understood by ffmpeg.
    pub fn source_url(&self) -> String {
        format!(
            "icecast://{SOURCE_USER}:{}@{}:{}/{}",
            self.password,
            self.host,
            self.port,
            self.mount.trim_start_matches('/')
        )
    }
}

/// Parses the status code out of a line like `HTTP/1.0 200 OK`.
pub fn parse_status(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") && !version.starts_with("ICE/") {
        return None;
    }
    parts.next()?.parse().ok()
}

async fn read_head<R>(io: &mut R, response: &mut Vec<u8>) -> Result<(), IcecastError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 1024];
    loop {
        let n = io.read(&mut buf).await?;
        if n == 0 {
            return Err(IcecastError::Closed);
        }
        response.extend_from_slice(&buf[..n]);

        let complete = response.windows(4).any(|w| w == b"\r\n\r\n");
        if complete || response.len() >= MAX_RESPONSE_HEADER {
            return Ok(());
        }
    }
}

/// Sends the request head and waits up to `wait` for the response head.
///
/// A server that stays silent is assumed to accept the source, since some
/// Icecast versions only answer once audio arrives. Returns the status line
/// when one was received.
pub async fn handshake<IO>(
    io: &mut IO,
    target: &IcecastTarget,
    wait: Duration,
) -> Result<Option<String>, IcecastError>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    io.write_all(target.request().as_bytes()).await?;
    io.flush().await?;

    let mut response: Vec<u8> = Vec::new();
    if let Ok(result) = timeout(wait, read_head(io, &mut response)).await {
        result?;
    }

    if response.is_empty() {
        warn!("No handshake reply within {wait:?}, streaming anyway");
        return Ok(None);
    }

    let text = String::from_utf8_lossy(&response);
    let line = text.lines().next().unwrap_or_default().trim().to_string();

    match parse_status(&line) {
        Some(status @ 400..=499) => Err(IcecastError::Rejected { status, line }),
        Some(status @ (300..=399 | 500..=599)) => {
            Err(IcecastError::UnexpectedStatus { status, line })
        }
        Some(_) => {
            info!("Icecast response: {line}");
            Ok(Some(line))
        }
        None => {
            warn!("Unrecognised Icecast response: {line}");
            Ok(Some(line))
        }
    }
}

/// Raw broadcaster: streams segment bytes straight to Icecast forever.
pub struct Broadcaster {
    target: IcecastTarget,
    stream: SegmentStream,

    /// Target send rate in bytes per second
    byte_rate: f64,
    reconnect_delay: Duration,
    handshake_timeout: Duration,
}

impl Broadcaster {
    pub fn new(target: IcecastTarget, stream: SegmentStream, config: &IcecastConfig) -> Self {
        Self {
            target,
            stream,
            byte_rate: config.byte_rate().max(1.0),
            reconnect_delay: config.reconnect_delay(),
            handshake_timeout: config.handshake_timeout(),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_handshake_timeout(mut self, wait: Duration) -> Self {
        self.handshake_timeout = wait;
        self
    }

    /// Connects, streams and reconnects after a fixed delay until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            match self.session(&cancel).await {
                Ok(()) => break,
                Err(e) if e.is_rejection() => {
                    error!("{e}. Check the source password and mount point.")
                }
                Err(e) => warn!("Broadcaster error: {e}"),
            }

            info!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!("Broadcaster stopped");
    }

    async fn session(&mut self, cancel: &CancellationToken) -> Result<(), IcecastError> {
        let address = (self.target.host.as_str(), self.target.port);
        let mut socket = timeout(self.handshake_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??;
        socket.set_nodelay(true).ok();

        handshake(&mut socket, &self.target, self.handshake_timeout).await?;
        info!(
            "Connected to {}:{}{}, starting stream",
            self.target.host, self.target.port, self.target.mount
        );

        self.pump(&mut socket, cancel).await
    }

    /// Writes chunks no faster than `byte_rate`, measured from the start of
    /// the connection. Returns `Ok` only when cancelled.
    async fn pump<W>(&mut self, out: &mut W, cancel: &CancellationToken) -> Result<(), IcecastError>
    where
        W: AsyncWrite + Unpin,
    {
        let start = Instant::now();
        let mut sent: u64 = 0;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                chunk = self.stream.next_chunk() => chunk,
            };

            out.write_all(&chunk).await?;
            sent += chunk.len() as u64;
            trace!("Sent {} bytes ({sent} total)", chunk.len());

            let due = start + Duration::from_secs_f64(sent as f64 / self.byte_rate);
            sleep_until(due).await;
        }
    }
}
