//! Integration tests for the ffmpeg transcoding pump.
//!
//! A shell script stands in for ffmpeg and copies its stdin to a file.

mod common;

use common::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use radio_dj::config::StationConfig;
use radio_dj::transcode::TranscodingPump;

fn target() -> radio_dj::icecast::IcecastTarget {
    IcecastConfig {
        url: "http://radio.example:8010".to_string(),
        mount: "/stream".to_string(),
        password: "pw".to_string(),
        public: false,
        ..Default::default()
    }
    .target(&StationConfig::default())
    .unwrap()
}

/// Test ffmpeg is told to re-encode stdin and publish to the mount.
#[tokio::test]
async fn test_command_arguments() {
    let cache = tempfile::tempdir().unwrap();
    let (_tx, stream, _history) = test_stream(cache.path(), quick_stream_config());
    let silence = std::sync::Arc::new(SilenceReservoir::new(
        cache.path(),
        std::sync::Arc::new(FakeEncoder::default()),
        3.0,
    ));
    let pump = TranscodingPump::new("ffmpeg", target(), stream, silence, 500);

    let args = pump.command_args();

    let input = args.iter().position(|arg| arg == "-i").unwrap();
    assert_eq!(args[input + 1], "pipe:0");
    assert!(args.windows(2).any(|w| w == ["-b:a", "128k"]));
    assert!(args.windows(2).any(|w| w == ["-ice_public", "0"]));
    assert!(args.windows(2).any(|w| w == ["-ice_name", "NAVO RADIO"]));
    assert_eq!(
        args.last().unwrap(),
        "icecast://source:pw@radio.example:8010/stream"
    );
}

/// Test queued audio is prebuffered and piped into the encoder.
#[cfg(unix)]
#[tokio::test]
async fn test_audio_reaches_the_encoder() {
    use std::os::unix::fs::PermissionsExt;

    let work = tempfile::tempdir().unwrap();
    let received = work.path().join("received.mp3");
    let script = work.path().join("fake-ffmpeg");
    std::fs::write(
        &script,
        format!("#!/bin/sh\ncat > '{}'\n", received.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let (tx, stream, history) = test_stream(work.path(), quick_stream_config());
    let silence = std::sync::Arc::new(SilenceReservoir::new(
        work.path(),
        std::sync::Arc::new(FakeEncoder::default()),
        3.0,
    ));

    let track = write_mp3(work.path(), "Long - Song.mp3", &vec![0x42; 80 * 1024]);
    tx.send(Segment::from_file(&track, SegmentKind::Track, None).await.unwrap())
        .await
        .unwrap();

    let pump = TranscodingPump::new(&script, target(), stream, silence, 500)
        .with_restart_delay(Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(pump.run(cancel.clone()));

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let len = std::fs::metadata(&received).map(|m| m.len()).unwrap_or(0);
            // boundary pad plus the whole track
            if len >= 120 + 80 * 1024 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("encoder never received the track");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(15), task)
        .await
        .expect("pump did not stop")
        .unwrap();

    let bytes = std::fs::read(&received).unwrap();
    assert_eq!(bytes.iter().filter(|b| **b == 0x42).count(), 80 * 1024);
    assert_eq!(history.read().await.len(), 1);
}
