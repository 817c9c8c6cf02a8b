//! Unit tests for the encoder module

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::encoder::{silence_args, wav_to_mp3_args, Encoder, Ffmpeg};

    #[test]
    fn test_silence_arguments() {
        let args = silence_args(Path::new("/cache/silence_3000ms.tmp.mp3"), 3.0);

        assert_eq!(args[0], "-y");
        assert!(args.windows(2).any(|w| w == ["-i", "anullsrc=r=44100:cl=stereo"]));
        assert!(args.windows(2).any(|w| w == ["-t", "3.000"]));
        assert!(args.windows(2).any(|w| w == ["-acodec", "libmp3lame"]));
        assert_eq!(args.last().unwrap(), "/cache/silence_3000ms.tmp.mp3");
    }

    #[test]
    fn test_wav_conversion_arguments() {
        let args = wav_to_mp3_args(Path::new("in.wav"), Path::new("out.mp3"));

        assert!(args.windows(2).any(|w| w == ["-i", "in.wav"]));
        assert!(args.windows(2).any(|w| w == ["-ar", "44100"]));
        assert!(args.windows(2).any(|w| w == ["-ac", "2"]));
        assert_eq!(args.last().unwrap(), "out.mp3");
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = Ffmpeg::new(dir.path().join("no-such-ffmpeg"));

        let result = ffmpeg
            .render_silence(&dir.path().join("silence.mp3"), 1.0)
            .await;

        assert!(result.is_err());
    }
}
