//! Artist and title lookup for music files.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag};
use symphonia::core::probe::Hint;

use crate::segment::TrackInfo;

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNTITLED: &str = "Untitled";
const STEM_SEPARATORS: [&str; 6] = [" - ", " – ", " — ", "-", "–", "—"];

/// Reads artist/title tags, falling back to the `Artist - Title` file name
/// convention. Never fails.
pub async fn probe_track(path: &Path) -> TrackInfo {
    let owned: PathBuf = path.to_path_buf();
    let tagged = tokio::task::spawn_blocking(move || read_tags(&owned)).await;

    let (artist, title) = match tagged {
        Ok(Ok(tags)) => tags,
        Ok(Err(e)) => {
            debug!("No readable tags in {}: {e}", path.display());
            (None, None)
        }
        Err(e) => {
            error!("Tag reader task failed for {}: {e:?}", path.display());
            (None, None)
        }
    };

    resolve(path, artist, title)
}

fn resolve(path: &Path, artist: Option<String>, title: Option<String>) -> TrackInfo {
    if let (Some(artist), Some(title)) = (&artist, &title) {
        return TrackInfo::new(artist.clone(), title.clone());
    }

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    let (artist, title) = match parse_stem(&stem) {
        Some(parsed) => parsed,
        None => (
            UNKNOWN_ARTIST.to_string(),
            if stem.is_empty() { UNTITLED.to_string() } else { stem },
        ),
    };

    TrackInfo::new(artist, title)
}

/// Splits `Artist - Title` on the first recognised separator.
pub fn parse_stem(stem: &str) -> Option<(String, String)> {
    STEM_SEPARATORS.iter().find_map(|sep| {
        let (artist, title) = stem.split_once(sep)?;
        let (artist, title) = (artist.trim(), title.trim());

        if artist.is_empty() || title.is_empty() {
            return None;
        }
        Some((artist.to_string(), title.to_string()))
    })
}

fn read_tags(path: &Path) -> Result<(Option<String>, Option<String>)> {
    let file = Box::new(File::open(path)?);
    let mss = MediaSourceStream::new(file, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();

    let mut probed =
        symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)?;

    // ID3v2 sits in front of the container, other formats carry tags inside it
    let mut tags: Vec<Tag> = Vec::new();
    if let Some(metadata) = probed.metadata.get() {
        if let Some(revision) = metadata.current() {
            tags.extend(revision.tags().iter().cloned());
        }
    }
    if let Some(revision) = probed.format.metadata().current() {
        tags.extend(revision.tags().iter().cloned());
    }

    let artist = find_tag(&tags, StandardTagKey::Artist)
        .or_else(|| find_tag(&tags, StandardTagKey::AlbumArtist));
    let title = find_tag(&tags, StandardTagKey::TrackTitle);

    Ok((artist, title))
}

fn find_tag(tags: &[Tag], key: StandardTagKey) -> Option<String> {
    tags.iter()
        .filter(|tag| tag.std_key == Some(key))
        .map(|tag| tag.value.to_string().trim().to_string())
        .find(|value| !value.is_empty())
}
