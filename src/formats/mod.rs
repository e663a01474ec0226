// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Candidate stream filtering and ranking.
//!
//! The extractor hands back every stream variant it knows about, including
//! storyboards and subtitle tracks. This module keeps the ones a user can
//! actually download, derives display labels, and sorts them so the highest
//! quality video leads, audio-only entries follow, and unknown-shape entries
//! come last.

use serde::{Deserialize, Serialize};

/// Resolution label for audio-only streams.
pub const AUDIO_LABEL: &str = "Audio";

/// Resolution label for streams whose shape is unknown.
pub const UNKNOWN_LABEL: &str = "N/A";

/// One stream variant as reported by the extractor's JSON dump.
///
/// Every field is optional; the extractor omits what it does not know.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStream {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
}

impl RawStream {
    /// A codec tag of `"none"` means the track is absent.
    pub fn has_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(v) if v != "none")
    }

    pub fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(a) if a != "none")
    }
}

/// One selectable encoding returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    /// Human-readable quality label (format note, else resolution label).
    pub quality: String,
    /// Resolution label: `"{height}p"`, raw resolution string, `"Audio"`,
    /// or `"N/A"`.
    pub resolution: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    /// Direct source locator.
    pub url: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
}

/// Build the ranked format list from the extractor's raw streams.
///
/// Filtering: a stream survives when it exposes a direct source locator and
/// carries at least one real codec; video-shaped entries with neither a
/// height nor an audio track are treated as non-media (subtitles,
/// storyboards) and dropped.
pub fn build_format_list(streams: &[RawStream]) -> Vec<FormatDescriptor> {
    let mut formats: Vec<FormatDescriptor> = streams
        .iter()
        .filter_map(descriptor_for)
        .collect();

    // Highest quality first: height, then the Audio sentinel, then unknown;
    // estimated size breaks ties, also descending.
    formats.sort_by(|a, b| sort_rank(b).cmp(&sort_rank(a)));

    formats
}

fn descriptor_for(stream: &RawStream) -> Option<FormatDescriptor> {
    let url = stream.url.clone()?;
    if !stream.has_video() && !stream.has_audio() {
        return None;
    }

    let resolution = if let Some(height) = stream.height {
        format!("{}p", height)
    } else if stream.has_audio() && !stream.has_video() {
        AUDIO_LABEL.to_string()
    } else if !stream.has_audio() {
        // No height and no audio track: subtitle/storyboard noise
        return None;
    } else {
        stream
            .resolution
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    };

    let quality = stream
        .format_note
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| resolution.clone());

    Some(FormatDescriptor {
        format_id: stream.format_id.clone(),
        ext: stream.ext.clone(),
        quality,
        resolution,
        width: stream.width,
        height: stream.height,
        filesize: stream.filesize,
        url,
        vcodec: stream.vcodec.clone(),
        acodec: stream.acodec.clone(),
    })
}

/// Sort key: (height rank, estimated size), compared descending.
///
/// Audio-only entries rank -1, unknown-shape entries -2, so they trail any
/// stream with a real pixel height.
fn sort_rank(format: &FormatDescriptor) -> (i64, u64) {
    let height_rank = match format.height {
        Some(height) => height as i64,
        None if format.resolution == AUDIO_LABEL => -1,
        None => -2,
    };
    (height_rank, format.filesize.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, height: u32, filesize: Option<u64>) -> RawStream {
        RawStream {
            format_id: Some(id.to_string()),
            ext: Some("mp4".to_string()),
            url: Some(format!("https://cdn.example/{id}")),
            vcodec: Some("avc1.64001f".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            height: Some(height),
            width: Some(height * 16 / 9),
            filesize,
            ..RawStream::default()
        }
    }

    fn audio(id: &str, filesize: Option<u64>) -> RawStream {
        RawStream {
            format_id: Some(id.to_string()),
            ext: Some("m4a".to_string()),
            url: Some(format!("https://cdn.example/{id}")),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            filesize,
            ..RawStream::default()
        }
    }

    #[test]
    fn test_height_ordering() {
        let list = build_format_list(&[video("a", 720, None), video("b", 1080, None)]);
        assert_eq!(list[0].format_id.as_deref(), Some("b"));
        assert_eq!(list[1].format_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_audio_follows_video_and_unknown_trails() {
        let unknown = RawStream {
            format_id: Some("u".to_string()),
            url: Some("https://cdn.example/u".to_string()),
            vcodec: Some("vp9".to_string()),
            acodec: Some("opus".to_string()),
            resolution: Some("multiple".to_string()),
            ..RawStream::default()
        };
        let list = build_format_list(&[unknown, audio("snd", None), video("vid", 360, None)]);

        assert_eq!(list[0].format_id.as_deref(), Some("vid"));
        assert_eq!(list[1].format_id.as_deref(), Some("snd"));
        assert_eq!(list[1].resolution, AUDIO_LABEL);
        assert_eq!(list[2].format_id.as_deref(), Some("u"));
        assert_eq!(list[2].resolution, "multiple");
    }

    #[test]
    fn test_filesize_breaks_ties_descending() {
        let list = build_format_list(&[
            video("small", 1080, Some(10)),
            video("large", 1080, Some(999)),
            video("sizeless", 1080, None),
        ]);
        assert_eq!(list[0].format_id.as_deref(), Some("large"));
        assert_eq!(list[1].format_id.as_deref(), Some("small"));
        assert_eq!(list[2].format_id.as_deref(), Some("sizeless"));
    }

    #[test]
    fn test_streams_without_source_or_codecs_dropped() {
        let no_url = RawStream {
            format_id: Some("nourl".to_string()),
            vcodec: Some("avc1".to_string()),
            ..RawStream::default()
        };
        let codecless = RawStream {
            format_id: Some("meta".to_string()),
            url: Some("https://cdn.example/meta".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("none".to_string()),
            ..RawStream::default()
        };
        assert!(build_format_list(&[no_url, codecless]).is_empty());
    }

    #[test]
    fn test_heightless_video_without_audio_is_non_media() {
        // Storyboard-style track: video codec tag, no height, no audio
        let storyboard = RawStream {
            format_id: Some("sb0".to_string()),
            url: Some("https://cdn.example/sb0".to_string()),
            vcodec: Some("mjpeg".to_string()),
            acodec: Some("none".to_string()),
            ..RawStream::default()
        };
        assert!(build_format_list(&[storyboard]).is_empty());
    }

    #[test]
    fn test_labels() {
        let list = build_format_list(&[video("v", 1080, None), audio("a", None)]);
        assert_eq!(list[0].resolution, "1080p");
        assert_eq!(list[0].quality, "1080p");
        assert_eq!(list[1].resolution, AUDIO_LABEL);

        let noted = RawStream {
            format_note: Some("1080p60 HDR".to_string()),
            ..video("n", 1080, None)
        };
        let list = build_format_list(&[noted]);
        assert_eq!(list[0].quality, "1080p60 HDR");
    }
}
