//! Quality label lookup tables.
//!
//! Labels come straight from the front-ends ("720p", "192k", "Best") and are
//! mapped per job kind. Unknown labels never fail: video falls back to the
//! unconstrained selector, audio to 192 kbps, playlists to 720p.

use super::models::JobKind;

const VIDEO_HEIGHTS: &[(&str, Option<u32>)] = &[
    ("Best", None),
    ("1080p", Some(1080)),
    ("720p", Some(720)),
    ("480p", Some(480)),
    ("360p", Some(360)),
];

const PLAYLIST_HEIGHTS: &[(&str, u32)] = &[("720p", 720), ("480p", 480), ("360p", 360)];

const AUDIO_BITRATES: &[(&str, u32)] = &[("192k", 192), ("128k", 128), ("64k", 64)];

pub const DEFAULT_AUDIO_BITRATE: u32 = 192;
pub const DEFAULT_PLAYLIST_HEIGHT: u32 = 720;

/// Provider-facing format choice derived from a quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSelector {
    /// Best combined stream, optionally capped at a height
    Video { max_height: Option<u32> },
    /// Best audio stream, extracted to mp3 at the given bitrate
    Audio { bitrate_kbps: u32 },
}

impl FormatSelector {
    pub fn for_job(kind: JobKind, quality: &str) -> Self {
        let quality = quality.trim();
        match kind {
            JobKind::Video => {
                let max_height = VIDEO_HEIGHTS
                    .iter()
                    .find(|(label, _)| label.eq_ignore_ascii_case(quality))
                    .and_then(|(_, height)| *height);
                FormatSelector::Video { max_height }
            }
            JobKind::Playlist => {
                let height = PLAYLIST_HEIGHTS
                    .iter()
                    .find(|(label, _)| label.eq_ignore_ascii_case(quality))
                    .map(|(_, height)| *height)
                    .unwrap_or(DEFAULT_PLAYLIST_HEIGHT);
                FormatSelector::Video {
                    max_height: Some(height),
                }
            }
            JobKind::Audio => {
                let bitrate_kbps = AUDIO_BITRATES
                    .iter()
                    .find(|(label, _)| label.eq_ignore_ascii_case(quality))
                    .map(|(_, bitrate)| *bitrate)
                    .unwrap_or(DEFAULT_AUDIO_BITRATE);
                FormatSelector::Audio { bitrate_kbps }
            }
        }
    }

    /// yt-dlp `-f` expression
    pub fn format_spec(&self) -> String {
        match self {
            FormatSelector::Video { max_height: None } => "best".to_string(),
            FormatSelector::Video {
                max_height: Some(height),
            } => format!("best[height<={height}]"),
            FormatSelector::Audio { .. } => "bestaudio/best".to_string(),
        }
    }

    pub fn audio_bitrate(&self) -> Option<u32> {
        match self {
            FormatSelector::Audio { bitrate_kbps } => Some(*bitrate_kbps),
            FormatSelector::Video { .. } => None,
        }
    }
}

/// Labels a front-end should offer for a kind, in display order
pub fn quality_labels(kind: JobKind) -> Vec<&'static str> {
    match kind {
        JobKind::Video => VIDEO_HEIGHTS.iter().map(|(label, _)| *label).collect(),
        JobKind::Playlist => PLAYLIST_HEIGHTS.iter().map(|(label, _)| *label).collect(),
        JobKind::Audio => AUDIO_BITRATES.iter().map(|(label, _)| *label).collect(),
    }
}
