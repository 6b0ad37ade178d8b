//! Media kinds offered by the editor's media picker.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/markdown",
];

/// Kind of media a picker modal works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Pictures inserted inline.
    Image,
    /// Embedded video.
    Video,
    /// Embedded audio.
    Audio,
    /// Downloadable attachment.
    Document,
}

impl MediaKind {
    /// All kinds, in picker tab order.
    pub const ALL: [MediaKind; 4] =
        [MediaKind::Image, MediaKind::Video, MediaKind::Audio, MediaKind::Document];

    /// Path segment and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    /// Upload size ceiling in bytes.
    pub fn max_bytes(self) -> u64 {
        const MIB: u64 = 1024 * 1024;
        match self {
            Self::Image => 10 * MIB,
            Self::Video => 200 * MIB,
            Self::Audio => 50 * MIB,
            Self::Document => 20 * MIB,
        }
    }

    /// Whether a MIME type may be picked for this kind.
    pub fn accepts(self, mime: &str) -> bool {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            Self::Image => mime.starts_with("image/"),
            Self::Video => mime.starts_with("video/"),
            Self::Audio => mime.starts_with("audio/"),
            Self::Document => DOCUMENT_MIME_TYPES.contains(&mime.as_str()),
        }
    }

    /// Endpoint listing previously uploaded assets.
    pub fn library_path(self) -> String {
        format!("/media/{}", self.as_str())
    }

    /// Endpoint accepting multipart uploads.
    pub fn upload_path(self) -> String {
        format!("/media/{}/upload", self.as_str())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown media kind `{s}`"))
    }
}

/// An uploaded media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Asset identifier.
    pub id: String,
    /// Kind it was uploaded as.
    pub kind: MediaKind,
    /// Public URL.
    pub url: String,
    /// Original file name.
    pub file_name: String,
    /// Stored MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}
