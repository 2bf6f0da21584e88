//! Pre-flight media checks.
//!
//! Everything here runs before a byte leaves the process: a failed check
//! means no upload request is ever built.

use crate::error::{D360Error, D360Result};
use serde::{Deserialize, Serialize};

const MB: u64 = 1024 * 1024;

/// Hard cap for any upload.
pub const MAX_FILE_SIZE: u64 = 100 * MB;
pub const MAX_AUDIO_SIZE: u64 = 16 * MB;
pub const MAX_IMAGE_SIZE: u64 = 5 * MB;
/// `image/webp` is sent as a sticker, which has a much smaller cap.
pub const MAX_STICKER_SIZE: u64 = 500 * 1024;
pub const MAX_VIDEO_SIZE: u64 = 16 * MB;

/// MIME types the provider accepts for upload.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    // Audio
    "audio/aac",
    "audio/amr",
    "audio/mpeg",
    "audio/mp4",
    "audio/ogg",
    // Images
    "image/jpeg",
    "image/png",
    "image/webp",
    // Video
    "video/mp4",
    "video/3gp",
    "video/3gpp",
    // Documents
    "text/plain",
    "application/pdf",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Media message kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
    Sticker,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Sticker => "sticker",
        }
    }

    pub fn supports_caption(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Document)
    }

    /// Kind a file of this MIME type is sent as. `image/webp` goes out as a
    /// sticker; `text/*` and `application/*` as documents.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let base = base_mime(mime);
        if base == "image/webp" {
            return Some(Self::Sticker);
        }
        match base.split('/').next().unwrap_or_default() {
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "application" | "text" => Some(Self::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME without parameters, trimmed and lowercased
/// (`"Audio/OGG; codecs=opus"` → `"audio/ogg"`).
pub fn base_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&base_mime(mime).as_str())
}

/// Check an upload candidate against the size caps, then the MIME
/// allow-list. Sizes equal to a cap pass.
pub fn validate_media(size: u64, mime: &str) -> D360Result<()> {
    let base = base_mime(mime);

    if size > MAX_FILE_SIZE {
        return Err(D360Error::validation("File size exceeds 100MB limit"));
    }
    if base.starts_with("audio/") && size > MAX_AUDIO_SIZE {
        return Err(D360Error::validation("Audio file size exceeds 16MB limit"));
    }
    if base.starts_with("image/") {
        if base == "image/webp" {
            if size > MAX_STICKER_SIZE {
                return Err(D360Error::validation(
                    "Sticker file size exceeds 500KB limit",
                ));
            }
        } else if size > MAX_IMAGE_SIZE {
            return Err(D360Error::validation("Image file size exceeds 5MB limit"));
        }
    }
    if base.starts_with("video/") && size > MAX_VIDEO_SIZE {
        return Err(D360Error::validation("Video file size exceeds 16MB limit"));
    }

    if !SUPPORTED_MIME_TYPES.contains(&base.as_str()) {
        return Err(D360Error::unsupported_media_type(mime));
    }
    Ok(())
}
