use serde::Serialize;
use thiserror::Error;

use super::{
    bundle::EvidenceBundle,
    media::{format_file_size, MediaAsset, MediaKind},
};

pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MAX_PHOTOS: usize = 5;
pub const MAX_VIDEOS: usize = 3;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_AUDIO_BYTES: u64 = 25 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];
pub const ALLOWED_VIDEO_TYPES: &[&str] = &["video/mp4", "video/avi", "video/mov", "video/wmv"];
pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/wav",
    "audio/webm",
    "audio/ogg",
    "audio/mpeg",
    "audio/mp4",
];

/// One reason a bundle cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Violation {
    #[error("hazard category is required")]
    MissingCategory,
    #[error("description is required")]
    EmptyDescription,
    #[error("description must be at least {min} characters long")]
    DescriptionTooShort { min: usize, actual: usize },
    #[error("maximum {max} photos allowed, {actual} attached")]
    TooManyPhotos { max: usize, actual: usize },
    #[error("maximum {max} videos allowed, {actual} attached")]
    TooManyVideos { max: usize, actual: usize },
    #[error("{file_name}: {kind} type '{mime_type}' is not allowed")]
    UnsupportedType {
        file_name: String,
        kind: MediaKind,
        mime_type: String,
    },
    #[error("{file_name}: {kind} must be smaller than {}", human(.limit_bytes))]
    FileTooLarge {
        file_name: String,
        kind: MediaKind,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

fn human(bytes: &u64) -> String {
    format_file_size(*bytes)
}

fn rules_for(kind: MediaKind) -> (&'static [&'static str], u64) {
    match kind {
        MediaKind::Image => (ALLOWED_IMAGE_TYPES, MAX_IMAGE_BYTES),
        MediaKind::Video => (ALLOWED_VIDEO_TYPES, MAX_VIDEO_BYTES),
        MediaKind::Audio => (ALLOWED_AUDIO_TYPES, MAX_AUDIO_BYTES),
    }
}

/// Type and size checks for a single attachment.
pub fn validate_file(asset: &MediaAsset, kind: MediaKind) -> Vec<Violation> {
    let (allowed, limit) = rules_for(kind);
    let mut violations = Vec::new();

    let mime_type = asset.mime_type().trim().to_ascii_lowercase();
    if !allowed.contains(&mime_type.as_str()) {
        violations.push(Violation::UnsupportedType {
            file_name: asset.file_name().to_string(),
            kind,
            mime_type: asset.mime_type().to_string(),
        });
    }

    if asset.size_bytes() > limit {
        violations.push(Violation::FileTooLarge {
            file_name: asset.file_name().to_string(),
            kind,
            size_bytes: asset.size_bytes(),
            limit_bytes: limit,
        });
    }

    violations
}

/// Every reason the bundle is not submittable, in form order. Empty means ready.
pub fn validate(bundle: &EvidenceBundle) -> Vec<Violation> {
    let mut violations = Vec::new();

    if bundle
        .category()
        .map_or(true, |category| category.trim().is_empty())
    {
        violations.push(Violation::MissingCategory);
    }

    let description = bundle.description().trim();
    if description.is_empty() {
        violations.push(Violation::EmptyDescription);
    } else {
        let actual = description.chars().count();
        if actual < MIN_DESCRIPTION_CHARS {
            violations.push(Violation::DescriptionTooShort {
                min: MIN_DESCRIPTION_CHARS,
                actual,
            });
        }
    }

    if bundle.photos().len() > MAX_PHOTOS {
        violations.push(Violation::TooManyPhotos {
            max: MAX_PHOTOS,
            actual: bundle.photos().len(),
        });
    }

    if bundle.videos().len() > MAX_VIDEOS {
        violations.push(Violation::TooManyVideos {
            max: MAX_VIDEOS,
            actual: bundle.videos().len(),
        });
    }

    for (kind, asset) in bundle.attachments() {
        violations.extend(validate_file(asset, kind));
    }

    violations
}
