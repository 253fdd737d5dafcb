use serde::Serialize;

use crate::geolocation::Coordinates;

use super::{
    category::{map_category, HazardType},
    media::{MediaAsset, MediaKind},
};

/// The report being composed. Attached media is owned here until it is removed,
/// discarded or submitted.
#[derive(Debug, Default)]
pub struct EvidenceBundle {
    category: Option<String>,
    description: String,
    photos: Vec<MediaAsset>,
    videos: Vec<MediaAsset>,
    voice_clip: Option<MediaAsset>,
    coordinates: Option<Coordinates>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = Some(category.into());
    }

    pub fn clear_category(&mut self) {
        self.category = None;
    }

    /// Backend hazard type for the chosen category, if one is chosen.
    pub fn hazard_type(&self) -> Option<HazardType> {
        self.category.as_deref().map(map_category)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
    }

    pub fn photos(&self) -> &[MediaAsset] {
        &self.photos
    }

    pub fn videos(&self) -> &[MediaAsset] {
        &self.videos
    }

    pub fn voice_clip(&self) -> Option<&MediaAsset> {
        self.voice_clip.as_ref()
    }

    /// Limits are not enforced here; `validate` reports them so the form can show
    /// every problem at once.
    pub fn attach_photo(&mut self, asset: MediaAsset) {
        self.photos.push(asset);
    }

    pub fn attach_video(&mut self, asset: MediaAsset) {
        self.videos.push(asset);
    }

    /// Replaces any previous clip, releasing it.
    pub fn attach_voice_clip(&mut self, asset: MediaAsset) {
        if let Some(previous) = self.voice_clip.replace(asset) {
            previous.release();
        }
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<MediaAsset> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    pub fn remove_video(&mut self, index: usize) -> Option<MediaAsset> {
        (index < self.videos.len()).then(|| self.videos.remove(index))
    }

    pub fn take_voice_clip(&mut self) -> Option<MediaAsset> {
        self.voice_clip.take()
    }

    /// Attachments in upload order: photos, then videos, then the voice clip.
    pub fn attachments(&self) -> impl Iterator<Item = (MediaKind, &MediaAsset)> + '_ {
        self.photos
            .iter()
            .map(|asset| (MediaKind::Image, asset))
            .chain(self.videos.iter().map(|asset| (MediaKind::Video, asset)))
            .chain(self.voice_clip.iter().map(|asset| (MediaKind::Audio, asset)))
    }

    pub fn attachment_count(&self) -> usize {
        self.photos.len() + self.videos.len() + usize::from(self.voice_clip.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.description.is_empty()
            && self.attachment_count() == 0
            && self.coordinates.is_none()
    }

    /// Drops everything and releases every attached asset.
    pub fn clear(&mut self) {
        let discarded = std::mem::take(self);
        discarded
            .photos
            .into_iter()
            .chain(discarded.videos)
            .chain(discarded.voice_clip)
            .for_each(MediaAsset::release);
    }

    /// Metadata-only snapshot for the draft endpoint.
    pub fn to_draft(&self) -> DraftReport {
        DraftReport {
            category: self.category.clone(),
            hazard_type: self.hazard_type(),
            description: self.description.clone(),
            coordinates: self.coordinates,
            attachments: self
                .attachments()
                .map(|(kind, asset)| AttachmentSummary {
                    kind,
                    file_name: asset.file_name().to_string(),
                    mime_type: asset.mime_type().to_string(),
                    size_bytes: asset.size_bytes(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttachmentSummary {
    pub kind: MediaKind,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// JSON body of `POST /reports/draft`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftReport {
    pub category: Option<String>,
    pub hazard_type: Option<HazardType>,
    pub description: String,
    pub coordinates: Option<Coordinates>,
    pub attachments: Vec<AttachmentSummary>,
}
