use reqwest::multipart::{Form, Part};

use crate::{
    evidence::{EvidenceBundle, HazardType, MediaKind},
    geolocation::Coordinates,
};

use super::ApiError;

pub const HAZARD_TYPE_FIELD: &str = "user_hazard_type";
pub const DESCRIPTION_FIELD: &str = "user_description";
pub const MEDIA_FIELD: &str = "media_files";

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub kind: MediaKind,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Everything one submit call sends. Built once per attempt and consumed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPayload {
    pub hazard_type: HazardType,
    pub description: String,
    pub coordinates: Coordinates,
    pub files: Vec<UploadFile>,
}

#[derive(Debug, thiserror::Error)]
#[error("could not read {file_name}: {reason}")]
pub struct AttachmentReadError {
    pub file_name: String,
    pub reason: String,
}

impl SubmitPayload {
    /// Loads every attachment in upload order: photos, videos, then the voice clip.
    pub async fn assemble(
        bundle: &EvidenceBundle,
        hazard_type: HazardType,
        coordinates: Coordinates,
    ) -> Result<Self, AttachmentReadError> {
        let mut files = Vec::with_capacity(bundle.attachment_count());
        for (kind, asset) in bundle.attachments() {
            let bytes = asset
                .read_bytes()
                .await
                .map_err(|err| AttachmentReadError {
                    file_name: asset.file_name().to_string(),
                    reason: format!("{err:#}"),
                })?;
            files.push(UploadFile {
                kind,
                file_name: asset.file_name().to_string(),
                mime_type: asset.mime_type().to_string(),
                bytes,
            });
        }

        Ok(Self {
            hazard_type,
            description: bundle.description().trim().to_string(),
            coordinates,
            files,
        })
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.iter().map(|file| file.file_name.as_str())
    }

    /// Header pairs that carry the position next to the multipart body.
    pub fn location_headers(&self) -> [(&'static str, String); 2] {
        [
            ("latitude", self.coordinates.lat.to_string()),
            ("longitude", self.coordinates.lng.to_string()),
        ]
    }

    pub fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text(HAZARD_TYPE_FIELD, self.hazard_type.as_str())
            .text(DESCRIPTION_FIELD, self.description);

        for file in self.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)
                .map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
            form = form.part(MEDIA_FIELD, part);
        }

        Ok(form)
    }
}
