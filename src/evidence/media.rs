use std::{fmt, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Bytes read from the head of a file when sniffing its MIME type.
const SNIFF_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "voice clip",
        };
        f.write_str(label)
    }
}

/// Where the bytes of an attachment live. Not `Clone`: a handle has exactly one owner.
#[derive(Debug)]
pub enum MediaSource {
    /// A file picked by the observer. Release never deletes it.
    File(PathBuf),
    /// Bytes held in memory, e.g. a finished voice recording.
    Memory(Vec<u8>),
}

/// One piece of evidence. Ownership moves into an `EvidenceBundle` on attach and the asset
/// is released explicitly when removed, discarded or submitted.
#[derive(Debug)]
pub struct MediaAsset {
    id: Uuid,
    file_name: String,
    mime_type: String,
    size_bytes: u64,
    source: MediaSource,
}

impl MediaAsset {
    /// Wraps a file whose type and size were declared by the picker, without touching disk.
    pub fn from_declared(
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        let path = path.into();
        Self {
            id: Uuid::new_v4(),
            file_name: file_name_of(&path),
            mime_type: mime_type.into(),
            size_bytes,
            source: MediaSource::File(path),
        }
    }

    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            source: MediaSource::Memory(bytes),
        }
    }

    /// Opens a file from disk, taking its size from metadata and its MIME type from the
    /// content when it is a recognisable image, otherwise from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat media file {}", path.display()))?;

        let mut head = Vec::with_capacity(SNIFF_LEN);
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open media file {}", path.display()))?;
        file.take(SNIFF_LEN as u64)
            .read_to_end(&mut head)
            .await
            .with_context(|| format!("Failed to read media file {}", path.display()))?;

        let mime_type = sniff_mime_type(&head, path);
        log_debug!("Sniffed {} as {}", path.display(), mime_type);

        Ok(Self {
            id: Uuid::new_v4(),
            file_name: file_name_of(path),
            mime_type,
            size_bytes: metadata.len(),
            source: MediaSource::File(path.to_path_buf()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Loads the full payload for upload.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            MediaSource::Memory(bytes) => Ok(bytes.clone()),
            MediaSource::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read attachment {}", path.display())),
        }
    }

    /// Gives up the handle. In-memory buffers are freed; picked files stay on disk.
    pub fn release(self) {
        log_debug!("Released media asset {} ({})", self.id, self.file_name);
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}

fn sniff_mime_type(head: &[u8], path: &Path) -> String {
    if let Ok(format) = image::guess_format(head) {
        return format.to_mime_type().to_string();
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(format) = ImageFormat::from_extension(&extension) {
        return format.to_mime_type().to_string();
    }

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "avi" => "video/avi",
        "mov" => "video/mov",
        "wmv" => "video/wmv",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "weba" => "audio/webm",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Human-readable byte count with 1024 steps, e.g. `1.5 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn formats_sizes_like_the_form_does() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }

    #[tokio::test]
    async fn from_path_prefers_content_over_extension() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&PNG_HEADER).unwrap();
        file.write_all(&[0u8; 32]).unwrap();

        let asset = MediaAsset::from_path(file.path()).await.unwrap();

        assert_eq!(asset.mime_type(), "image/png");
        assert_eq!(asset.size_bytes(), 40);
        assert!(matches!(asset.source(), MediaSource::File(_)));
    }

    #[tokio::test]
    async fn from_path_falls_back_to_extension_for_video() {
        let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        file.write_all(b"\x00\x00\x00\x18ftypmp42").unwrap();

        let asset = MediaAsset::from_path(file.path()).await.unwrap();

        assert_eq!(asset.mime_type(), "video/mp4");
    }

    #[tokio::test]
    async fn from_path_reports_missing_file() {
        let err = MediaAsset::from_path("/definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to stat media file"));
    }

    #[tokio::test]
    async fn memory_assets_read_back_their_bytes() {
        let asset = MediaAsset::from_bytes("voice.wav", "audio/wav", vec![1, 2, 3]);
        assert_eq!(asset.size_bytes(), 3);
        assert_eq!(asset.read_bytes().await.unwrap(), vec![1, 2, 3]);
        asset.release();
    }
}
