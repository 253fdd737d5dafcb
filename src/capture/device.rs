use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Microphone,
    Camera,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Microphone => f.write_str("microphone"),
            DeviceKind::Camera => f.write_str("camera"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0} access denied")]
    PermissionDenied(DeviceKind),
    #[error("no {0} available")]
    DeviceUnavailable(DeviceKind),
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("audio device error: {0}")]
    Device(String),
}

/// How the chunks of a stream turn into a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipEncoding {
    /// Interleaved little-endian signed 16-bit samples, wrapped in WAV on stop.
    Pcm16 { sample_rate: u32, channels: u16 },
    /// Chunks already form a container stream and are joined as-is.
    Encoded { mime_type: String },
}

impl ClipEncoding {
    pub fn mime_type(&self) -> &str {
        match self {
            ClipEncoding::Pcm16 { .. } => "audio/wav",
            ClipEncoding::Encoded { mime_type } => mime_type,
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            "audio/wav" => "wav",
            "audio/webm" => "webm",
            "audio/ogg" => "ogg",
            "audio/mpeg" => "mp3",
            "audio/mp4" => "m4a",
            _ => "bin",
        }
    }
}

/// A live capture from an acquired device.
#[async_trait]
pub trait AudioStream: Send {
    fn encoding(&self) -> ClipEncoding;

    /// Waits for the next chunk. `None` means the device stopped producing.
    async fn next_chunk(&mut self) -> Option<Vec<u8>>;

    /// Chunks already captured but not yet handed out by `next_chunk`.
    fn flush(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    /// Hands the hardware back. Called exactly once, through `StreamLease`.
    fn release(&mut self);
}

/// Permission-gated access to the microphone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Microphone: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError>;
}

/// Stand-in for hosts built without audio capture.
pub struct NoMicrophone;

#[async_trait]
impl Microphone for NoMicrophone {
    async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
        Err(CaptureError::DeviceUnavailable(DeviceKind::Microphone))
    }
}

/// Holds an acquired stream and releases it once, either explicitly or on drop.
pub struct StreamLease {
    stream: Option<Box<dyn AudioStream>>,
    encoding: ClipEncoding,
}

impl StreamLease {
    pub fn new(stream: Box<dyn AudioStream>) -> Self {
        let encoding = stream.encoding();
        Self {
            stream: Some(stream),
            encoding,
        }
    }

    pub fn encoding(&self) -> &ClipEncoding {
        &self.encoding
    }

    pub fn is_released(&self) -> bool {
        self.stream.is_none()
    }

    pub async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next_chunk().await,
            None => None,
        }
    }

    pub fn flush(&mut self) -> Vec<Vec<u8>> {
        self.stream
            .as_mut()
            .map(|stream| stream.flush())
            .unwrap_or_default()
    }

    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            log_debug!("Microphone stream released");
        }
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.release_now();
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Yields its queued chunks, then idles like a quiet microphone.
    pub struct FakeStream {
        pub chunks: VecDeque<Vec<u8>>,
        pub buffered: Vec<Vec<u8>>,
        pub encoding: ClipEncoding,
        pub ends_after_chunks: bool,
        pub releases: Arc<AtomicUsize>,
    }

    impl FakeStream {
        pub fn pcm(chunks: Vec<Vec<u8>>, releases: Arc<AtomicUsize>) -> Self {
            Self {
                chunks: chunks.into(),
                buffered: Vec::new(),
                encoding: ClipEncoding::Pcm16 {
                    sample_rate: 8_000,
                    channels: 1,
                },
                ends_after_chunks: false,
                releases,
            }
        }
    }

    #[async_trait]
    impl AudioStream for FakeStream {
        fn encoding(&self) -> ClipEncoding {
            self.encoding.clone()
        }

        async fn next_chunk(&mut self) -> Option<Vec<u8>> {
            if let Some(chunk) = self.chunks.pop_front() {
                return Some(chunk);
            }
            if self.ends_after_chunks {
                return None;
            }
            std::future::pending().await
        }

        fn flush(&mut self) -> Vec<Vec<u8>> {
            std::mem::take(&mut self.buffered)
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::FakeStream;
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn lease_releases_once_when_released_then_dropped() {
        let releases = Arc::new(AtomicUsize::new(0));
        let lease = StreamLease::new(Box::new(FakeStream::pcm(vec![], releases.clone())));

        lease.release();

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lease_releases_on_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let lease = StreamLease::new(Box::new(FakeStream::pcm(vec![], releases.clone())));
            assert!(!lease.is_released());
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn encoding_names() {
        let pcm = ClipEncoding::Pcm16 {
            sample_rate: 44_100,
            channels: 2,
        };
        assert_eq!(pcm.mime_type(), "audio/wav");
        assert_eq!(pcm.file_extension(), "wav");

        let webm = ClipEncoding::Encoded {
            mime_type: "audio/webm".into(),
        };
        assert_eq!(webm.file_extension(), "webm");
    }

    #[test]
    fn permission_error_names_the_device() {
        assert_eq!(
            CaptureError::PermissionDenied(DeviceKind::Microphone).to_string(),
            "microphone access denied"
        );
    }

    #[tokio::test]
    async fn no_microphone_reports_unavailable() {
        let err = NoMicrophone.acquire().await.err().unwrap();
        assert_eq!(err, CaptureError::DeviceUnavailable(DeviceKind::Microphone));
    }
}
