use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::evidence::MediaAsset;

use super::{
    device::{CaptureError, ClipEncoding, Microphone, StreamLease},
    state::{ClipSummary, RecordingState, RecordingStatus},
    wav::encode_wav,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct CapturedAudio {
    encoding: ClipEncoding,
    chunks: Vec<Vec<u8>>,
}

/// Everything that only exists while the microphone is held.
struct RecordingSession {
    cancel_token: CancellationToken,
    capture: JoinHandle<CapturedAudio>,
    ticker: JoinHandle<()>,
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // The capture task releases the stream when it sees the cancellation; if the
        // runtime is already gone the task's lease is dropped and releases instead.
        self.cancel_token.cancel();
        self.ticker.abort();
    }
}

/// Voice note recorder: `Idle -> Recording -> Stopped`, back to `Idle` on discard or error.
#[derive(Clone)]
pub struct VoiceRecorder {
    microphone: Arc<dyn Microphone>,
    state: Arc<Mutex<RecordingState>>,
    session: Arc<Mutex<Option<RecordingSession>>>,
    clip: Arc<Mutex<Option<MediaAsset>>>,
    events: Arc<watch::Sender<RecordingState>>,
    tick_interval: Duration,
}

impl VoiceRecorder {
    pub fn new(microphone: Arc<dyn Microphone>) -> Self {
        let (events, _) = watch::channel(RecordingState::new());
        Self {
            microphone,
            state: Arc::new(Mutex::new(RecordingState::new())),
            session: Arc::new(Mutex::new(None)),
            clip: Arc::new(Mutex::new(None)),
            events: Arc::new(events),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn get_state(&self) -> RecordingState {
        self.state.lock().await.clone()
    }

    /// State changes and the once-a-second elapsed counter, for the record button.
    pub fn subscribe(&self) -> watch::Receiver<RecordingState> {
        self.events.subscribe()
    }

    pub async fn start_recording(&self) -> Result<RecordingState, CaptureError> {
        let mut session_guard = self.session.lock().await;
        if session_guard.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let stream = match self.microphone.acquire().await {
            Ok(stream) => stream,
            Err(err) => {
                log_warn!("Microphone acquisition failed: {err}");
                let mut state = self.state.lock().await;
                state.start_failed(err.to_string());
                self.events.send_replace(state.clone());
                return Err(err);
            }
        };

        // A new take replaces whatever the previous one left behind.
        self.discard_retained_clip().await;

        let lease = StreamLease::new(stream);
        let cancel_token = CancellationToken::new();
        let capture = tokio::spawn(capture_loop(lease, cancel_token.clone()));

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.begin(session_id.clone(), Utc::now(), Instant::now());
        }
        let ticker = self.spawn_ticker();

        *session_guard = Some(RecordingSession {
            cancel_token,
            capture,
            ticker,
        });
        drop(session_guard);

        log_info!("Voice recording {session_id} started");
        Ok(self.publish().await)
    }

    /// Finalizes the take. Outside `Recording` this does nothing and returns `None`.
    ///
    /// The session lock is held until the stream is released and the clip stored, so a
    /// concurrent `start_recording` waits for this take to finish.
    pub async fn stop_recording(&self) -> Result<Option<ClipSummary>, CaptureError> {
        let mut session_guard = self.session.lock().await;
        let Some(mut session) = session_guard.take() else {
            log_debug!("stop_recording ignored, nothing is recording");
            return Ok(None);
        };

        session.cancel_token.cancel();
        session.ticker.abort();

        let captured = match (&mut session.capture).await {
            Ok(captured) => captured,
            Err(err) => {
                log_error!("Capture task failed to join: {err}");
                let mut state = self.state.lock().await;
                state.fail("recording failed".to_string());
                self.events.send_replace(state.clone());
                return Err(CaptureError::Device(format!("capture task failed: {err}")));
            }
        };

        let (asset, summary) = {
            let mut state = self.state.lock().await;
            let duration_ms = state.recorded_ms();
            let session_id = state.session_id.clone().unwrap_or_default();
            let asset = finalize_clip(captured, &session_id);
            let summary = ClipSummary {
                file_name: asset.file_name().to_string(),
                mime_type: asset.mime_type().to_string(),
                size_bytes: asset.size_bytes(),
                duration_ms,
            };
            state.finish(summary.clone());
            (asset, summary)
        };

        *self.clip.lock().await = Some(asset);
        self.publish().await;
        drop(session_guard);

        log_info!(
            "Voice recording stopped: {} bytes over {}ms",
            summary.size_bytes,
            summary.duration_ms
        );
        Ok(Some(summary))
    }

    /// Moves the finished clip out, typically into an `EvidenceBundle`.
    pub async fn take_clip(&self) -> Option<MediaAsset> {
        self.clip.lock().await.take()
    }

    /// Throws the clip away and returns to `Idle`. Ignored while recording.
    pub async fn discard_clip(&self) {
        if self.state.lock().await.status == RecordingStatus::Recording {
            log_debug!("discard_clip ignored while recording");
            return;
        }

        self.discard_retained_clip().await;
        self.state.lock().await.reset();
        self.publish().await;
    }

    /// Teardown: releases the microphone if a take is in progress and drops any clip.
    pub async fn shutdown(&self) {
        let mut session_guard = self.session.lock().await;
        if let Some(mut session) = session_guard.take() {
            session.cancel_token.cancel();
            session.ticker.abort();
            if let Err(err) = (&mut session.capture).await {
                log_error!("Capture task failed during shutdown: {err}");
            }
            log_info!("Voice recorder shut down mid-recording");
        }

        self.discard_retained_clip().await;
        self.state.lock().await.reset();
        self.publish().await;
    }

    async fn discard_retained_clip(&self) {
        if let Some(clip) = self.clip.lock().await.take() {
            clip.release();
        }
    }

    async fn publish(&self) -> RecordingState {
        let snapshot = self.state.lock().await.clone();
        self.events.send_replace(snapshot.clone());
        snapshot
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;

                let snapshot = {
                    let mut guard = state.lock().await;
                    if guard.status != RecordingStatus::Recording {
                        break;
                    }
                    guard.tick();
                    guard.clone()
                };

                events.send_replace(snapshot);
            }
        })
    }
}

async fn capture_loop(mut lease: StreamLease, cancel_token: CancellationToken) -> CapturedAudio {
    let encoding = lease.encoding().clone();
    let mut chunks = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            chunk = lease.next_chunk() => match chunk {
                Some(chunk) if chunk.is_empty() => {}
                Some(chunk) => chunks.push(chunk),
                None => {
                    log_warn!("Microphone stream ended before stop");
                    break;
                }
            }
        }
    }

    chunks.extend(lease.flush().into_iter().filter(|chunk| !chunk.is_empty()));
    lease.release();

    CapturedAudio { encoding, chunks }
}

fn finalize_clip(captured: CapturedAudio, session_id: &str) -> MediaAsset {
    let CapturedAudio { encoding, chunks } = captured;
    let joined = chunks.concat();

    let bytes = match &encoding {
        ClipEncoding::Pcm16 {
            sample_rate,
            channels,
        } => encode_wav(&joined, *sample_rate, *channels),
        ClipEncoding::Encoded { .. } => joined,
    };

    let short_id = session_id.get(..8).unwrap_or(session_id);
    let file_name = format!("voice-report-{short_id}.{}", encoding.file_extension());

    MediaAsset::from_bytes(file_name, encoding.mime_type(), bytes)
}
