use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RecordingStatus {
    #[default]
    Idle,
    Recording,
    Stopped,
}

/// What the UI needs to show about a finished clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClipSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
    pub status: RecordingStatus,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Whole seconds counted by the ticker; display only.
    pub elapsed_secs: u64,
    pub clip: Option<ClipSummary>,
    pub last_error: Option<String>,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
}

impl RecordingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, session_id: String, started_at: DateTime<Utc>, now: Instant) {
        *self = Self {
            status: RecordingStatus::Recording,
            session_id: Some(session_id),
            started_at: Some(started_at),
            elapsed_secs: 0,
            clip: None,
            last_error: None,
            running_anchor: Some(now),
        };
    }

    pub fn tick(&mut self) {
        if self.status == RecordingStatus::Recording {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    pub fn recorded_ms(&self) -> u64 {
        self.running_anchor
            .map(|anchor| anchor.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn finish(&mut self, clip: ClipSummary) {
        self.status = RecordingStatus::Stopped;
        self.clip = Some(clip);
        self.running_anchor = None;
    }

    /// Back to `Idle` after a failed start or device error, keeping the reason.
    pub fn fail(&mut self, reason: String) {
        *self = Self {
            last_error: Some(reason),
            ..Self::default()
        };
    }

    /// A start that never got the device. A finished take survives it.
    pub fn start_failed(&mut self, reason: String) {
        if self.status == RecordingStatus::Stopped && self.clip.is_some() {
            self.last_error = Some(reason);
        } else {
            self.fail(reason);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `mm:ss` for the record button.
    pub fn elapsed_label(&self) -> String {
        format!("{:02}:{:02}", self.elapsed_secs / 60, self.elapsed_secs % 60)
    }
}
