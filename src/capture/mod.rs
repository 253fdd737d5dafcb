#[cfg(feature = "device-capture")]
pub mod cpal_device;
pub mod device;
pub mod recorder;
pub mod state;
pub mod wav;

#[cfg(feature = "device-capture")]
pub use cpal_device::CpalMicrophone;
pub use device::{
    AudioStream, CaptureError, ClipEncoding, DeviceKind, Microphone, NoMicrophone, StreamLease,
};
pub use recorder::VoiceRecorder;
pub use state::{ClipSummary, RecordingState, RecordingStatus};
