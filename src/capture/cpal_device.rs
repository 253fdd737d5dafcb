//! Microphone backed by the system audio host.
//!
//! Input streams are not `Send` on every platform, so each acquisition parks the stream on
//! a dedicated thread and forwards PCM chunks over a channel until released.

use std::{sync::mpsc as std_mpsc, thread};

use async_trait::async_trait;
use rodio::cpal::{
    self,
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat,
};
use tokio::sync::{mpsc, oneshot};

use super::{
    device::{AudioStream, CaptureError, ClipEncoding, DeviceKind, Microphone},
    wav::f32_to_pcm16,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Default)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn acquire(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<ClipEncoding, CaptureError>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match open_input(chunk_tx) {
                    Ok((stream, encoding)) => {
                        let _ = ready_tx.send(Ok(encoding));
                        stream
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                // Blocks until the lease releases us or the sender is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                log_info!("Microphone input stream closed");
            })
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        let encoding = ready_rx
            .await
            .map_err(|_| CaptureError::Device("microphone thread exited early".to_string()))??;

        Ok(Box::new(CpalStream {
            chunks: chunk_rx,
            stop: Some(stop_tx),
            encoding,
        }))
    }
}

fn open_input(
    chunk_tx: mpsc::UnboundedSender<Vec<u8>>,
) -> Result<(cpal::Stream, ClipEncoding), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceUnavailable(DeviceKind::Microphone))?;
    let supported = device
        .default_input_config()
        .map_err(|err| CaptureError::Device(err.to_string()))?;

    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let encoding = ClipEncoding::Pcm16 {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let on_error = |err: cpal::StreamError| log_error!("Microphone stream error: {err}");

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = chunk_tx.send(f32_to_pcm16(data));
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let bytes = data.iter().flat_map(|sample| sample.to_le_bytes()).collect();
                let _ = chunk_tx.send(bytes);
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::Device(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|err| match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable(DeviceKind::Microphone)
        }
        other => CaptureError::Device(other.to_string()),
    })?;

    stream
        .play()
        .map_err(|err| CaptureError::Device(err.to_string()))?;

    Ok((stream, encoding))
}

struct CpalStream {
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    stop: Option<std_mpsc::Sender<()>>,
    encoding: ClipEncoding,
}

#[async_trait]
impl AudioStream for CpalStream {
    fn encoding(&self) -> ClipEncoding {
        self.encoding.clone()
    }

    async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.recv().await
    }

    fn flush(&mut self) -> Vec<Vec<u8>> {
        let mut pending = Vec::new();
        while let Ok(chunk) = self.chunks.try_recv() {
            pending.push(chunk);
        }
        pending
    }

    fn release(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.chunks.close();
    }
}
