//! Audio Source: opens a capture stream on the OS audio device and
//! emits fixed-size frames of mono f32 PCM with monotonic timestamps.
//!
//! A non-blocking stream driven by an OS callback that never blocks on a
//! lock, pushing samples into a bounded channel and counting drops when
//! the channel is full.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use portaudio as pa;
use tokio::sync::mpsc;

use crate::error::AsrError;

/// Sample rates tried in order when negotiating a capture rate.
pub const PREFERRED_RATES: [f64; 5] = [48000.0, 44100.0, 22050.0, 16000.0, 8000.0];

#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples, down-mixed from the device's channel count.
    pub samples: Vec<f32>,
    pub capture_rate: u32,
    pub timestamp_monotonic: Instant,
}

pub struct AudioCapture {
    pa: pa::PortAudio,
    stream: Option<pa::Stream<pa::NonBlocking, pa::Input<f32>>>,
    chosen_rate: u32,
    channels: i32,
    dropped_frames: Arc<AtomicU64>,
}

impl AudioCapture {
    /// Opens the device, negotiating a sample rate from `preferred_rates`
    /// in order. On total failure falls back to the device's reported
    /// default sample rate. Multi-channel devices are accepted; capture
    /// down-mixes to mono by per-sample arithmetic mean.
    pub fn open(device: Option<i32>, buffer_size: u32) -> Result<(Self, u32), AsrError> {
        let pa = pa::PortAudio::new()
            .map_err(|e| AsrError::resource("audio device", anyhow::anyhow!("{e}")))?;

        let device_index = match device {
            Some(idx) => pa::DeviceIndex(idx as u32),
            None => pa
                .default_input_device()
                .map_err(|e| AsrError::resource("default input device", anyhow::anyhow!("{e}")))?,
        };

        let device_info = pa
            .device_info(device_index)
            .map_err(|e| AsrError::resource("device info", anyhow::anyhow!("{e}")))?;
        let channels = device_info.max_input_channels.max(1);

        let mut chosen_rate = None;
        for &rate in PREFERRED_RATES.iter() {
            let params = pa::StreamParameters::<f32>::new(
                device_index,
                channels,
                true,
                device_info.default_low_input_latency,
            );
            if pa.is_input_format_supported(params, rate).is_ok() {
                chosen_rate = Some(rate);
                break;
            }
        }
        let chosen_rate = chosen_rate.unwrap_or(device_info.default_sample_rate);

        let capture = Self {
            pa,
            stream: None,
            chosen_rate: chosen_rate as u32,
            channels,
            dropped_frames: Arc::new(AtomicU64::new(0)),
        };

        let rate = capture.chosen_rate;
        Ok((capture, rate))
    }

    /// Starts the non-blocking capture stream. The callback only
    /// down-mixes and pushes into `tx`; it never locks or blocks.
    pub fn start(
        &mut self,
        tx: mpsc::Sender<AudioFrame>,
        running: Arc<AtomicBool>,
        buffer_size: u32,
    ) -> Result<(), AsrError> {
        let device_index = self
            .pa
            .default_input_device()
            .map_err(|e| AsrError::resource("default input device", anyhow::anyhow!("{e}")))?;
        let latency = self
            .pa
            .device_info(device_index)
            .map_err(|e| AsrError::resource("device info", anyhow::anyhow!("{e}")))?
            .default_low_input_latency;

        let params = pa::StreamParameters::<f32>::new(device_index, self.channels, true, latency);
        let settings =
            pa::InputStreamSettings::new(params, self.chosen_rate as f64, buffer_size);

        let channels = self.channels as usize;
        let capture_rate = self.chosen_rate;
        let dropped = self.dropped_frames.clone();

        let callback = move |pa::InputStreamCallbackArgs { buffer, .. }| {
            let samples = if channels <= 1 {
                buffer.to_vec()
            } else {
                downmix(buffer, channels)
            };

            let frame = AudioFrame {
                samples,
                capture_rate,
                timestamp_monotonic: Instant::now(),
            };

            match tx.try_send(frame) {
                Ok(_) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(total, "audio channel full, dropping frame (xrun)");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!("audio channel closed, stopping callback");
                    return pa::Complete;
                }
            }

            if running.load(Ordering::Relaxed) {
                pa::Continue
            } else {
                pa::Complete
            }
        };

        let mut stream = self
            .pa
            .open_non_blocking_stream(settings, callback)
            .map_err(|e| AsrError::resource("audio stream", anyhow::anyhow!("{e}")))?;
        stream
            .start()
            .map_err(|e| AsrError::resource("audio stream start", anyhow::anyhow!("{e}")))?;

        self.stream = Some(stream);
        Ok(())
    }

    /// Closes the stream. This is the only way to stop capture.
    pub fn stop(&mut self) {
        if let Some(stream) = &mut self.stream {
            if let Err(e) = stream.stop() {
                tracing::warn!(error = %e, "failed to stop audio stream");
            }
            if let Err(e) = stream.close() {
                tracing::warn!(error = %e, "failed to close audio stream");
            }
        }
        self.stream = None;
    }

    pub fn dropped_frame_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Down-mixes interleaved multi-channel samples to mono by per-sample
/// arithmetic mean.
fn downmix(buffer: &[f32], channels: usize) -> Vec<f32> {
    buffer
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let stereo = vec![0.0, 1.0, 0.5, 0.5];
        let mono = downmix(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5]);
    }

    #[test]
    fn downmix_mono_is_identity_via_chunks() {
        let mono_in = vec![0.1, 0.2, 0.3];
        let mono_out = downmix(&mono_in, 1);
        assert_eq!(mono_out, mono_in);
    }
}
