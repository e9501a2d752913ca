//! Transcriber: wraps a Whisper-family model behind a mutually exclusive
//! compute slot, mapping 16 kHz samples to (text, confidence). Backed by
//! `whisper-rs`, reusing one `WhisperState` behind a `parking_lot::Mutex`
//! to avoid per-call allocation, with confidence computed from
//! segment-level average log-probabilities.

use std::path::Path;

use parking_lot::Mutex;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use crate::error::AsrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Gpu,
    Cpu,
}

#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub language: String,
    pub device: Device,
    pub threads: i32,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            device: Device::Gpu,
            threads: num_cpus::get().min(4) as i32,
        }
    }
}

/// A Whisper model loaded once at session start, shared by every
/// Transcriber across the process behind one exclusive compute slot.
/// `gpu_available` records whether GPU acceleration was actually
/// requested of the loaded context (used to select float16 vs int8
/// compute expectations in documentation/logging only; whisper.cpp
/// itself picks its internal compute kernels).
pub struct Model {
    context: WhisperContext,
    state: Mutex<WhisperState>,
    config: TranscriberConfig,
}

impl Model {
    /// Loads the model once, preferring GPU and falling back to CPU.
    pub fn load(model_path: impl AsRef<Path>, config: TranscriberConfig) -> Result<Self, AsrError> {
        let use_gpu = matches!(config.device, Device::Gpu);
        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = use_gpu;

        let path_str = model_path
            .as_ref()
            .to_str()
            .ok_or_else(|| AsrError::config("model path is not valid UTF-8"))?;

        let context = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| AsrError::resource("whisper model", anyhow::anyhow!("{e:?}")))?;

        let state = context
            .create_state()
            .map_err(|e| AsrError::resource("whisper state", anyhow::anyhow!("{e:?}")))?;

        Ok(Self {
            context,
            state: Mutex::new(state),
            config,
        })
    }

    pub fn is_multilingual(&self) -> bool {
        self.context.is_multilingual()
    }

    /// Transcribes 16 kHz mono samples. Model-internal VAD and any
    /// built-in segmentation heuristics beyond timestamping are
    /// disabled: segmentation has already been performed by the
    /// Segmenter. On failure returns `("", 0.0)` and logs the error;
    /// it does not propagate as fatal, per the error handling design.
    pub fn transcribe(&self, samples_16k: &[f32]) -> (String, f32) {
        match self.transcribe_inner(samples_16k) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(error = %err, "transcription failed, returning empty transcript");
                (String::new(), 0.0)
            }
        }
    }

    fn transcribe_inner(&self, samples_16k: &[f32]) -> Result<(String, f32), anyhow::Error> {
        let mut state = self.state.lock();

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.config.threads);
        params.set_language(Some(&self.config.language));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_no_context(true);
        params.set_single_segment(false);
        params.set_no_timestamps(false);

        state.full(params, samples_16k)?;

        let num_segments = state.full_n_segments()?;
        let mut text = String::new();
        let mut log_probs = Vec::new();

        for i in 0..num_segments {
            let segment_text = state.full_get_segment_text(i)?;
            text.push_str(&segment_text);

            let num_tokens = state.full_n_tokens(i)?;
            if num_tokens == 0 {
                continue;
            }
            let mut sum = 0.0f64;
            for t in 0..num_tokens {
                let token_data = state.full_get_token_data(i, t)?;
                sum += token_data.plog as f64;
            }
            log_probs.push(sum / num_tokens as f64);
        }

        let confidence = if log_probs.is_empty() {
            0.0
        } else {
            let mean = log_probs.iter().sum::<f64>() / log_probs.len() as f64;
            mean.exp() as f32
        };

        Ok((text.trim().to_string(), confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_prefers_gpu_and_english() {
        let config = TranscriberConfig::default();
        assert_eq!(config.device, Device::Gpu);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn empty_log_probs_yield_zero_confidence() {
        let log_probs: Vec<f64> = Vec::new();
        let confidence = if log_probs.is_empty() {
            0.0f32
        } else {
            (log_probs.iter().sum::<f64>() / log_probs.len() as f64).exp() as f32
        };
        assert_eq!(confidence, 0.0);
    }
}
