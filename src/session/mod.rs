//! Session Controller: owns per-session configuration, life cycle, the
//! stop flag, the audio-segment store path, and the append-only record
//! log; orchestrates AS -> SG -> TR -> NS -> QG -> record.

pub mod record;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::audio::{AudioCapture, RingBuffer};
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::error::{AsrError, AsrResult};
use crate::matcher::find_best_match;
use crate::quality_gate;
use crate::reference_set::ReferenceSet;
use crate::segmenter::{Segmenter, SegmenterConfig, Utterance};
use crate::stop_flag::StopFlag;
use crate::submission::{submit, SubmissionPayload};
use crate::transcriber::Model;
use crate::vad::{VadConfig, VadEngine};
use record::{RecordLog, UtteranceRecord};

const AUDIO_CHANNEL_CAPACITY: usize = 64;
const CAPTURE_BUFFER_SIZE: u32 = 1024;

/// The on-disk JSON descriptor placed by the external collaborator,
/// merged with environment variables and CLI flags in that order (file
/// fills first, env fills gaps, CLI fills whatever's still missing).
#[derive(Debug, Clone, Default, Deserialize)]
struct SessionDescriptor {
    student_id: Option<String>,
    video_id: Option<String>,
    session_id: Option<String>,
    audio_dir: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
    #[allow(dead_code)]
    mode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub student_id: String,
    pub video_id: String,
    pub session_id: String,
    pub audio_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl SessionConfig {
    /// Resolves session identifiers from (in precedence order) a
    /// descriptor file, environment variables (via the CLI's `env`
    /// attributes), then CLI flags. `student_id` missing after all
    /// three sources is a fatal configuration error.
    pub fn load(cli: &Cli) -> AsrResult<Self> {
        let descriptor = match &cli.session_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| AsrError::io(path, e))?;
                serde_json::from_str(&text)
                    .map_err(|e| AsrError::config(format!("invalid session descriptor: {e}")))?
            }
            None => SessionDescriptor::default(),
        };

        let student_id = descriptor
            .student_id
            .or_else(|| cli.student_id.clone())
            .ok_or_else(|| AsrError::config("student_id is required"))?;
        let video_id = descriptor.video_id.or_else(|| cli.video_id.clone()).unwrap_or_default();
        let session_id = descriptor
            .session_id
            .or_else(|| cli.session_id.clone())
            .unwrap_or_else(|| format!("session-{student_id}"));
        let audio_dir = descriptor
            .audio_dir
            .or_else(|| cli.audio_dir.clone())
            .unwrap_or_else(|| PathBuf::from("audio"));
        let logs_dir = descriptor
            .logs_dir
            .or_else(|| cli.logs_dir.clone())
            .unwrap_or_else(|| PathBuf::from("logs"));

        Ok(Self {
            student_id,
            video_id,
            session_id,
            audio_dir,
            logs_dir,
        })
    }
}

pub struct SessionController {
    session: SessionConfig,
    app_config: AppConfig,
    capture: AudioCapture,
    capture_rate: u32,
    ccb: Arc<RingBuffer>,
    segmenter: Segmenter,
    model: Arc<Model>,
    references: Option<ReferenceSet>,
    record_log: Arc<RecordLog>,
    stop_flag: StopFlag,
    submission_endpoint: Option<String>,
    http_client: reqwest::Client,
    running: Arc<AtomicBool>,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionConfig,
        app_config: AppConfig,
        device: Option<i32>,
        vad_model_path: &Path,
        whisper_model_path: &Path,
        references: Option<ReferenceSet>,
        submission_endpoint: Option<String>,
    ) -> AsrResult<Self> {
        let (capture, capture_rate) = AudioCapture::open(device, CAPTURE_BUFFER_SIZE)?;

        let ccb_capacity = (capture_rate as f32 * app_config.buffer.buffer_duration) as usize;
        let ccb = Arc::new(RingBuffer::new(ccb_capacity.max(1)));

        let vad_config = VadConfig {
            threshold: app_config.vad.vad_threshold,
            sample_rate: 16000,
            min_speech_duration_ms: app_config.vad.min_speech_duration_ms,
            min_silence_duration_ms: app_config.vad.min_silence_duration_ms,
            speech_pad_ms: app_config.vad.speech_pad_ms,
        };
        let vad = VadEngine::new(vad_model_path, vad_config)
            .map_err(|e| AsrError::resource("vad model", e))?;

        let segmenter_config = SegmenterConfig {
            min_speech_duration_s: app_config.buffer.min_speech_duration as f64,
            speech_timeout_s: app_config.buffer.speech_timeout as f64,
        };
        let segmenter = Segmenter::new(vad, segmenter_config, capture_rate);

        let transcriber_config = crate::transcriber::TranscriberConfig {
            language: "en".to_string(),
            device: if app_config.model.device.eq_ignore_ascii_case("cpu") {
                crate::transcriber::Device::Cpu
            } else {
                crate::transcriber::Device::Gpu
            },
            threads: num_cpus::get().min(4) as i32,
        };
        let model = Arc::new(Model::load(whisper_model_path, transcriber_config)?);

        let record_log = Arc::new(RecordLog::new(session.logs_dir.join("asr_results.jsonl")));
        let stop_flag = StopFlag::new(&session.logs_dir);

        Ok(Self {
            session,
            app_config,
            capture,
            capture_rate,
            ccb,
            segmenter,
            model,
            references,
            record_log,
            stop_flag,
            submission_endpoint,
            http_client: reqwest::Client::new(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Runs the session until the audio stream closes or cancellation is
    /// requested. Spawns the frame consumer (segmentation, single
    /// consumer task owning all VAD/segment state) and a transcribe-and-
    /// publish task per emitted Utterance.
    pub async fn run(&mut self) -> AsrResult<()> {
        let (frame_tx, mut frame_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);

        self.capture
            .start(frame_tx, self.running.clone(), CAPTURE_BUFFER_SIZE)?;

        let session_epoch = std::time::Instant::now();
        let mut publish_tasks = Vec::new();

        while let Some(frame) = frame_rx.recv().await {
            self.ccb.push(&frame.samples);
            let frame_ts = frame.timestamp_monotonic.duration_since(session_epoch).as_secs_f64();

            if let Some(utterance) = self.segmenter.push_frame(&frame.samples, frame_ts, &self.ccb) {
                let handle = self.spawn_publish_task(utterance);
                publish_tasks.push(handle);
            }
        }

        for handle in publish_tasks {
            let _ = handle.await;
        }

        Ok(())
    }

    fn spawn_publish_task(&self, utterance: Utterance) -> tokio::task::JoinHandle<()> {
        let model = self.model.clone();
        let record_log = self.record_log.clone();
        let stop_flag = self.stop_flag.clone();
        let references = self.references.clone();
        let quality = self.app_config.quality.clone();
        let audio_dir = self.session.audio_dir.clone();
        let student_id = self.session.student_id.clone();
        let video_id = self.session.video_id.clone();
        let session_id = self.session.session_id.clone();
        let submission_endpoint = self.submission_endpoint.clone();
        let http_client = self.http_client.clone();

        tokio::spawn(async move {
            if stop_flag.is_set() {
                tracing::debug!(session_id, "stop flag set before transcription, dropping utterance");
                return;
            }

            let samples = utterance.samples_16k.clone();
            let model_for_blocking = model.clone();
            let (text, confidence) =
                match tokio::task::spawn_blocking(move || model_for_blocking.transcribe(&samples)).await {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!(error = %err, "transcription task panicked");
                        (String::new(), 0.0)
                    }
                };

            if stop_flag.is_set() {
                tracing::debug!(session_id, "stop flag set after transcription, dropping utterance");
                return;
            }

            if let Err(reason) = quality_gate::check(&text, confidence, &quality) {
                tracing::info!(reason = %reason, confidence, "utterance rejected by quality gate");
                return;
            }

            let score = references
                .as_ref()
                .map(|refs| find_best_match(&text, refs, quality.match_threshold as f64));

            let timestamp = Utc::now().to_rfc3339();
            let filename = crate::wav_writer::filename_for_timestamp(&timestamp);
            let audio_file = match crate::wav_writer::write_clip(&audio_dir, &filename, &utterance.samples_16k) {
                Ok(path) => path.to_string_lossy().to_string(),
                Err(err) => {
                    tracing::error!(error = %err, "failed to write audio clip, continuing without it");
                    String::new()
                }
            };

            let record = UtteranceRecord::new(
                utterance.start_ts,
                utterance.end_ts,
                text.clone(),
                confidence,
                timestamp,
                student_id.clone(),
                video_id.clone(),
                session_id.clone(),
                audio_file,
                score.as_ref(),
            );

            if let Err(err) = record_log.append(&record) {
                tracing::error!(error = %err, "failed to append record, capture continues");
                return;
            }

            if let Some(endpoint) = submission_endpoint {
                let payload = SubmissionPayload {
                    session_id: &session_id,
                    student_id: &student_id,
                    video_id: &video_id,
                    transcript: &text,
                    confidence,
                    audio_file_path: record.audio_file(),
                };
                if let Some(evaluation) = submit(&http_client, &endpoint, &payload).await {
                    if let Err(err) = record_log.update_evaluation(
                        record.timestamp(),
                        evaluation.similarity,
                        evaluation.wer,
                        evaluation.matched_ground_truth,
                    ) {
                        tracing::error!(error = %err, "failed to merge submission evaluation into log");
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Returns a shared handle to the running flag so an external signal
    /// handler (e.g. Ctrl+C) can request shutdown without holding a
    /// reference to the controller itself.
    pub fn running_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_requires_student_id() {
        let cli = Cli {
            student_id: None,
            video_id: None,
            session_id: None,
            device: None,
            debug: false,
            audio_dir: None,
            logs_dir: None,
            session_file: None,
            config_path: PathBuf::from("config.ini"),
            vad_model_path: PathBuf::from("models/silero_vad.onnx"),
            whisper_model_path: PathBuf::from("models/ggml-base.en.bin"),
            references_path: None,
            submission_endpoint: None,
        };
        assert!(SessionConfig::load(&cli).is_err());
    }

    #[test]
    fn session_config_accepts_cli_student_id() {
        let cli = Cli {
            student_id: Some("alice".to_string()),
            video_id: Some("v1".to_string()),
            session_id: None,
            device: None,
            debug: false,
            audio_dir: None,
            logs_dir: None,
            session_file: None,
            config_path: PathBuf::from("config.ini"),
            vad_model_path: PathBuf::from("models/silero_vad.onnx"),
            whisper_model_path: PathBuf::from("models/ggml-base.en.bin"),
            references_path: None,
            submission_endpoint: None,
        };
        let config = SessionConfig::load(&cli).unwrap();
        assert_eq!(config.student_id, "alice");
        assert_eq!(config.video_id, "v1");
        assert_eq!(config.session_id, "session-alice");
    }
}
