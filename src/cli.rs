//! Command-line surface.
//!
//! Flags mirror the session-start descriptor fields so a session can be
//! launched without a control-plane file during development; in
//! production the JSON session descriptor is the primary source and these
//! flags/env vars only fill in what it omits (see [`crate::session::SessionConfig::load`]).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "aerolex-asr", about = "Streaming aviation-readback ASR pipeline")]
pub struct Cli {
    /// Speaker identity. Required, directly or via VR_STUDENT_ID / the session descriptor.
    #[arg(long = "student-id", env = "VR_STUDENT_ID")]
    pub student_id: Option<String>,

    #[arg(long = "video-id", env = "VR_VIDEO_ID")]
    pub video_id: Option<String>,

    #[arg(long = "session-id", env = "VR_SESSION_ID")]
    pub session_id: Option<String>,

    /// Input audio device index; device default is used when absent.
    #[arg(long = "device")]
    pub device: Option<i32>,

    #[arg(long, env = "ASR_DEBUG")]
    pub debug: bool,

    #[arg(long = "audio-dir", env = "VR_AUDIO_DIR")]
    pub audio_dir: Option<PathBuf>,

    #[arg(long = "logs-dir", env = "VR_LOGS_DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Path to the session descriptor JSON file.
    #[arg(long = "session-file")]
    pub session_file: Option<PathBuf>,

    /// Path to the pipeline configuration file (INI-like).
    #[arg(long = "config", default_value = "config.ini")]
    pub config_path: PathBuf,

    /// Path to the Silero VAD ONNX model; a standalone binary has no
    /// other way to locate it.
    #[arg(long = "vad-model", default_value = "models/silero_vad.onnx")]
    pub vad_model_path: PathBuf,

    /// Path to the whisper.cpp GGML model file.
    #[arg(long = "whisper-model", default_value = "models/ggml-base.en.bin")]
    pub whisper_model_path: PathBuf,

    /// Path to the video's reference messages (.json list or `---`-split
    /// text). Normally served by the external collaborator's HTTP layer;
    /// a standalone run reads it directly off disk.
    #[arg(long = "references")]
    pub references_path: Option<PathBuf>,

    /// Optional HTTP endpoint for best-effort result submission.
    #[arg(long = "submission-endpoint")]
    pub submission_endpoint: Option<String>,
}
