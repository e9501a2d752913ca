//! Pipeline configuration.
//!
//! The configuration file is an INI-like key-value format with four
//! sections (`BUFFER_SETTINGS`, `VAD_SETTINGS`, `MODEL_SETTINGS`,
//! `ASR_QUALITY`), not TOML, so operators can keep reusing existing
//! `configparser`-style config files. Missing keys fall back to the
//! defaults below; a key that is present but fails to parse is a
//! configuration error.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AsrError, AsrResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferSettings {
    pub use_circular_buffer: bool,
    pub buffer_duration: f32,
    pub speech_timeout: f32,
    pub min_speech_duration: f32,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            use_circular_buffer: true,
            buffer_duration: 5.0,
            speech_timeout: 1.0,
            min_speech_duration: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VadSettings {
    pub vad_threshold: f32,
    pub min_speech_duration_ms: u64,
    pub min_silence_duration_ms: u64,
    pub speech_pad_ms: u64,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            vad_threshold: 0.6,
            min_speech_duration_ms: 400,
            min_silence_duration_ms: 300,
            speech_pad_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub model_name: String,
    pub device: String,
    pub compute_type: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_name: "ggml-base.en.bin".to_string(),
            device: "auto".to_string(),
            compute_type: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AsrQuality {
    pub min_confidence: f32,
    pub min_transcript_length: usize,
    pub min_word_count: usize,
    pub match_threshold: f32,
}

impl Default for AsrQuality {
    fn default() -> Self {
        Self {
            min_confidence: 0.55,
            min_transcript_length: 10,
            min_word_count: 3,
            match_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub buffer: BufferSettings,
    pub vad: VadSettings,
    pub model: ModelSettings,
    pub quality: AsrQuality,
}

/// Parses the INI-like `[SECTION]` / `KEY = value` format described in
/// the configuration file interface. `;` and `#` start a comment; blank
/// lines are skipped. Returns section -> key -> raw string value.
fn parse_sections(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            current = line[1..line.len() - 1].trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if current.is_empty() {
                continue;
            }
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

fn parse_field<T: std::str::FromStr>(
    section: &HashMap<String, String>,
    key: &str,
    default: T,
) -> AsrResult<T> {
    match section.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            AsrError::config(format!("could not parse key '{key}' with value '{raw}'"))
        }),
    }
}

fn parse_bool(section: &HashMap<String, String>, key: &str, default: bool) -> AsrResult<bool> {
    match section.get(key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AsrError::config(format!(
                "could not parse boolean key '{key}' with value '{raw}'"
            ))),
        },
    }
}

/// Builds an `AppConfig` from parsed sections, applying defaults for any
/// section or key that is absent.
fn build_config(sections: &HashMap<String, HashMap<String, String>>) -> AsrResult<AppConfig> {
    let empty = HashMap::new();
    let buf = sections.get("BUFFER_SETTINGS").unwrap_or(&empty);
    let vad = sections.get("VAD_SETTINGS").unwrap_or(&empty);
    let model = sections.get("MODEL_SETTINGS").unwrap_or(&empty);
    let quality = sections.get("ASR_QUALITY").unwrap_or(&empty);

    let defaults = AppConfig::default();

    Ok(AppConfig {
        buffer: BufferSettings {
            use_circular_buffer: parse_bool(
                buf,
                "USE_CIRCULAR_BUFFER",
                defaults.buffer.use_circular_buffer,
            )?,
            buffer_duration: parse_field(buf, "BUFFER_DURATION", defaults.buffer.buffer_duration)?,
            speech_timeout: parse_field(buf, "SPEECH_TIMEOUT", defaults.buffer.speech_timeout)?,
            min_speech_duration: parse_field(
                buf,
                "MIN_SPEECH_DURATION",
                defaults.buffer.min_speech_duration,
            )?,
        },
        vad: VadSettings {
            vad_threshold: parse_field(vad, "VAD_THRESHOLD", defaults.vad.vad_threshold)?,
            min_speech_duration_ms: parse_field(
                vad,
                "MIN_SPEECH_DURATION_MS",
                defaults.vad.min_speech_duration_ms,
            )?,
            min_silence_duration_ms: parse_field(
                vad,
                "MIN_SILENCE_DURATION_MS",
                defaults.vad.min_silence_duration_ms,
            )?,
            speech_pad_ms: parse_field(vad, "SPEECH_PAD_MS", defaults.vad.speech_pad_ms)?,
        },
        model: ModelSettings {
            model_name: model
                .get("MODEL_NAME")
                .cloned()
                .unwrap_or(defaults.model.model_name),
            device: model
                .get("DEVICE")
                .cloned()
                .unwrap_or(defaults.model.device),
            compute_type: model
                .get("COMPUTE_TYPE")
                .cloned()
                .unwrap_or(defaults.model.compute_type),
        },
        quality: AsrQuality {
            min_confidence: parse_field(
                quality,
                "MIN_CONFIDENCE",
                defaults.quality.min_confidence,
            )?,
            min_transcript_length: parse_field(
                quality,
                "MIN_TRANSCRIPT_LENGTH",
                defaults.quality.min_transcript_length,
            )?,
            min_word_count: parse_field(
                quality,
                "MIN_WORD_COUNT",
                defaults.quality.min_word_count,
            )?,
            match_threshold: parse_field(
                quality,
                "MATCH_THRESHOLD",
                defaults.quality.match_threshold,
            )?,
        },
    })
}

/// Reads the configuration file at `path`. A missing file yields
/// defaults with a warning; a file that exists but fails to parse a
/// present key is a fatal configuration error.
pub fn read_app_config(path: &Path) -> AsrResult<AppConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "config file not found, using defaults"
            );
            return Ok(AppConfig::default());
        }
    };

    let sections = parse_sections(&text);
    build_config(&sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = AppConfig::default();
        assert_eq!(config.buffer.buffer_duration, 5.0);
        assert_eq!(config.vad.vad_threshold, 0.6);
        assert_eq!(config.quality.min_confidence, 0.55);
        assert_eq!(config.quality.match_threshold, 0.3);
    }

    #[test]
    fn parses_sections_and_overrides() {
        let text = r#"
            [VAD_SETTINGS]
            VAD_THRESHOLD = 0.7
            ; a comment
            [ASR_QUALITY]
            MIN_CONFIDENCE = 0.6
            MIN_WORD_COUNT = 2
        "#;
        let sections = parse_sections(text);
        let config = build_config(&sections).unwrap();
        assert_eq!(config.vad.vad_threshold, 0.7);
        assert_eq!(config.quality.min_confidence, 0.6);
        assert_eq!(config.quality.min_word_count, 2);
        // untouched keys keep their defaults
        assert_eq!(config.buffer.buffer_duration, 5.0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = read_app_config(Path::new("/nonexistent/path/config.ini")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn unparsable_present_key_is_an_error() {
        let text = "[VAD_SETTINGS]\nVAD_THRESHOLD = not_a_number\n";
        let sections = parse_sections(text);
        assert!(build_config(&sections).is_err());
    }
}
