//! UtteranceRecord: the append-only JSONL record written per accepted
//! utterance. Represented as a closed tagged variant (`Basic` vs
//! `Scored`) with explicit optional fields, per the design note that
//! the schema should not be an ad-hoc map.

use std::fs::OpenOptions;
use std::io::Write;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::AsrError;
use crate::matcher::ScoreReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum UtteranceRecord {
    /// No reference matched above `MATCH_THRESHOLD` (or there was no
    /// `ReferenceSet` at all).
    Basic {
        start: f64,
        end: f64,
        transcript: String,
        confidence: f32,
        timestamp: String,
        student_id: String,
        video_id: String,
        session_id: String,
        audio_file: String,
    },
    /// A reference matched; the optional scoring fields are present.
    Scored {
        start: f64,
        end: f64,
        transcript: String,
        confidence: f32,
        timestamp: String,
        student_id: String,
        video_id: String,
        session_id: String,
        audio_file: String,
        similarity_score: f64,
        wer: f64,
        matched_ground_truth: String,
    },
}

impl UtteranceRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: f64,
        end: f64,
        transcript: String,
        confidence: f32,
        timestamp: String,
        student_id: String,
        video_id: String,
        session_id: String,
        audio_file: String,
        score: Option<&ScoreReport>,
    ) -> Self {
        let start = round2(start);
        let end = round2(end);
        let confidence = round3(confidence);

        match score {
            Some(score) if score.matched_index >= 0 => UtteranceRecord::Scored {
                start,
                end,
                transcript,
                confidence,
                timestamp,
                student_id,
                video_id,
                session_id,
                audio_file,
                similarity_score: round4(score.similarity),
                wer: round4(score.wer),
                matched_ground_truth: score
                    .matched_text
                    .clone()
                    .unwrap_or_default(),
            },
            _ => UtteranceRecord::Basic {
                start,
                end,
                transcript,
                confidence,
                timestamp,
                student_id,
                video_id,
                session_id,
                audio_file,
            },
        }
    }

    pub fn transcript(&self) -> &str {
        match self {
            UtteranceRecord::Basic { transcript, .. } => transcript,
            UtteranceRecord::Scored { transcript, .. } => transcript,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            UtteranceRecord::Basic { session_id, .. } => session_id,
            UtteranceRecord::Scored { session_id, .. } => session_id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            UtteranceRecord::Basic { timestamp, .. } => timestamp,
            UtteranceRecord::Scored { timestamp, .. } => timestamp,
        }
    }

    pub fn audio_file(&self) -> &str {
        match self {
            UtteranceRecord::Basic { audio_file, .. } => audio_file,
            UtteranceRecord::Scored { audio_file, .. } => audio_file,
        }
    }

    /// Applies a submission endpoint's evaluation response (similarity,
    /// wer, matched ground truth) to this record, producing a `Scored`
    /// variant even if it started out `Basic` (NS found no local match
    /// but the external collaborator's evaluation did).
    fn with_evaluation(self, similarity: f64, wer: f64, matched_ground_truth: String) -> Self {
        let (start, end, transcript, confidence, timestamp, student_id, video_id, session_id, audio_file) =
            match self {
                UtteranceRecord::Basic {
                    start,
                    end,
                    transcript,
                    confidence,
                    timestamp,
                    student_id,
                    video_id,
                    session_id,
                    audio_file,
                } => (
                    start, end, transcript, confidence, timestamp, student_id, video_id, session_id,
                    audio_file,
                ),
                UtteranceRecord::Scored {
                    start,
                    end,
                    transcript,
                    confidence,
                    timestamp,
                    student_id,
                    video_id,
                    session_id,
                    audio_file,
                    ..
                } => (
                    start, end, transcript, confidence, timestamp, student_id, video_id, session_id,
                    audio_file,
                ),
            };

        UtteranceRecord::Scored {
            start,
            end,
            transcript,
            confidence,
            timestamp,
            student_id,
            video_id,
            session_id,
            audio_file,
            similarity_score: round4(similarity),
            wer: round4(wer),
            matched_ground_truth,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Append-only, single-writer-per-session JSONL log. Each `append` call
/// is serialized so concurrent publish tasks never interleave partial
/// lines; a line is either complete or absent.
pub struct RecordLog {
    path: std::path::PathBuf,
    lock: Mutex<()>,
}

impl RecordLog {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn append(&self, record: &UtteranceRecord) -> Result<(), AsrError> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AsrError::io(parent, e))?;
        }

        let line = serde_json::to_string(record)
            .map_err(|e| AsrError::resource("record serialization", anyhow::anyhow!("{e}")))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AsrError::io(&self.path, e))?;

        writeln!(file, "{line}").map_err(|e| AsrError::io(&self.path, e))?;
        Ok(())
    }

    /// Rewrites the log line whose `timestamp` matches, merging in an
    /// optional result-submission response's evaluation fields. The
    /// record is written locally first (so capture never blocks on the
    /// network), then amended in place once the external collaborator's
    /// best-effort scoring comes back. A missing match (log rotated,
    /// timestamp not found) is a no-op, not an error.
    pub fn update_evaluation(
        &self,
        timestamp: &str,
        similarity: f64,
        wer: f64,
        matched_ground_truth: String,
    ) -> Result<(), AsrError> {
        let _guard = self.lock.lock();

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(AsrError::io(&self.path, err)),
        };

        let mut found = false;
        let mut rewritten = String::with_capacity(contents.len());
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            let record: UtteranceRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(_) => {
                    rewritten.push_str(line);
                    rewritten.push('\n');
                    continue;
                }
            };

            if !found && record.timestamp() == timestamp {
                found = true;
                let updated = record.with_evaluation(similarity, wer, matched_ground_truth.clone());
                rewritten.push_str(&serde_json::to_string(&updated).map_err(|e| {
                    AsrError::resource("record serialization", anyhow::anyhow!("{e}"))
                })?);
            } else {
                rewritten.push_str(line);
            }
            rewritten.push('\n');
        }

        if !found {
            return Ok(());
        }

        std::fs::write(&self.path, rewritten).map_err(|e| AsrError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(matched: bool) -> ScoreReport {
        ScoreReport {
            matched_index: if matched { 0 } else { -1 },
            matched_text: if matched { Some("cessna 481 ready".to_string()) } else { None },
            similarity: if matched { 0.91234 } else { 0.0 },
            wer: if matched { 0.91234 } else { 0.0 },
            cer: if matched { 0.91234 } else { 0.0 },
            edit_distance: 1,
            per_message_similarities: vec![0.9123],
            word_edit_distance: 1,
        }
    }

    #[test]
    fn unmatched_score_produces_basic_record() {
        let record = UtteranceRecord::new(
            0.0,
            1.0,
            "hello world".to_string(),
            0.9,
            "2026-07-28T00:00:00".to_string(),
            "s1".to_string(),
            "v1".to_string(),
            "sess1".to_string(),
            "/tmp/clip.wav".to_string(),
            Some(&sample_report(false)),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "Basic");
        assert!(json.get("similarity_score").is_none());
    }

    #[test]
    fn matched_score_produces_scored_record_with_rounded_similarity() {
        let record = UtteranceRecord::new(
            0.0,
            1.0,
            "cessna 481 ready".to_string(),
            0.9,
            "2026-07-28T00:00:00".to_string(),
            "s1".to_string(),
            "v1".to_string(),
            "sess1".to_string(),
            "/tmp/clip.wav".to_string(),
            Some(&sample_report(true)),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "Scored");
        assert_eq!(json["similarity_score"], 0.9123);
    }

    #[test]
    fn start_end_and_confidence_are_rounded() {
        let record = UtteranceRecord::new(
            1.23456,
            2.34567,
            "hello world".to_string(),
            0.876543,
            "2026-07-28T00:00:00".to_string(),
            "s1".to_string(),
            "v1".to_string(),
            "sess1".to_string(),
            "/tmp/clip.wav".to_string(),
            None,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["start"], 1.23);
        assert_eq!(json["end"], 2.35);
        assert_eq!(json["confidence"], 0.877);
    }

    #[test]
    fn append_writes_one_complete_json_line() {
        let dir = std::env::temp_dir().join(format!("aerolex-record-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let log_path = dir.join("asr_results.jsonl");
        let log = RecordLog::new(&log_path);

        let record = UtteranceRecord::new(
            0.0,
            1.0,
            "hello world this is a test".to_string(),
            0.9,
            "2026-07-28T00:00:00".to_string(),
            "s1".to_string(),
            "v1".to_string(),
            "sess1".to_string(),
            "/tmp/clip.wav".to_string(),
            None,
        );
        log.append(&record).unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["session_id"], "sess1");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn update_evaluation_merges_a_basic_record_into_scored() {
        let dir = std::env::temp_dir().join(format!("aerolex-record-test3-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let log_path = dir.join("asr_results.jsonl");
        let log = RecordLog::new(&log_path);

        let record = UtteranceRecord::new(
            0.0,
            1.0,
            "cessna four eighty one ready".to_string(),
            0.9,
            "2026-07-28T00:00:00".to_string(),
            "s1".to_string(),
            "v1".to_string(),
            "sess1".to_string(),
            "/tmp/clip.wav".to_string(),
            None,
        );
        log.append(&record).unwrap();

        log.update_evaluation(
            "2026-07-28T00:00:00",
            0.88,
            0.12,
            "cessna 481 ready".to_string(),
        )
        .unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["kind"], "Scored");
        assert_eq!(parsed["similarity_score"], 0.88);
        assert_eq!(parsed["matched_ground_truth"], "cessna 481 ready");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn update_evaluation_is_a_no_op_when_timestamp_not_found() {
        let dir = std::env::temp_dir().join(format!("aerolex-record-test4-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let log_path = dir.join("asr_results.jsonl");
        let log = RecordLog::new(&log_path);

        assert!(log.update_evaluation("missing", 0.9, 0.1, "x".to_string()).is_ok());
        assert!(!log_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
