//! Offline evaluation utility: batch WER/CER scoring of a session's
//! `asr_results.jsonl` against a ground-truth reference file.
//!
//! Not part of the live streaming path — the Session Controller's own
//! Normalizer & Scorer already attaches a best-match score to every
//! accepted utterance as it is recorded; this module is a separate,
//! after-the-fact report for operators comparing a full session's
//! output against a curated ground-truth script. It reuses the same
//! normalizer, matcher, and Levenshtein implementation so the two paths
//! cannot drift apart.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AsrError, AsrResult};
use crate::matcher::find_best_match;
use crate::reference_set::ReferenceSet;

/// Per-utterance evaluation against the best-matching ground-truth line.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationEntry {
    pub asr_index: usize,
    pub timestamp: String,
    pub confidence: f32,
    pub transcript: String,
    pub matched: bool,
    pub similarity_score: f64,
    pub ground_truth_index: i64,
    pub reference: String,
    pub wer: f64,
    pub cer: f64,
    pub word_accuracy: f64,
    pub char_accuracy: f64,
    pub edit_distance: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallStats {
    pub total_asr_results: usize,
    pub total_ground_truth: usize,
    pub matched_transcriptions: usize,
    pub unmatched_transcriptions: usize,
    pub unmatched_ground_truth: usize,
    pub match_rate: f64,
    pub coverage_rate: f64,
    pub average_wer: f64,
    pub average_cer: f64,
    pub average_word_accuracy: f64,
    pub average_char_accuracy: f64,
    pub average_similarity: f64,
    pub match_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub overall_stats: OverallStats,
    pub evaluations: Vec<EvaluationEntry>,
    pub unmatched_ground_truth: Vec<UnmatchedReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchedReference {
    pub index: usize,
    pub text: String,
}

/// A minimal view of one `asr_results.jsonl` line: only the fields the
/// evaluator needs, tolerant of the `Basic`/`Scored` tagged variant (and
/// of older untagged logs) since both carry `transcript`/`confidence`/
/// `timestamp`.
#[derive(Debug, Clone, Deserialize)]
struct AsrResultLine {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    timestamp: String,
}

/// Removes administrative header sections from a raw ground-truth text
/// file: lines that are all dashes toggle a "header" region, lines
/// inside it are dropped, as are blank lines and lines that look like
/// bare video/audio filenames.
fn filter_ground_truth_lines(lines: &[String]) -> Vec<String> {
    const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mov", "wav", "mp3", "avi", "mkv", "flv", "m4v"];

    let mut filtered = Vec::new();
    let mut in_header_section = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.is_empty() && line.chars().all(|c| c == '-') {
            in_header_section = !in_header_section;
            continue;
        }
        if in_header_section {
            continue;
        }
        let looks_like_filename = MEDIA_EXTENSIONS
            .iter()
            .any(|ext| line.to_lowercase().ends_with(&format!(".{ext}")));
        if looks_like_filename {
            continue;
        }
        filtered.push(line.to_string());
    }

    filtered
}

/// Loads ground-truth reference lines from `path`: a `.json` file is a
/// list of strings, anything else is filtered plain text.
pub fn load_ground_truth(path: &Path) -> AsrResult<ReferenceSet> {
    let text = std::fs::read_to_string(path).map_err(|e| AsrError::io(path, e))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let messages: Vec<String> = serde_json::from_str(&text)
            .map_err(|e| AsrError::config(format!("invalid ground truth JSON in {}: {e}", path.display())))?;
        Ok(ReferenceSet::from_messages(messages))
    } else {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Ok(ReferenceSet::from_messages(filter_ground_truth_lines(&lines)))
    }
}

/// Loads an `asr_results.jsonl` file, skipping blank lines.
fn load_asr_results(path: &Path) -> AsrResult<Vec<AsrResultLine>> {
    let text = std::fs::read_to_string(path).map_err(|e| AsrError::io(path, e))?;

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| AsrError::config(format!("invalid result line in {}: {e}", path.display())))
        })
        .collect()
}

/// Runs the full batch evaluation: loads both files, finds the best
/// ground-truth match for every non-empty transcript, and aggregates
/// overall statistics.
pub fn evaluate_asr_results(
    ground_truth_file: &Path,
    asr_results_file: &Path,
    match_threshold: f64,
) -> AsrResult<EvaluationReport> {
    let ground_truth = load_ground_truth(ground_truth_file)?;
    let asr_results = load_asr_results(asr_results_file)?;

    let mut evaluations = Vec::with_capacity(asr_results.len());
    let mut matched_gt_indices = std::collections::HashSet::new();

    for (i, result) in asr_results.iter().enumerate() {
        if result.transcript.trim().is_empty() {
            continue;
        }

        let score = find_best_match(&result.transcript, &ground_truth, match_threshold);
        let matched = score.matched_index >= 0;

        if matched {
            matched_gt_indices.insert(score.matched_index as usize);
        }

        evaluations.push(EvaluationEntry {
            asr_index: i,
            timestamp: result.timestamp.clone(),
            confidence: result.confidence,
            transcript: result.transcript.clone(),
            matched,
            similarity_score: score.similarity,
            ground_truth_index: score.matched_index,
            reference: score.matched_text.clone().unwrap_or_default(),
            wer: if matched { score.wer } else { 1.0 },
            cer: if matched { score.cer } else { 1.0 },
            word_accuracy: if matched { 1.0 - score.wer } else { 0.0 },
            char_accuracy: if matched { 1.0 - score.cer } else { 0.0 },
            edit_distance: if matched { score.edit_distance } else { result.transcript.chars().count() },
        });
    }

    let matched_evaluations: Vec<&EvaluationEntry> = evaluations.iter().filter(|e| e.matched).collect();
    let matched_count = matched_evaluations.len();

    let average = |f: fn(&EvaluationEntry) -> f64| -> f64 {
        if matched_count == 0 {
            0.0
        } else {
            matched_evaluations.iter().map(|e| f(e)).sum::<f64>() / matched_count as f64
        }
    };

    let overall_stats = OverallStats {
        total_asr_results: asr_results.len(),
        total_ground_truth: ground_truth.len(),
        matched_transcriptions: matched_count,
        unmatched_transcriptions: evaluations.len() - matched_count,
        unmatched_ground_truth: ground_truth.len() - matched_gt_indices.len(),
        match_rate: if evaluations.is_empty() { 0.0 } else { matched_count as f64 / evaluations.len() as f64 },
        coverage_rate: if ground_truth.is_empty() { 0.0 } else { matched_gt_indices.len() as f64 / ground_truth.len() as f64 },
        average_wer: round4(average(|e| e.wer)),
        average_cer: round4(average(|e| e.cer)),
        average_word_accuracy: round4(average(|e| e.word_accuracy)),
        average_char_accuracy: round4(average(|e| e.char_accuracy)),
        average_similarity: round4(average(|e| e.similarity_score)),
        match_threshold,
    };

    let unmatched_ground_truth = ground_truth
        .messages()
        .iter()
        .enumerate()
        .filter(|(i, _)| !matched_gt_indices.contains(i))
        .map(|(index, text)| UnmatchedReference { index, text: text.clone() })
        .collect();

    Ok(EvaluationReport {
        overall_stats,
        evaluations,
        unmatched_ground_truth,
    })
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_dash_header_and_blank_and_filename_lines() {
        let lines: Vec<String> = vec![
            "----------",
            "briefing.mp4",
            "----------",
            "",
            "cessna 481 ready",
            "climb to 1100",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let filtered = filter_ground_truth_lines(&lines);
        assert_eq!(filtered, vec!["cessna 481 ready", "climb to 1100"]);
    }

    #[test]
    fn evaluate_asr_results_aggregates_matched_and_unmatched() {
        let dir = std::env::temp_dir().join(format!("aerolex-eval-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let gt_path = dir.join("ground_truth.txt");
        std::fs::write(&gt_path, "cessna 481 ready for takeoff\nclimb to 1100\n").unwrap();

        let results_path = dir.join("asr_results.jsonl");
        std::fs::write(
            &results_path,
            concat!(
                r#"{"transcript": "Cessna four eighty one ready", "confidence": 0.9, "timestamp": "t1"}"#,
                "\n",
                r#"{"transcript": "hello world", "confidence": 0.9, "timestamp": "t2"}"#,
                "\n",
            ),
        )
        .unwrap();

        let report = evaluate_asr_results(&gt_path, &results_path, 0.3).unwrap();
        assert_eq!(report.overall_stats.total_asr_results, 2);
        assert_eq!(report.overall_stats.matched_transcriptions, 1);
        assert_eq!(report.overall_stats.unmatched_transcriptions, 1);
        assert_eq!(report.overall_stats.unmatched_ground_truth, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_transcripts_are_skipped() {
        let dir = std::env::temp_dir().join(format!("aerolex-eval-test2-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let gt_path = dir.join("ground_truth.txt");
        std::fs::write(&gt_path, "cessna 481 ready\n").unwrap();

        let results_path = dir.join("asr_results.jsonl");
        std::fs::write(&results_path, r#"{"transcript": "", "confidence": 0.1, "timestamp": "t1"}"#).unwrap();

        let report = evaluate_asr_results(&gt_path, &results_path, 0.3).unwrap();
        assert_eq!(report.evaluations.len(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
