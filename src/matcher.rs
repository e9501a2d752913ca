//! Best-match matcher: normalizes a transcript and scores it against an
//! ordered [`ReferenceSet`] by Levenshtein similarity, against a single
//! `MATCH_THRESHOLD` configuration key.

use crate::levenshtein::{normalized_similarity, word_level_distance};
use crate::normalize::normalize;
use crate::reference_set::ReferenceSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub matched_index: i64,
    pub matched_text: Option<String>,
    pub similarity: f64,
    /// Both approximated by the same length-normalized Levenshtein
    /// ratio as `similarity` (an intentionally preserved quirk,
    /// documented in DESIGN.md).
    pub wer: f64,
    pub cer: f64,
    pub edit_distance: usize,
    pub per_message_similarities: Vec<f64>,
    /// Diagnostic-only word-level edit distance against the matched
    /// reference (0 if no match was selected).
    pub word_edit_distance: usize,
}

impl ScoreReport {
    fn no_match() -> Self {
        Self {
            matched_index: -1,
            matched_text: None,
            similarity: 0.0,
            wer: 0.0,
            cer: 0.0,
            edit_distance: 0,
            per_message_similarities: Vec::new(),
            word_edit_distance: 0,
        }
    }
}

/// Finds the best-matching reference for `transcript`. Ties are broken
/// toward the lowest index. `per_message_similarities` is rounded to
/// four decimals.
pub fn find_best_match(
    transcript: &str,
    references: &ReferenceSet,
    match_threshold: f64,
) -> ScoreReport {
    let normalized_transcript = normalize(transcript);
    if normalized_transcript.is_empty() {
        return ScoreReport::no_match();
    }

    let mut per_message = Vec::with_capacity(references.len());
    let mut best_index: Option<usize> = None;
    let mut best_similarity = f64::MIN;

    for (idx, reference) in references.messages().iter().enumerate() {
        let normalized_reference = normalize(reference);
        let similarity = normalized_similarity(&normalized_transcript, &normalized_reference);
        let rounded = round4(similarity);
        per_message.push(rounded);

        if similarity > best_similarity {
            best_similarity = similarity;
            best_index = Some(idx);
        }
    }

    let Some(best_index) = best_index else {
        return ScoreReport {
            per_message_similarities: per_message,
            ..ScoreReport::no_match()
        };
    };

    if best_similarity < match_threshold {
        return ScoreReport {
            per_message_similarities: per_message,
            ..ScoreReport::no_match()
        };
    }

    let matched_text = references.messages()[best_index].clone();
    let normalized_matched = normalize(&matched_text);
    let edit_distance = crate::levenshtein::distance(&normalized_transcript, &normalized_matched);
    let word_edit_distance = word_level_distance(&normalized_transcript, &normalized_matched);

    ScoreReport {
        matched_index: best_index as i64,
        matched_text: Some(matched_text),
        similarity: best_similarity,
        wer: best_similarity,
        cer: best_similarity,
        edit_distance,
        per_message_similarities: per_message,
        word_edit_distance,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_reports_no_match() {
        let refs = ReferenceSet::from_messages(vec!["cessna 481 ready".to_string()]);
        let report = find_best_match("hello world", &refs, 0.3);
        assert_eq!(report.matched_index, -1);
        assert!(report.matched_text.is_none());
    }

    #[test]
    fn digit_style_fixture_matches_shorter_edit_distance() {
        let refs = ReferenceSet::from_messages(vec![
            "cessna 481 ready for takeoff".to_string(),
            "cessna 482 ready".to_string(),
        ]);
        let report = find_best_match("Cessna four eighty one ready", &refs, 0.3);
        assert_eq!(report.matched_index, 1);
        assert!(report.similarity >= 0.70);
    }

    #[test]
    fn exact_mathematical_match_scores_one() {
        let refs = ReferenceSet::from_messages(vec!["climb to 1100".to_string()]);
        let report = find_best_match("climb to one thousand one hundred", &refs, 0.3);
        assert_eq!(report.matched_index, 0);
        assert_eq!(report.similarity, 1.0);
    }

    #[test]
    fn empty_transcript_is_no_match() {
        let refs = ReferenceSet::from_messages(vec!["cessna 481 ready".to_string()]);
        let report = find_best_match("", &refs, 0.3);
        assert_eq!(report.matched_index, -1);
    }

    #[test]
    fn ties_break_toward_lowest_index() {
        let refs = ReferenceSet::from_messages(vec!["abc".to_string(), "abc".to_string()]);
        let report = find_best_match("abc", &refs, 0.3);
        assert_eq!(report.matched_index, 0);
    }
}
