//! Quality Gate: rejects a RawTranscript whose confidence, length, or
//! word count fall below configured thresholds.

use crate::config::AsrQuality;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    LowConfidence,
    TooShort,
    TooFewWords,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::LowConfidence => write!(f, "confidence below MIN_CONFIDENCE"),
            RejectReason::TooShort => write!(f, "length below MIN_TRANSCRIPT_LENGTH"),
            RejectReason::TooFewWords => write!(f, "word count below MIN_WORD_COUNT"),
        }
    }
}

/// Checks `transcript`/`confidence` against `quality`. Returns `Ok(())`
/// when the utterance passes, `Err(reason)` otherwise. Callers log the
/// rejection at info level with the failing metric and do not write a
/// record.
pub fn check(transcript: &str, confidence: f32, quality: &AsrQuality) -> Result<(), RejectReason> {
    if confidence < quality.min_confidence {
        return Err(RejectReason::LowConfidence);
    }
    if transcript.chars().count() < quality.min_transcript_length {
        return Err(RejectReason::TooShort);
    }
    if transcript.split_whitespace().count() < quality.min_word_count {
        return Err(RejectReason::TooFewWords);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_low_word_count_transcript() {
        let quality = AsrQuality::default();
        let result = check("ok", 0.9, &quality);
        assert_eq!(result, Err(RejectReason::TooShort));
    }

    #[test]
    fn rejects_low_confidence_even_with_good_text() {
        let quality = AsrQuality::default();
        let result = check("climb to one one zero zero feet now", 0.1, &quality);
        assert_eq!(result, Err(RejectReason::LowConfidence));
    }

    #[test]
    fn passes_when_all_thresholds_met() {
        let quality = AsrQuality::default();
        let result = check("climb to one one zero zero feet now", 0.9, &quality);
        assert!(result.is_ok());
    }
}
