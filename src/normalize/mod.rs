//! Text normalization: the single canonical pipeline shared by every
//! caller that needs to compare a transcript against reference text.
//! Used identically for references and hypotheses so the two can never
//! drift apart.

pub mod numbers;

/// Applies, in order: lowercase, aviation number-word folding, dash
/// stripping, punctuation stripping, whitespace collapsing. Idempotent:
/// `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let folded = numbers::fold_numbers(&lower);
    let dashes_collapsed = collapse_dashes(&folded);
    let no_punct = strip_punctuation(&dashes_collapsed);
    collapse_whitespace(&no_punct)
}

/// Strips ASCII hyphens and Unicode dashes so letter-spelled tokens
/// collapse, e.g. "v-f-r" -> "vfr".
fn collapse_dashes(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '-' | '\u{2010}'..='\u{2015}' | '\u{2212}'))
        .collect()
}

/// Removes all punctuation, keeping only alphanumerics and whitespace.
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_spelling_collapses() {
        assert_eq!(normalize("Request V-F-R departure."), "request vfr departure");
    }

    #[test]
    fn digit_style_fixture() {
        assert_eq!(normalize("Cessna four eighty one ready"), "cessna 481 ready");
    }

    #[test]
    fn mathematical_fixture() {
        assert_eq!(normalize("climb to one thousand one hundred"), "climb to 1100");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "Request V-F-R departure.",
            "Cessna four eighty one ready",
            "climb to one thousand one hundred, over!",
            "",
            "   multiple   spaces   ",
        ];
        for s in samples {
            let once = normalize(s);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(normalize("  hello    world  "), "hello world");
    }
}
