//! Aviation number-word folding: a closed lexicon of number words folded
//! into digit runs, either "digit-style" (read back digit by digit, as
//! pilots read callsigns and headings) or "mathematical" (read back as a
//! single quantity, as pilots read altitudes and distances).

/// A small homophone-correction table applied before lexicon matching.
/// Limited to genuine aviation-radio number pronunciations (ICAO
/// phonetics use "niner"/"fife"/"tree" for "nine"/"five"/"three" to cut
/// down on confusion over the air); ordinary English words are never
/// folded in here; doing so would sweep words like "to" or "for" into
/// adjacent number runs.
fn phonetic_correction(word: &str) -> &str {
    match word {
        "niner" => "nine",
        "fife" => "five",
        "tree" => "three",
        _ => word,
    }
}

fn number_word_value(word: &str) -> Option<u64> {
    let value = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

fn is_scale_word(word: &str) -> bool {
    matches!(word, "hundred" | "thousand" | "million")
}

fn is_number_word(word: &str) -> bool {
    number_word_value(word).is_some() || is_scale_word(word)
}

/// Splits trailing non-alphabetic characters (punctuation) off a token,
/// returning (core, suffix).
fn split_trailing_punct(token: &str) -> (&str, &str) {
    let split_at = token
        .char_indices()
        .rev()
        .take_while(|(_, c)| !c.is_alphanumeric())
        .last()
        .map(|(i, _)| i);
    match split_at {
        Some(i) => (&token[..i], &token[i..]),
        None => (token, ""),
    }
}

/// Converts a digit-style run (every word sub-hundred) into a
/// concatenated digit string: a tens-word immediately followed by a
/// sub-ten word compounds into one two-digit group, everything else
/// emits its own numeric value as its own digit string.
fn fold_digit_style(words: &[&str]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < words.len() {
        let value = number_word_value(words[i]).unwrap_or(0);
        if (20..=90).contains(&value) && value % 10 == 0 && i + 1 < words.len() {
            if let Some(unit) = number_word_value(words[i + 1]) {
                if (1..=9).contains(&unit) {
                    out.push_str(&(value + unit).to_string());
                    i += 2;
                    continue;
                }
            }
        }
        out.push_str(&value.to_string());
        i += 1;
    }
    out
}

/// Converts a mathematical run into its positional numeric value.
fn fold_mathematical(words: &[&str]) -> u64 {
    let mut total: u64 = 0;
    let mut sub_result: u64 = 0;

    for &word in words {
        if let Some(value) = number_word_value(word) {
            sub_result += value;
            continue;
        }
        match word {
            "hundred" => {
                let multiplier = if sub_result == 0 { 1 } else { sub_result };
                sub_result = multiplier * 100;
            }
            "thousand" => {
                let multiplier = if sub_result == 0 { 1 } else { sub_result };
                total += multiplier * 1000;
                sub_result = 0;
            }
            "million" => {
                let multiplier = if sub_result == 0 { 1 } else { sub_result };
                total += multiplier * 1_000_000;
                sub_result = 0;
            }
            _ => {}
        }
    }

    total + sub_result
}

/// Detects maximal runs of number-words in `text` (already lowercased)
/// and folds each run to a digit string, per the digit-style /
/// mathematical classification. Non-number tokens pass through
/// unchanged. Trailing punctuation on the run's last token is preserved
/// as a suffix on the emitted digits.
pub fn fold_numbers(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut corrected: Vec<String> = Vec::with_capacity(tokens.len());
    let mut cores: Vec<String> = Vec::with_capacity(tokens.len());
    let mut suffixes: Vec<String> = Vec::with_capacity(tokens.len());

    for token in &tokens {
        let (core, suffix) = split_trailing_punct(token);
        let corrected_core = phonetic_correction(core).to_string();
        corrected.push(corrected_core.clone());
        cores.push(corrected_core);
        suffixes.push(suffix.to_string());
    }

    let mut out_tokens: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_number_word(&cores[i]) {
            let mut j = i;
            while j < tokens.len() && is_number_word(&cores[j]) {
                j += 1;
            }
            let run: Vec<&str> = cores[i..j].iter().map(|s| s.as_str()).collect();
            let digit_style = run.iter().all(|w| !is_scale_word(w));

            let folded = if digit_style {
                fold_digit_style(&run)
            } else {
                fold_mathematical(&run).to_string()
            };

            let suffix = &suffixes[j - 1];
            out_tokens.push(format!("{folded}{suffix}"));
            i = j;
        } else {
            out_tokens.push(format!("{}{}", cores[i], suffixes[i]));
            i += 1;
        }
    }

    out_tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_style_compounds_tens_and_units() {
        assert_eq!(fold_numbers("four eighty one"), "481");
    }

    #[test]
    fn digit_style_keeps_each_digit_separate() {
        assert_eq!(fold_numbers("zero three zero"), "030");
    }

    #[test]
    fn mathematical_folding_accumulates_by_scale() {
        assert_eq!(fold_numbers("one thousand one hundred"), "1100");
    }

    #[test]
    fn non_number_words_pass_through() {
        assert_eq!(fold_numbers("cessna four eighty one ready"), "cessna 481 ready");
    }

    #[test]
    fn phonetic_corrections_apply_before_folding() {
        assert_eq!(fold_numbers("niner fife tree"), "953");
    }

    #[test]
    fn ordinary_words_that_sound_like_numbers_are_not_folded() {
        assert_eq!(fold_numbers("climb to one thousand one hundred"), "climb to 1100");
        assert_eq!(fold_numbers("cessna four eighty one ready for takeoff"), "cessna 481 ready for takeoff");
    }
}
