//! ReferenceSet: an immutable ordered list of reference strings for a
//! video_id, supplied by the external collaborator either as a list or
//! as a single text file split on `---`-only lines.

use std::path::Path;

use crate::error::{AsrError, AsrResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    messages: Vec<String>,
}

impl ReferenceSet {
    pub fn from_messages(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Loads a reference set from `path`: a `.json` file is parsed as a
    /// list of strings, anything else is treated as the `---`-separated
    /// text format. This is the standalone-binary counterpart of the
    /// external collaborator's reference-messages interface (normally
    /// served over HTTP; here read directly off disk).
    pub fn load(path: &Path) -> AsrResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AsrError::io(path, e))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            let messages: Vec<String> = serde_json::from_str(&text).map_err(|e| {
                AsrError::config(format!("invalid reference list in {}: {e}", path.display()))
            })?;
            Ok(Self::from_messages(
                messages.into_iter().filter(|m| !m.trim().is_empty()).collect(),
            ))
        } else {
            Ok(Self::from_text(&text))
        }
    }

    /// Splits `text` on lines consisting only of `---`, discarding empty
    /// messages after trimming.
    pub fn from_text(text: &str) -> Self {
        let messages = text
            .split("\n---\n")
            .flat_map(|block| block.split("\r\n---\r\n"))
            .map(|block| block.trim().to_string())
            .filter(|block| !block.is_empty())
            .collect();
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_dashed_separator_lines() {
        let text = "cessna 481 ready\n---\nclimb to 1100\n---\n\n---\nrequest vfr";
        let refs = ReferenceSet::from_text(text);
        assert_eq!(
            refs.messages(),
            &["cessna 481 ready", "climb to 1100", "request vfr"]
        );
    }

    #[test]
    fn empty_messages_are_discarded() {
        let text = "one\n---\n   \n---\ntwo";
        let refs = ReferenceSet::from_text(text);
        assert_eq!(refs.messages(), &["one", "two"]);
    }

    #[test]
    fn loads_json_list_from_a_json_extension_file() {
        let dir = std::env::temp_dir().join(format!("aerolex-refset-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("refs.json");
        std::fs::write(&path, r#"["cessna 481 ready", "climb to 1100"]"#).unwrap();

        let refs = ReferenceSet::load(&path).unwrap();
        assert_eq!(refs.messages(), &["cessna 481 ready", "climb to 1100"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn loads_dashed_text_from_a_non_json_file() {
        let dir = std::env::temp_dir().join(format!("aerolex-refset-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("refs.txt");
        std::fs::write(&path, "cessna 481 ready\n---\nclimb to 1100").unwrap();

        let refs = ReferenceSet::load(&path).unwrap();
        assert_eq!(refs.messages(), &["cessna 481 ready", "climb to 1100"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
