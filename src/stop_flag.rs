//! Stop-flag watcher: the presence of a zero-byte sentinel file inside
//! the session's logs_dir is the external stop signal. Named as its own
//! unit so the two checkpoints inside the publish task (before and
//! after transcription) are two calls to one well-tested function.

use std::path::{Path, PathBuf};

pub const STOP_FLAG_NAME: &str = ".asr_stop_recording";

#[derive(Debug, Clone)]
pub struct StopFlag {
    path: PathBuf,
}

impl StopFlag {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(STOP_FLAG_NAME),
        }
    }

    pub fn is_set(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_set_when_file_absent() {
        let dir = std::env::temp_dir().join(format!("aerolex-stopflag-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let flag = StopFlag::new(&dir);
        assert!(!flag.is_set());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn set_once_file_created() {
        let dir = std::env::temp_dir().join(format!("aerolex-stopflag-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let flag = StopFlag::new(&dir);
        assert!(!flag.is_set());
        std::fs::write(flag.path(), b"").unwrap();
        assert!(flag.is_set());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
