/// Path constants and utilities for the approval server's data directory
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

// Static storage for configurable data root
static DATA_ROOT: OnceCell<String> = OnceCell::new();

const DEFAULT_DATA_ROOT: &str = "/data/schema-approval";

// Directory and file names (relative to the data root)
pub const INBOX_DIR_NAME: &str = "inbox";
pub const PROCESSED_DIR_NAME: &str = "processed";
pub const FAILED_DIR_NAME: &str = "failed";
pub const STATUS_FILE_NAME: &str = "status.json";
pub const RESULT_FILE_NAME: &str = "result.json";

// Inbox file name prefixes
pub const SUBMISSION_PREFIX: &str = "submission_";
pub const DECISION_PREFIX: &str = "decision_";
pub const CANCEL_PREFIX: &str = "cancel_";
pub const CANCEL_FILE_NAME: &str = "cancel";

/// Initialize the data root directory. Can only be called once.
/// If not called, the default `/data/schema-approval` will be used.
pub fn init_data_root(path: String) -> Result<(), String> {
    DATA_ROOT
        .set(path)
        .map_err(|_| "Data root already initialized".to_string())
}

fn get_data_root() -> &'static str {
    DATA_ROOT
        .get()
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_DATA_ROOT)
}

pub fn data_root() -> PathBuf {
    PathBuf::from(get_data_root())
}

pub fn inbox_dir() -> PathBuf {
    inbox_dir_in(&data_root())
}

pub fn processed_dir() -> PathBuf {
    inbox_dir().join(PROCESSED_DIR_NAME)
}

pub fn failed_dir() -> PathBuf {
    inbox_dir().join(FAILED_DIR_NAME)
}

pub fn status_path() -> PathBuf {
    data_root().join(STATUS_FILE_NAME)
}

pub fn result_path() -> PathBuf {
    data_root().join(RESULT_FILE_NAME)
}

/// Inbox directory under an explicit root
pub fn inbox_dir_in(root: &Path) -> PathBuf {
    root.join(INBOX_DIR_NAME)
}

/// Get all directories that should be created for the server
pub fn all_directories() -> Vec<PathBuf> {
    vec![data_root(), inbox_dir(), processed_dir(), failed_dir()]
}

/// Kind of file dropped into the inbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxFile {
    Submission,
    Decision,
    Cancel,
}

impl InboxFile {
    /// Classify an inbox file by name; unrelated files yield `None`
    pub fn classify(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let json = name.ends_with(".json");
        if name.starts_with(SUBMISSION_PREFIX) && json {
            Some(Self::Submission)
        } else if name.starts_with(DECISION_PREFIX) && json {
            Some(Self::Decision)
        } else if name == CANCEL_FILE_NAME || (name.starts_with(CANCEL_PREFIX) && json) {
            Some(Self::Cancel)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_layout() {
        assert_eq!(inbox_dir().to_str().unwrap(), "/data/schema-approval/inbox");
        assert_eq!(processed_dir().to_str().unwrap(), "/data/schema-approval/inbox/processed");
        assert_eq!(failed_dir().to_str().unwrap(), "/data/schema-approval/inbox/failed");
        assert_eq!(status_path().to_str().unwrap(), "/data/schema-approval/status.json");
        assert_eq!(result_path().to_str().unwrap(), "/data/schema-approval/result.json");
    }

    #[test]
    fn test_directory_hierarchy() {
        assert!(processed_dir().starts_with(inbox_dir()));
        assert!(failed_dir().starts_with(inbox_dir()));

        let all_dirs = all_directories();
        let unique: HashSet<_> = all_dirs.iter().collect();
        assert_eq!(all_dirs.len(), unique.len());
        for dir in &all_dirs {
            assert!(dir.starts_with(get_data_root()));
        }
    }

    #[test]
    fn test_classify_inbox_files() {
        let inbox = inbox_dir_in(Path::new("/tmp/x"));
        assert_eq!(
            InboxFile::classify(&inbox.join("submission_v2.json")),
            Some(InboxFile::Submission)
        );
        assert_eq!(
            InboxFile::classify(&inbox.join("decision_001.json")),
            Some(InboxFile::Decision)
        );
        assert_eq!(InboxFile::classify(&inbox.join("cancel")), Some(InboxFile::Cancel));
        assert_eq!(
            InboxFile::classify(&inbox.join("cancel_operator.json")),
            Some(InboxFile::Cancel)
        );
        assert_eq!(InboxFile::classify(&inbox.join("cancellation_notes.json")), None);
        assert_eq!(InboxFile::classify(&inbox.join("cancel.bak")), None);
        assert_eq!(InboxFile::classify(&inbox.join("decision_001.tmp")), None);
        assert_eq!(InboxFile::classify(&inbox.join("notes.txt")), None);
    }
}
