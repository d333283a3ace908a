//! File inbox feeding signals into a live workflow

use anyhow::{anyhow, Context, Result};
use approval_core::paths::{self, InboxFile};
use approval_core::WorkflowHandle;
use approval_types::{ReviewDecision, Submission};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Directory layout of the inbox
#[derive(Debug, Clone)]
pub struct Inbox {
    pub dir: PathBuf,
    pub processed: PathBuf,
    pub failed: PathBuf,
}

impl Inbox {
    pub fn from_paths() -> Self {
        Self {
            dir: paths::inbox_dir(),
            processed: paths::processed_dir(),
            failed: paths::failed_dir(),
        }
    }

    pub fn under(root: &Path) -> Self {
        let dir = paths::inbox_dir_in(root);
        Self {
            processed: dir.join(paths::PROCESSED_DIR_NAME),
            failed: dir.join(paths::FAILED_DIR_NAME),
            dir,
        }
    }

    pub fn create_dirs(&self) -> Result<()> {
        for dir in [&self.dir, &self.processed, &self.failed] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Watch the inbox and forward every file to `handle` until the watcher stops
    pub async fn monitor(&self, handle: WorkflowHandle) -> Result<()> {
        self.create_dirs()?;
        log::info!("Monitoring inbox in {}/", self.dir.display());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => log::error!("Watcher error: {}", e),
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        self.process_existing(&handle)?;

        while let Some(event) = rx.recv().await {
            log::debug!("File system event: {:?}", event);
            if let EventKind::Create(_) | EventKind::Modify(_) = event.kind {
                for path in event.paths {
                    if path.is_file() {
                        self.process_logged(&handle, &path);
                    }
                }
            }
        }
        Ok(())
    }

    /// Deliver files already waiting in the inbox, oldest name first
    pub fn process_existing(&self, handle: &WorkflowHandle) -> Result<()> {
        let mut existing: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read inbox {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        existing.sort();
        for path in existing {
            self.process_logged(handle, &path);
        }
        Ok(())
    }

    fn process_logged(&self, handle: &WorkflowHandle, path: &Path) {
        if let Err(e) = self.process_file(handle, path) {
            log::error!("Failed to process inbox file {:?}: {:#}", path, e);
        }
    }

    /// Deliver one inbox file and move it to `processed/` or `failed/`
    pub fn process_file(&self, handle: &WorkflowHandle, path: &Path) -> Result<()> {
        let Some(kind) = InboxFile::classify(path) else {
            log::debug!("Skipping unrelated inbox file {:?}", path);
            return Ok(());
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Invalid file name: {:?}", path))?;

        log::info!("Processing inbox file: {:?}", file_name);
        let delivered = deliver(handle, kind, path);

        let destination = match &delivered {
            Ok(()) => &self.processed,
            Err(e) => {
                log::error!("Rejected inbox file {:?}: {}", file_name, e);
                &self.failed
            }
        };
        let target = destination.join(file_name);
        std::fs::rename(path, &target)
            .with_context(|| format!("Failed to move {:?} to {}", file_name, target.display()))?;
        Ok(())
    }
}

fn deliver(handle: &WorkflowHandle, kind: InboxFile, path: &Path) -> Result<()> {
    match kind {
        InboxFile::Submission => {
            let content = std::fs::read_to_string(path)?;
            let submission: Submission = serde_json::from_str(&content)
                .context("Failed to parse submission JSON")?;
            handle.submit(submission)?;
        }
        InboxFile::Decision => {
            let content = std::fs::read_to_string(path)?;
            let decision: ReviewDecision = serde_json::from_str(&content)
                .context("Failed to parse decision JSON")?;
            handle.record_decision(decision)?;
        }
        InboxFile::Cancel => handle.cancel(),
    }
    Ok(())
}

/// Write `value` as pretty JSON, replacing `path` atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_core::workflow::{spawn_live, SchemaApprovalInput, WorkflowOptions};
    use approval_core::LoggingActivities;
    use approval_types::{HistoryEvent, ReviewStage, WorkflowPhase};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn start() -> (WorkflowHandle, tokio::task::JoinHandle<approval_core::Result<approval_types::ApprovalRecord>>) {
        let input = SchemaApprovalInput {
            initial_submission: Submission::new("orders", 1, "{}", "alice"),
            stage_one_reviewers: vec!["rita".to_string(), "sam".to_string()],
            stage_two_reviewer: "carol".to_string(),
            stage_three_reviewer: "dave".to_string(),
        };
        spawn_live(
            Arc::new(LoggingActivities::default()),
            input,
            WorkflowOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_decision_file_is_delivered_and_archived() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = Inbox::under(temp_dir.path());
        inbox.create_dirs().unwrap();
        let (handle, _task) = start();

        let decision = ReviewDecision::new(ReviewStage::Review1A, "rita", 1, true);
        let path = inbox.dir.join("decision_001.json");
        write_json(&path, &decision).unwrap();

        inbox.process_file(&handle, &path).unwrap();
        assert!(!path.exists());
        assert!(inbox.processed.join("decision_001.json").exists());

        let status = handle
            .wait_until(|s| {
                s.history.iter().any(|e| {
                    e.event
                        == HistoryEvent::DecisionRecorded {
                            stage: ReviewStage::Review1A,
                            version: 1,
                        }
                })
            })
            .await
            .unwrap();
        assert_eq!(status.phase, WorkflowPhase::RoundOneWaiting);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_invalid_files_move_to_failed() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = Inbox::under(temp_dir.path());
        inbox.create_dirs().unwrap();
        let (handle, _task) = start();

        let garbage = inbox.dir.join("submission_broken.json");
        std::fs::write(&garbage, "not json").unwrap();
        inbox.process_file(&handle, &garbage).unwrap();
        assert!(inbox.failed.join("submission_broken.json").exists());

        let waiver = ReviewDecision::new(ReviewStage::Review1B, "sam", 1, true).waiving_follow_up();
        let path = inbox.dir.join("decision_waiver.json");
        write_json(&path, &waiver).unwrap();
        inbox.process_file(&handle, &path).unwrap();
        assert!(inbox.failed.join("decision_waiver.json").exists());

        let notes = inbox.dir.join("notes.txt");
        std::fs::write(&notes, "ignored").unwrap();
        inbox.process_file(&handle, &notes).unwrap();
        assert!(notes.exists());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_cancel_file_stops_workflow() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = Inbox::under(temp_dir.path());
        inbox.create_dirs().unwrap();
        let (handle, task) = start();

        let path = inbox.dir.join("cancel");
        std::fs::write(&path, "").unwrap();
        inbox.process_file(&handle, &path).unwrap();

        let result = task.await.unwrap();
        assert_eq!(result.unwrap_err().kind(), approval_core::ErrorKind::Cancelled);
        assert!(inbox.processed.join("cancel").exists());
    }

    #[tokio::test]
    async fn test_existing_files_continue_after_failed_move() {
        let temp_dir = TempDir::new().unwrap();
        let inbox = Inbox::under(temp_dir.path());
        inbox.create_dirs().unwrap();
        let (handle, _task) = start();

        // A non-empty directory in the way makes the rename fail
        let blocked = inbox.processed.join("decision_001.json");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();
        let decision = ReviewDecision::new(ReviewStage::Review1A, "rita", 1, true);
        write_json(&inbox.dir.join("decision_001.json"), &decision).unwrap();
        write_json(
            &inbox.dir.join("submission_002.json"),
            &Submission::new("orders", 2, "{}", "alice"),
        )
        .unwrap();

        inbox.process_existing(&handle).unwrap();
        assert!(inbox.dir.join("decision_001.json").exists());
        assert!(inbox.processed.join("submission_002.json").exists());

        let status = handle
            .wait_until(|s| {
                s.history
                    .iter()
                    .any(|e| e.event == HistoryEvent::SubmissionQueued { version: 2 })
            })
            .await
            .unwrap();
        assert_eq!(status.active_version, Some(1));
        handle.cancel();
    }
}
