//! Schema approval server executable
//!
//! Runs a planned review to completion, or serves a live workflow fed by
//! files dropped into the inbox directory.

mod inbox;

use anyhow::{anyhow, Context, Result};
use approval_core::workflow::{spawn_live, spawn_plan, SchemaApprovalInput, WorkflowOptions};
use approval_core::{paths, ApprovalConfig, LoggingActivities, WorkflowHandle};
use approval_types::{ApprovalRecord, SchemaApprovalPlan, Submission};
use clap::{Arg, ArgAction, ArgGroup, Command};
use inbox::{write_json, Inbox};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("approval-server")
        .version("1.0.0")
        .about("Schema approval workflow runner")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Data directory for inbox and status files")
                .default_value("/data/schema-approval"),
        )
        .arg(
            Arg::new("plan")
                .long("plan")
                .value_name("FILE")
                .help("Run a pre-defined review plan and print the result"),
        )
        .arg(
            Arg::new("serve")
                .long("serve")
                .help("Run a live workflow fed from the inbox directory")
                .requires("submission")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("submission")
                .long("submission")
                .value_name("FILE")
                .help("Initial submission for --serve"),
        )
        .group(
            ArgGroup::new("mode")
                .args(["plan", "serve"])
                .required(true),
        )
        .get_matches();

    // Initialize data directory
    let data_dir = matches
        .get_one::<String>("data-dir")
        .ok_or_else(|| anyhow!("--data-dir is required"))?;
    if let Err(e) = paths::init_data_root(data_dir.clone()) {
        log::warn!("Data root initialization warning: {}", e);
    }
    log::info!("Using data directory: {}", data_dir);
    for dir in paths::all_directories() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let config = match matches.get_one::<String>("config") {
        Some(config_path) => {
            let config = ApprovalConfig::from_file(config_path)?;
            log::info!("Loaded configuration from {}", config_path);
            config
        }
        None => {
            log::info!("No configuration file given, using defaults");
            ApprovalConfig::default()
        }
    };

    let activities = Arc::new(LoggingActivities::new(config.storage.root.clone()));
    let options = WorkflowOptions::from(&config);

    if let Some(plan_path) = matches.get_one::<String>("plan") {
        let plan: SchemaApprovalPlan = read_json(Path::new(plan_path))?;
        let (handle, task) = spawn_plan(activities, plan, options);
        let record = run_to_completion(handle, task).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if matches.get_flag("serve") {
        let submission_path = matches
            .get_one::<String>("submission")
            .ok_or_else(|| anyhow!("--serve requires --submission"))?;
        let reviewers = config
            .reviewers
            .as_ref()
            .ok_or_else(|| anyhow!("--serve requires a reviewers section in the configuration"))?;
        let submission: Submission = read_json(Path::new(submission_path))?;
        let input = SchemaApprovalInput::from_config(submission, reviewers);

        let (handle, task) = spawn_live(activities, input, options);
        log::info!("Started live workflow {}", handle.workflow_id());

        let monitor_handle = handle.clone();
        let monitor = tokio::spawn(async move { Inbox::from_paths().monitor(monitor_handle).await });

        let record = serve(handle, task, monitor).await?;
        log::info!(
            "Schema {} approved at version {}",
            record.schema_id,
            record.approved_version
        );
    }

    Ok(())
}

/// Run a live workflow alongside its inbox monitor.
///
/// The inbox is the only input path, so a monitor that stops for any
/// reason cancels the workflow and fails the run.
async fn serve(
    handle: WorkflowHandle,
    task: JoinHandle<approval_core::Result<ApprovalRecord>>,
    mut monitor: JoinHandle<Result<()>>,
) -> Result<ApprovalRecord> {
    let runner = run_to_completion(handle.clone(), task);
    tokio::pin!(runner);

    tokio::select! {
        outcome = &mut runner => {
            monitor.abort();
            outcome
        }
        result = &mut monitor => {
            let error = match result {
                Ok(Ok(())) => anyhow!("Inbox monitor exited unexpectedly"),
                Ok(Err(e)) => e.context("Inbox monitor failed"),
                Err(e) => anyhow!("Inbox monitor task panicked: {}", e),
            };
            log::error!("{:#}", error);
            handle.cancel();
            if let Err(e) = runner.await {
                log::warn!("Workflow stopped after monitor failure: {:#}", e);
            }
            Err(error)
        }
    }
}

/// Mirror status to disk while the workflow runs, then store its record
async fn run_to_completion(
    handle: WorkflowHandle,
    task: JoinHandle<approval_core::Result<ApprovalRecord>>,
) -> Result<ApprovalRecord> {
    let status_path = paths::status_path();
    let mut updates = WatchStream::new(handle.subscribe());
    let writer = tokio::spawn(async move {
        while let Some(status) = updates.next().await {
            if let Err(e) = write_json(&status_path, &status) {
                log::error!("Failed to write status file {:?}: {}", status_path, e);
            }
        }
    });

    let outcome = task.await.context("workflow task panicked")?;
    if let Err(e) = writer.await {
        log::warn!("Status writer stopped abnormally: {}", e);
    }
    write_json(&paths::status_path(), &handle.status())?;

    let record = outcome?;
    write_json(&paths::result_path(), &record)?;
    Ok(record)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_core::workflow::spawn_live;
    use approval_types::WorkflowPhase;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_monitor_failure_cancels_live_workflow() {
        let temp_dir = TempDir::new().unwrap();
        let _ = paths::init_data_root(temp_dir.path().to_string_lossy().to_string());

        let input = SchemaApprovalInput {
            initial_submission: Submission::new("orders", 1, "{}", "alice"),
            stage_one_reviewers: vec!["rita".to_string(), "sam".to_string()],
            stage_two_reviewer: "carol".to_string(),
            stage_three_reviewer: "dave".to_string(),
        };
        let (handle, task) = spawn_live(
            Arc::new(LoggingActivities::default()),
            input,
            WorkflowOptions::default(),
        );
        let monitor = tokio::spawn(async { Err(anyhow!("inbox directory vanished")) });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            serve(handle.clone(), task, monitor),
        )
        .await
        .expect("serve hung after monitor failure");

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Inbox monitor failed: inbox directory vanished"));
        assert_eq!(handle.status().phase, WorkflowPhase::Cancelled);
    }
}
