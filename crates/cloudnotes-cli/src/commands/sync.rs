use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use cloudnotes_core::db::LocalStore;
use cloudnotes_core::state::SessionState;
use cloudnotes_core::sync::{SessionOutcome, SyncController, SyncEvent, SyncProgress};
use cloudnotes_core::SyncReport;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::commands::common::CommandContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncSummary<'a> {
    pub state: SessionState,
    #[serde(flatten)]
    pub report: &'a SyncReport,
}

pub async fn run_sync(as_json: bool, context: &CommandContext) -> Result<(), CliError> {
    let account = context.account()?.to_string();
    let local: Arc<dyn LocalStore> = Arc::new(context.open_store()?);
    let controller = SyncController::new(
        local,
        Arc::new(context.connector()),
        context.shared_credentials(),
        Some(account),
    );

    let events = controller.subscribe();
    let run = controller.start()?;
    let printer = tokio::spawn(print_progress(events, !as_json));

    let wait = run.wait();
    tokio::pin!(wait);
    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome?,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                if controller.cancel() {
                    eprintln!("Cancelling after the current item...");
                }
            }
        }
    };
    if let Err(error) = printer.await {
        tracing::debug!("Progress printer stopped: {}", error);
    }

    let summary = SyncSummary {
        state: outcome.state(),
        report: outcome.report(),
    };
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_report_lines(summary.report) {
            println!("{line}");
        }
    }

    match outcome {
        SessionOutcome::Completed(_) => Ok(()),
        SessionOutcome::Cancelled(_) => Err(CliError::SyncCancelled),
        SessionOutcome::Failed { reason, .. } => Err(CliError::SyncFailed {
            kind: reason.kind,
            message: reason.message,
        }),
    }
}

async fn print_progress(mut events: broadcast::Receiver<SyncEvent>, enabled: bool) {
    let interactive = enabled && io::stderr().is_terminal();
    loop {
        match events.recv().await {
            Ok(SyncEvent::Progress(progress)) if interactive => {
                eprint!("\r{}", format_progress(progress));
                let _ = io::stderr().flush();
            }
            Ok(event) if event.is_terminal() => break,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
    if interactive {
        eprintln!();
    }
}

pub fn format_progress(progress: SyncProgress) -> String {
    format!(
        "Syncing {}/{} items",
        progress.items_done, progress.items_total
    )
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = if report.has_changes() || report.failed > 0 {
        vec![format!("Sync: {}", report.summary())]
    } else {
        vec!["Sync: everything is up to date".to_string()]
    };
    if report.unchanged > 0 || report.trashed_skipped > 0 {
        lines.push(format!(
            "Skipped {} already linked and {} trashed remote notes",
            report.unchanged, report.trashed_skipped
        ));
    }
    for failure in &report.failures {
        let target = failure
            .local_id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| failure.remote_id.clone())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "  {} {target}: {}",
            failure.phase, failure.message
        ));
    }
    lines
}
