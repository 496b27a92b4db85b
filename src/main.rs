use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_core::{ConfigValues, CoreConfig};
use triage_tools::ToolRegistry;

/// Main entry point for the triage tool host
///
/// Reads one tool call per line from stdin and writes one `ToolResponse` per line to stdout:
///
/// ```text
/// {"tool": "lookup_patient", "arguments": {"patient_id": "sarah"}}
/// {"status":"ok","data":{...}}
/// ```
///
/// Blank lines are ignored. Logs go to stderr so stdout carries only responses.
///
/// # Environment Variables
/// - `TRIAGE_PATIENT_DATA_DIR`: Directory for patient data storage (default: "patient_data")
/// - `TRIAGE_MAX_WRITE_ATTEMPTS`: Attempts for a contended record write (default: 5)
/// - `TRIAGE_RETRY_BACKOFF_MS`: Backoff step between write attempts (default: 25)
/// - `TRIAGE_RECURRENCE_WINDOW`: Visits examined for recurring symptoms (default: 5)
/// - `TRIAGE_KNOWLEDGE_BASE`: Optional YAML catalogue replacing the built-in one
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Arc::new(config_from_env()?);
    tracing::info!(
        "++ Starting triage tool host on {}",
        cfg.patient_data_dir().display()
    );
    let registry = ToolRegistry::from_config(cfg)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = registry.handle_line(&line);
        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let var = |name: &str| std::env::var(name).ok();
    Ok(ConfigValues {
        patient_data_dir: var("TRIAGE_PATIENT_DATA_DIR"),
        max_write_attempts: var("TRIAGE_MAX_WRITE_ATTEMPTS"),
        retry_backoff_ms: var("TRIAGE_RETRY_BACKOFF_MS"),
        recurrence_window: var("TRIAGE_RECURRENCE_WINDOW"),
        knowledge_base: var("TRIAGE_KNOWLEDGE_BASE"),
    }
    .resolve()?)
}
