use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::{ConfigValues, CoreConfig, FilePatientStore};
use triage_tools::{ToolRegistry, ToolResponse};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Clinical triage decision-support CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Show a patient record
    Lookup {
        /// Patient identifier
        patient_id: String,
    },
    /// Search patients by name
    Search {
        /// Full or partial name
        name: String,
    },
    /// Onboard a new patient
    Onboard {
        /// Patient name
        name: String,
        /// Age in years
        age: u32,
        /// Occupation
        occupation: String,
        /// Preferred identifier (a UUID is allocated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Run a consultation for a set of symptoms
    Assess {
        /// Symptom names
        #[arg(required = true)]
        symptoms: Vec<String>,
        /// Patient identifier (anonymous when omitted)
        #[arg(long)]
        patient: Option<String>,
        /// Age, for anonymous patients
        #[arg(long)]
        age: Option<u32>,
        /// Do not store the visit
        #[arg(long)]
        dry_run: bool,
    },
    /// Clarifying questions for a set of symptoms
    Questions {
        #[arg(required = true)]
        symptoms: Vec<String>,
    },
    /// List the available tools
    Tools,
    /// Print the OpenAPI document describing every tool
    Schema,
    /// Invoke a tool with JSON arguments
    Call {
        /// Tool name
        tool: String,
        /// JSON object of arguments
        arguments: Option<String>,
    },
    /// Write every patient record to a snapshot file
    Export {
        /// Destination JSON file
        path: PathBuf,
    },
    /// Load patient records from a snapshot file
    Import {
        /// Source JSON file
        path: PathBuf,
    },
}

/// Resolve `CoreConfig` from `TRIAGE_*` environment variables.
fn config_from_env() -> anyhow::Result<CoreConfig> {
    let var = |name: &str| std::env::var(name).ok();
    let values = ConfigValues {
        patient_data_dir: var("TRIAGE_PATIENT_DATA_DIR"),
        max_write_attempts: var("TRIAGE_MAX_WRITE_ATTEMPTS"),
        retry_backoff_ms: var("TRIAGE_RETRY_BACKOFF_MS"),
        recurrence_window: var("TRIAGE_RECURRENCE_WINDOW"),
        knowledge_base: var("TRIAGE_KNOWLEDGE_BASE"),
    };
    values.resolve().context("invalid TRIAGE_* configuration")
}

/// Print `data` for a successful call, or fail with the error message.
fn print_response(response: ToolResponse) -> anyhow::Result<()> {
    if response.is_ok() {
        let data = response.data.unwrap_or(Value::Null);
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    } else {
        anyhow::bail!(
            "{}: {}",
            response
                .error_kind
                .map(|k| k.as_str())
                .unwrap_or("error"),
            response.message.unwrap_or_default()
        )
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(config_from_env()?);
    let registry = ToolRegistry::from_config(Arc::clone(&cfg))?;

    match cli.command {
        Some(Commands::List) => {
            let response = registry.dispatch("list_patients", json!({}));
            if let Some(patients) = response
                .data
                .as_ref()
                .and_then(|d| d["patients"].as_array())
            {
                if patients.is_empty() {
                    println!("No patients found.");
                } else {
                    for patient in patients {
                        println!(
                            "ID: {}, Name: {}",
                            patient["id"].as_str().unwrap_or_default(),
                            patient["name"].as_str().unwrap_or_default()
                        );
                    }
                }
                return Ok(());
            }
            print_response(response)?;
        }
        Some(Commands::Lookup { patient_id }) => {
            print_response(
                registry.dispatch("lookup_patient", json!({ "patient_id": patient_id })),
            )?;
        }
        Some(Commands::Search { name }) => {
            print_response(registry.dispatch("search_patients", json!({ "name": name })))?;
        }
        Some(Commands::Onboard {
            name,
            age,
            occupation,
            id,
        }) => {
            print_response(registry.dispatch(
                "onboard_patient",
                json!({
                    "patient_id": id,
                    "name": name,
                    "age": age,
                    "occupation": occupation,
                }),
            ))?;
        }
        Some(Commands::Assess {
            symptoms,
            patient,
            age,
            dry_run,
        }) => {
            print_response(registry.dispatch(
                "run_consultation",
                json!({
                    "patient_id": patient,
                    "symptoms": symptoms,
                    "age": age,
                    "record_visit": !dry_run,
                }),
            ))?;
        }
        Some(Commands::Questions { symptoms }) => {
            print_response(
                registry.dispatch("clarifying_questions", json!({ "symptoms": symptoms })),
            )?;
        }
        Some(Commands::Tools) => {
            for tool in ToolRegistry::descriptors() {
                println!("{:<22} {}", tool.name, tool.description);
            }
        }
        Some(Commands::Schema) => {
            println!("{}", ToolRegistry::openapi().to_pretty_json()?);
        }
        Some(Commands::Call { tool, arguments }) => {
            let arguments = match arguments {
                Some(raw) => serde_json::from_str(&raw).context("arguments must be a JSON object")?,
                None => Value::Null,
            };
            print_response(registry.dispatch(&tool, arguments))?;
        }
        Some(Commands::Export { path }) => {
            let count = FilePatientStore::new(cfg).export_snapshot(&path)?;
            println!("Exported {} patients to {}", count, path.display());
        }
        Some(Commands::Import { path }) => {
            let report = FilePatientStore::new(cfg).import_snapshot(&path)?;
            println!("Imported {} patients", report.imported.len());
            for skipped in report.skipped {
                eprintln!("Skipped {}: {}", skipped.key, skipped.reason);
            }
        }
        None => {
            println!("Use 'triage --help' for commands");
        }
    }

    Ok(())
}
