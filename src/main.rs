use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use finflow::config::CONFIG;
use finflow::runner::{build_context, demo_engine, load_inputs, load_model, prepare_inputs};
use finflow::validate_inputs;
use fin_core::primitives::registry;

/// Ejecuta y valida modelos DSL de analítica financiera
#[derive(Parser)]
#[command(name = "finflow")]
#[command(about = "Financial analytics model runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered operations
    Primitives {
        /// Print parameters and families as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a model (and run inputs, when the model declares an input schema)
    Validate {
        /// Path to the model JSON
        model: PathBuf,
        /// Path to a JSON object of run inputs
        #[arg(long)]
        inputs: Option<PathBuf>,
    },
    /// Execute a model against the in-memory demo data sources
    Run {
        /// Path to the model JSON
        model: PathBuf,
        /// Path to a JSON object of run inputs
        #[arg(long)]
        inputs: Option<PathBuf>,
        /// Global timeout for the run
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Attach the debug trace to the result
        #[arg(long)]
        debug: bool,
    },
}

fn list_primitives(json: bool) -> Result<ExitCode> {
    let infos = registry().describe();
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for p in infos {
            println!("{:<32} {:<9} {}", p.name, p.family.as_str(), p.description);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn validate(model: PathBuf, inputs: Option<PathBuf>) -> Result<ExitCode> {
    let model = load_model(&model)?;
    let engine = demo_engine(&CONFIG);
    let report = engine.validate(&model);
    println!("{}", serde_json::to_string_pretty(&report)?);
    let mut ok = report.valid;

    if let Some(schema) = &model.input_schema {
        let inputs = load_inputs(inputs.as_deref())?;
        let filled = fin_core::apply_defaults(&inputs, schema);
        let inputs_report = validate_inputs(&filled, schema);
        println!("{}", serde_json::to_string_pretty(&inputs_report)?);
        ok &= inputs_report.valid;
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(model: PathBuf, inputs: Option<PathBuf>, timeout_ms: Option<u64>, debug: bool) -> Result<ExitCode> {
    let model_path = model;
    let model = load_model(&model_path)?;
    let inputs = prepare_inputs(&model, load_inputs(inputs.as_deref())?)?;
    let ctx = build_context(inputs, timeout_ms, debug, &CONFIG);

    info!("running {}", model_path.display());
    let result = demo_engine(&CONFIG).execute(&model, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(CONFIG.log_level.as_str())).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Primitives { json } => list_primitives(json),
        Commands::Validate { model, inputs } => validate(model, inputs),
        Commands::Run { model,
                        inputs,
                        timeout_ms,
                        debug } => run(model, inputs, timeout_ms, debug).await,
    }
}
