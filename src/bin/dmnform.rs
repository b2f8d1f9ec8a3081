use clap::{Parser, Subcommand};
use dmnform::{
    config::{self, OrchestratorConfig},
    decision_flow::LoadOutcome,
    field::{FieldElement, FieldNaming, FormSnapshot},
    host::MemoryHost,
    Error, FormConfiguration, FormId, InternalResult, Orchestrator,
};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, default_value = "dmnform.json", global = true)]
    config: PathBuf,

    /// Anti-forgery token sent with every request
    #[arg(long, env = "DMNFORM_TOKEN", default_value = "", hide_env_values = true, global = true)]
    token: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a form against the decision service
    Evaluate(EvaluateArgs),

    /// Fetch the decision flow of a form
    Flow(FlowArgs),

    /// Validate the config file and print the effective settings
    CheckConfig,
}

#[derive(Parser)]
struct EvaluateArgs {
    /// Form configuration (JSON)
    #[arg(short, long)]
    form: PathBuf,

    /// Field snapshot (JSON) as the host page would report it
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Extra text field values as FIELD_ID=VALUE
    #[arg(short = 's', long = "set", value_parser = parse_field_value)]
    values: Vec<(String, String)>,
}

#[derive(Parser)]
struct FlowArgs {
    /// Form configuration (JSON)
    #[arg(short, long)]
    form: PathBuf,

    /// Process instance the flow belongs to
    #[arg(short, long)]
    process_instance: String,
}

fn parse_field_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| format!("expected FIELD_ID=VALUE, got '{}'", raw))
}

fn load_config(cli: &Cli) -> InternalResult<OrchestratorConfig> {
    let config: OrchestratorConfig = if cli.config.exists() {
        config::from_file(&cli.config)?
    } else {
        debug!("{} not found, using defaults", cli.config.display());
        OrchestratorConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn connect(cli: &Cli, host: Arc<MemoryHost>) -> InternalResult<Orchestrator> {
    let config = load_config(cli)?;
    info!(base_url = %config.endpoint.base_url, "config loaded");
    Orchestrator::connect(
        config,
        SecretString::from(cli.token.clone()),
        host.clone(),
        host,
    )
}

fn print_json<T: serde::Serialize>(value: &T) -> InternalResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| Error::internal(format!("Failed to render output: {}", e)))?;
    println!("{}", output);
    Ok(())
}

async fn evaluate(cli: &Cli, args: &EvaluateArgs) -> InternalResult<()> {
    let form: FormConfiguration = config::from_file(&args.form)?;
    let form_id = form.form_id;

    let host = Arc::new(MemoryHost::new());
    let mut snapshot = match &args.snapshot {
        Some(path) => config::from_file::<FormSnapshot, _>(path)?,
        None => FormSnapshot::new(form_id),
    };
    if snapshot.form_id != form_id {
        return Err(Error::internal(format!(
            "snapshot belongs to form {}, not {}",
            snapshot.form_id, form_id
        )));
    }
    for (field_id, value) in &args.values {
        snapshot.push(FieldElement::text(
            FieldNaming::element_id(form_id, field_id),
            value.clone(),
        ));
    }
    host.load_snapshot(snapshot);

    let orchestrator = connect(cli, host)?;
    orchestrator.register_form(form)?;
    let outcome = orchestrator.evaluate(form_id).await?;

    print_json(&outcome.applied)?;
    if let Some(process_instance) = outcome.process_instance_id {
        println!("process instance: {}", process_instance);
    }
    Ok(())
}

async fn flow(cli: &Cli, args: &FlowArgs) -> InternalResult<()> {
    let form: FormConfiguration = config::from_file(&args.form)?;
    let form_id: FormId = form.form_id;

    let host = Arc::new(MemoryHost::new());
    let orchestrator = connect(cli, host.clone())?;
    orchestrator.register_form(form)?;
    orchestrator
        .registry()
        .set_process_instance(form_id, args.process_instance.clone());

    let outcome = orchestrator.load_decision_flow(form_id).await;
    debug!(?outcome, "decision flow load finished");
    match outcome {
        LoadOutcome::Failed { attempts, kind } => Err(Error::internal(format!(
            "{} (after {} attempts)",
            kind.user_message(),
            attempts
        ))),
        _ => {
            if let Some(view) = host.last_flow_view(form_id) {
                print_json(&view)?;
            }
            Ok(())
        }
    }
}

async fn run(cli: &Cli) -> InternalResult<()> {
    match &cli.command {
        Commands::Evaluate(args) => evaluate(cli, args).await,
        Commands::Flow(args) => flow(cli, args).await,
        Commands::CheckConfig => {
            let config = load_config(cli)?;
            print_json(&config)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
