use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use crisis_core::{ContentType, IncidentId, LegalLinter};
use crisis_dispatch::{ArtifactOrder, Dispatcher, IncidentWorkflow, PipelineConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Pipeline configuration (TOML)");

    Command::new("crisis-pipeline")
        .version(crisis_dispatch::VERSION)
        .about("Incident-response communications pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("plain")
                .value_parser(["plain", "json"])
                .help("Log output format"),
        )
        .subcommand(
            Command::new("run")
                .about("Run the full incident workflow")
                .arg(
                    Arg::new("incident")
                        .long("incident")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Incident report (JSON)"),
                )
                .arg(Arg::new("id").long("id").help("Incident identifier"))
                .arg(
                    Arg::new("types")
                        .long("types")
                        .value_delimiter(',')
                        .help("Content types to generate (default: all)"),
                )
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("lint")
                .about("Lint a text file for risky wording")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Text to lint"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration")
                .arg(config_arg),
        )
}

fn init_tracing(format: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn load_config(args: &ArgMatches) -> Result<PipelineConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_path(args: &ArgMatches, name: &str) -> Result<(PathBuf, String)> {
    let path = args
        .get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("--{name} is required"))?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok((path, raw))
}

async fn run_incident(args: &ArgMatches, config: PipelineConfig) -> Result<()> {
    let (path, raw) = read_path(args, "incident")?;
    let payload: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let incident_id = args
        .get_one::<String>("id")
        .cloned()
        .or_else(|| payload.get("id").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("inc-{}", ulid::Ulid::new()));

    let orders = match args.get_many::<String>("types") {
        Some(types) => types
            .map(|t| t.parse::<ContentType>().map(ArtifactOrder::from))
            .collect::<Result<Vec<_>, _>>()?,
        None => ArtifactOrder::all(),
    };

    let dispatcher = Arc::new(Dispatcher::with_default_executor(config)?);
    let workflow = IncidentWorkflow::new(Arc::clone(&dispatcher));
    let outcome = workflow.run(IncidentId::new(incident_id), payload, orders).await;
    drop(workflow);

    if let Ok(dispatcher) = Arc::try_unwrap(dispatcher) {
        dispatcher.shutdown().await;
    }

    let outcome = outcome?;
    println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);

    let failures = outcome.failures();
    if failures > 0 {
        bail!("{failures} of {} artifacts failed", outcome.artifacts.len());
    }
    Ok(())
}

fn lint_file(args: &ArgMatches) -> Result<()> {
    let (_, text) = read_path(args, "file")?;
    let (redlines, summary) = LegalLinter::new().lint(&text);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "redlines": redlines, "summary": summary }))?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let log_format = matches
        .get_one::<String>("log-format")
        .map_or("plain", String::as_str);

    match matches.subcommand() {
        Some(("run", args)) => {
            let config = load_config(args)?;
            init_tracing(log_format, &config.log_level);
            run_incident(args, config).await
        }
        Some(("lint", args)) => {
            init_tracing(log_format, "info");
            lint_file(args)
        }
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        _ => bail!("no subcommand given"),
    }
}
