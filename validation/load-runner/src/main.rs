//! Load runner CLI.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use load_runner::config::parse_duration;
use load_runner::{ConfigError, LoadRunner, OutputFormat, ResultsReport, RunConfig, Scenario};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "load-runner")]
#[command(about = "Virtual-user HTTP load runner", long_about = None)]
struct Cli {
    /// Log level or filter directives, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file and/or command-line options
    Run(RunArgs),

    /// Run a short smoke test: 5 virtual users for 5 seconds
    Quick {
        /// Target URL
        #[arg(short, long, env = "LOAD_TARGET_URL")]
        url: String,

        /// Output format: table (default), json, csv
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to scenario YAML file
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Target URL (overrides the scenario)
    #[arg(short, long, env = "LOAD_TARGET_URL")]
    url: Option<String>,

    /// Number of virtual users
    #[arg(long, env = "LOAD_VUS")]
    vus: Option<u32>,

    /// Test duration, e.g. 60s, 2m
    #[arg(short, long)]
    duration: Option<String>,

    /// Per-request timeout, e.g. 30s
    #[arg(long)]
    timeout: Option<String>,

    /// Pause between iterations of each virtual user, e.g. 100ms
    #[arg(long)]
    delay: Option<String>,

    /// Output format: table (default), json, csv
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl RunArgs {
    /// Scenario file first, then command-line overrides.
    fn to_run_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = match self.scenario {
            Some(ref path) => Scenario::from_file(path)?.to_run_config()?,
            None => RunConfig::new(""),
        };

        if let Some(ref url) = self.url {
            config.target_url = url.clone();
        }
        if let Some(vus) = self.vus {
            config.virtual_users = vus;
        }
        if let Some(ref d) = self.duration {
            config.duration = parse_duration("duration", d)?;
        }
        if let Some(ref t) = self.timeout {
            config.request_timeout = parse_duration("request_timeout", t)?;
        }
        if let Some(ref d) = self.delay {
            config.inter_iteration_delay = parse_duration("inter_iteration_delay", d)?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run(args) => {
            let config = args.to_run_config().map_err(config_error)?;
            execute(config, args.output, !args.no_progress).await
        }
        Commands::Quick { url, output } => {
            let mut config = RunConfig::new(url);
            config.name = "quick".to_string();
            config.virtual_users = 5;
            config.duration = Duration::from_secs(5);
            execute(config, output, true).await
        }
        Commands::List { dir } => list_scenarios(&dir),
    }
}

async fn execute(config: RunConfig, output: OutputFormat, progress: bool) -> Result<()> {
    let runner = LoadRunner::new(config)
        .map_err(config_error)?
        .with_progress(progress);

    let handle = runner.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping virtual users");
            handle.abort();
        }
    });

    let summary = runner.run().await;
    println!("{}", ResultsReport::render(&summary, output)?);

    // Failed requests only show up in the report, never in the exit status
    Ok(())
}

fn config_error(err: ConfigError) -> anyhow::Error {
    let field = err.field();
    anyhow::Error::new(err).context(format!("Invalid configuration ({})", field))
}

fn list_scenarios(dir: &Path) -> Result<()> {
    println!("Available scenarios in {}:", dir.display());
    println!();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            eprintln!("Make sure the directory exists and is readable");
            return Ok(());
        }
    };

    let mut scenarios = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        ) {
            continue;
        }
        match Scenario::from_file(&path) {
            Ok(scenario) => {
                let filename = entry.file_name().to_string_lossy().to_string();
                scenarios.push((filename, scenario));
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping scenario"),
        }
    }

    scenarios.sort_by(|a, b| a.0.cmp(&b.0));

    if scenarios.is_empty() {
        println!("No scenario files found");
    } else {
        for (filename, scenario) in scenarios {
            println!("  {} - {}", filename, scenario.name);
            if !scenario.description.is_empty() {
                println!("    {}", scenario.description);
            }
            if let Some(url) = scenario.target_url {
                println!("    target: {}", url);
            }
            println!();
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = FmtSubscriber::builder()
        .with_env_filter(log_filter(rust_log.as_deref(), log_level))
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// RUST_LOG wins over `--log-level`. Unparsable directives fall back to info.
fn log_filter(rust_log: Option<&str>, log_level: &str) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .or_else(|| EnvFilter::try_new(log_level.to_lowercase()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
