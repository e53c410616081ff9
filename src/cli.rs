use crate::{
    config::Config,
    job::JobOutcome,
    orchestrator::{Orchestrator, RunRequest, RunSummary},
    report::RunReport,
    submit::SubmitClient,
    transfer,
    util::now_rfc3339,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "remote-run")]
#[command(about = "Run a registered program on a remote execution service and fetch its output files")]
#[command(
    after_help = "Example: remote-run --url http://127.0.0.1:8082 run -n convertToJson -i test.txt -o out -p \"-s ss -d dd\""
)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./remote-run.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Service base URL, e.g. http://127.0.0.1:8082.
    #[arg(long, global = true, env = "REMOTE_RUN_URL")]
    pub url: Option<String>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log to the console and to the log file.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file, run a program on it remotely, download its outputs.
    Run {
        /// Registered program name.
        #[arg(short = 'n', long)]
        name: String,
        /// Local input file.
        #[arg(short = 'i', long)]
        input: PathBuf,
        /// Directory that receives the output files.
        #[arg(short = 'o', long)]
        out_dir: PathBuf,
        /// Parameters passed to the program as-is.
        #[arg(short = 'p', long, default_value = "", allow_hyphen_values = true)]
        params: String,
        /// Print the outcome as JSON instead of plain stdout/stderr.
        #[arg(short = 'j', long)]
        json: bool,
        /// Write a JSON run report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the programs registered on the service.
    Programs {},
}

/// Runs the command and returns the process exit code.
pub async fn dispatch(args: Args) -> Result<i32> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&args, &cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    let base_url = args
        .url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| Some(cfg.service.base_url.clone()).filter(|u| !u.trim().is_empty()))
        .ok_or_else(|| anyhow!("no service URL: pass --url, set REMOTE_RUN_URL or service.base_url"))?;
    let client = SubmitClient::new(&cfg, &base_url)?;

    let result = match &args.cmd {
        Command::Programs {} => programs(&client).await,
        Command::Run {
            name,
            input,
            out_dir,
            params,
            json,
            report,
        } => {
            let req = RunRequest {
                program: name.clone(),
                input: input.clone(),
                out_dir: out_dir.clone(),
                parameters: params.clone(),
            };
            let report = report.clone().or_else(|| {
                Some(PathBuf::from(&cfg.output.report_path)).filter(|p| !p.as_os_str().is_empty())
            });
            run(&cfg, client, &req, *json || cfg.output.json, report.as_deref()).await
        }
    };
    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("remote-run.toml");
    default.exists().then_some(default)
}

fn resolve_log_path(args: &Args, cfg: &Config) -> Option<PathBuf> {
    if !(args.verbose || cfg.logging.write_to_file) {
        return None;
    }
    if cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

/// Level used when `RUST_LOG` is unset. Verbose runs record the raw
/// request and response exchange, which is logged at debug.
fn default_level<'a>(args: &'a Args, cfg: &'a Config) -> &'a str {
    match args.log_level.as_deref() {
        Some(level) => level,
        None if args.verbose && matches!(cfg.logging.level.as_str(), "info" | "warn" | "error") => {
            "debug"
        }
        None => cfg.logging.level.as_str(),
    }
}

/// Console output only when verbose; otherwise the run is silent apart from
/// the optional log file.
fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(args, cfg)));

    let console_layer = if !args.verbose {
        None
    } else if cfg.logging.json {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
        )
    } else {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
        )
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::util::ensure_dir(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

async fn programs(client: &SubmitClient) -> Result<i32> {
    let listing = client.list_programs().await?;
    println!("{}", listing.trim_end());
    Ok(0)
}

async fn run(
    cfg: &Config,
    client: SubmitClient,
    req: &RunRequest,
    json: bool,
    report_path: Option<&Path>,
) -> Result<i32> {
    let transfer = transfer::from_config(cfg)?;
    let orchestrator = Orchestrator::new(cfg, client, transfer);

    let started = now_rfc3339();
    let outcome = orchestrator.submit(req).await?;
    render_outcome(&mut std::io::stdout().lock(), &outcome, json)?;

    let artifacts = orchestrator.retrieve(&outcome, &req.out_dir).await;
    let summary = RunSummary { outcome, artifacts };
    render_failures(&summary);

    if let Some(path) = report_path {
        RunReport::new(&req.program, &req.input, started, now_rfc3339(), &summary).write(path)?;
        info!("report written to {}", path.display());
    }

    let code = summary.exit_code();
    info!("run finished status={} exit={code}", summary.outcome.status);
    Ok(code)
}

fn render_outcome(out: &mut impl Write, outcome: &JobOutcome, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, outcome)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", outcome.standard_output)?;
        writeln!(out, "{}", outcome.standard_error)?;
    }
    out.flush()?;
    Ok(())
}

fn render_failures(summary: &RunSummary) {
    for failed in summary.failed_artifacts() {
        if let Some(err) = &failed.error {
            eprintln!("{}: {}", failed.location, err);
        }
    }
}
