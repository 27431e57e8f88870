//! Detached extraction agent: reads an ICP search input file, runs the
//! search through the backend and writes the qualified leads to disk.

use anyhow::{Context, Result};
use clap::Parser;
use leadflow::models::IcpSearchRequest;
use leadflow::services::{BackendClient, RetryPolicy};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use validator::Validate;

const ACTOR_VERSION: &str = "1.0.0";
const ABSOLUTE_MAX_RAW_LEADS: u32 = 1000;
const MAX_TOP_N: u32 = 500;
const DEFAULT_MAX_RAW_LEADS: u32 = 1000;
const DEFAULT_TOP_N: u32 = 300;

#[derive(Debug, Parser)]
#[command(name = "extract-agent", version = ACTOR_VERSION, about = "Run an ICP lead search against the Leadflow backend")]
struct Args {
    /// Actor input JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the search result JSON
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Backend base URL
    #[arg(long, env = "LEADFLOW_BACKEND_URL", default_value = "http://localhost:8080")]
    backend_url: String,

    /// Run identifier forwarded to the backend
    #[arg(long, env = "APIFY_ACTOR_RUN_ID")]
    run_id: Option<String>,

    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

/// Apply defaults and ceilings to the requested volumes
fn clamp_volumes(input: &mut IcpSearchRequest) {
    let max_raw = input.max_raw_leads.unwrap_or(DEFAULT_MAX_RAW_LEADS);
    if max_raw > ABSOLUTE_MAX_RAW_LEADS {
        warn!(requested = max_raw, ceiling = ABSOLUTE_MAX_RAW_LEADS, "max_raw_leads clamped");
    }
    input.max_raw_leads = Some(max_raw.clamp(1, ABSOLUTE_MAX_RAW_LEADS));

    let top_n = input.top_n.unwrap_or(DEFAULT_TOP_N);
    if top_n > MAX_TOP_N {
        warn!(requested = top_n, ceiling = MAX_TOP_N, "top_n clamped");
    }
    input.top_n = Some(top_n.clamp(1, MAX_TOP_N));
}

/// Read and validate the actor input file
fn load_input(path: &Path) -> Result<IcpSearchRequest> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let input: IcpSearchRequest = serde_json::from_str(&raw)
        .with_context(|| format!("invalid input JSON in {}", path.display()))?;
    input.validate().context("invalid input")?;
    Ok(input)
}

async fn run(args: Args) -> Result<()> {
    let mut input = load_input(&args.input)?;
    clamp_volumes(&mut input);

    if input.apify_run_id.is_none() {
        input.apify_run_id = args.run_id.clone();
    }
    input.source.get_or_insert_with(|| "extract-agent".to_string());

    let client = BackendClient::new(
        args.backend_url.clone(),
        ACTOR_VERSION.to_string(),
        Duration::from_secs(args.timeout_secs),
        RetryPolicy::fixed(2, Duration::from_secs(3)),
    );

    let result = client.run_icp_search(&input).await.context("ICP search failed")?;

    let json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&args.output, json).with_context(|| format!("cannot write {}", args.output.display()))?;

    info!(
        job_id = %result.job_id,
        raw_leads = result.summary.raw_leads_fetched,
        returned = result.summary.leads_returned,
        average_fit_score = result.summary.average_fit_score,
        processing_time_ms = result.summary.processing_time_ms,
        output = %args.output.display(),
        "Extraction complete"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(version = ACTOR_VERSION, backend = %args.backend_url, "Starting extraction agent");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
