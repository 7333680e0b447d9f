use crate::commands::merge::merge_invoices;
use anyhow::{Result, anyhow};
use clap::{Args, ValueEnum};
use facture_browser::{BrowserSession, ChromeSessions, SessionConfig};
use facture_core::{BatchConfig, BatchResult, BatchRunner, FormNavigator, ProfileStore};
use facture_retailers::{AuchanNavigator, CarrefourNavigator};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Retailer {
    Auchan,
    Carrefour,
}

impl Retailer {
    fn as_str(&self) -> &'static str {
        match self {
            Retailer::Auchan => "auchan",
            Retailer::Carrefour => "carrefour",
        }
    }

    fn navigator(&self) -> Box<dyn FormNavigator<BrowserSession>> {
        match self {
            Retailer::Auchan => Box::new(AuchanNavigator),
            Retailer::Carrefour => Box::new(CarrefourNavigator),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Args)]
pub struct RunArgs {
    /// Retailer whose invoice form to drive
    #[arg(long, value_enum)]
    pub retailer: Retailer,

    /// Profile name from the profile store
    #[arg(long)]
    pub profile: String,

    /// Receipt barcode (repeatable)
    #[arg(long = "barcode", value_name = "BARCODE")]
    pub barcodes: Vec<String>,

    /// File with one barcode per line
    #[arg(long, value_name = "FILE")]
    pub barcodes_file: Option<PathBuf>,

    /// Attempts per barcode before giving up on it
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Seconds to wait for each invoice download
    #[arg(long, default_value_t = 40)]
    pub download_timeout: u64,

    /// Run Chrome headless (downloads can be flaky on some setups)
    #[arg(long)]
    pub headless: bool,

    /// Pin a specific Chrome binary
    #[arg(long, env = "FACTURE_CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Leave the collected invoices unmerged
    #[arg(long)]
    pub no_merge: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Invoice download directory
    #[arg(long, env = "FACTURE_INVOICES_DIR", default_value = "data/invoices")]
    pub invoices_dir: PathBuf,

    /// Directory for the merged PDF
    #[arg(long, env = "FACTURE_MERGED_DIR", default_value = "data/merged_pdf")]
    pub merged_dir: PathBuf,

    /// Merged PDF file name
    #[arg(long, env = "FACTURE_MERGED_FILE_NAME", default_value = "merged_invoices.pdf")]
    pub merged_file_name: String,

    /// Failed-barcode log file
    #[arg(
        long,
        env = "FACTURE_FAILED_BARCODES_FILE",
        default_value = "data/failed_barcodes.txt"
    )]
    pub failed_barcodes_file: PathBuf,

    /// Profile store (JSON object keyed by profile name)
    #[arg(long, env = "FACTURE_PROFILES_FILE", default_value = "profiles.json")]
    pub profiles_file: PathBuf,
}

#[derive(Serialize)]
struct RunReport<'a> {
    retailer: &'a str,
    profile: &'a str,
    #[serde(flatten)]
    result: &'a BatchResult,
    merged_pdf: Option<&'a PathBuf>,
    finished_at: String,
}

pub fn execute(args: &RunArgs) -> Result<()> {
    let barcodes = collect_barcodes(args)?;
    tracing::debug!(
        "Running a {} batch of {} barcode(s)",
        args.retailer.as_str(),
        barcodes.len()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run_batch(args, &barcodes));

    // Keep a hung blocking task from pinning the process on the way out.
    runtime.shutdown_timeout(Duration::from_millis(100));

    result
}

async fn run_batch(args: &RunArgs, barcodes: &[String]) -> Result<()> {
    let store = ProfileStore::load(&args.profiles_file)?;
    let profile = store.get(&args.profile)?;

    let mut session_config = SessionConfig::new(args.invoices_dir.clone());
    session_config.headless = args.headless;
    session_config.chrome_binary = args.chrome_path.clone();
    let provider = ChromeSessions::new(session_config);

    let navigator = args.retailer.navigator();

    let mut batch_config = BatchConfig::new(
        args.invoices_dir.clone(),
        args.failed_barcodes_file.clone(),
    );
    batch_config.max_attempts = args.max_attempts;
    batch_config.download_timeout = Duration::from_secs(args.download_timeout);

    let runner = BatchRunner::new(&provider, navigator.as_ref(), &batch_config);

    let spinner = batch_spinner(args.retailer, barcodes.len());
    let result = runner.run(barcodes, profile).await;
    spinner.finish_and_clear();
    let result = result?;

    let merged = if args.no_merge || result.downloaded.is_empty() {
        None
    } else {
        merge_invoices(&args.invoices_dir, &args.merged_dir, &args.merged_file_name)?
    };

    report(args, &result, merged.as_ref());
    Ok(())
}

fn batch_spinner(retailer: Retailer, barcode_count: usize) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Driving the {} form for {} barcode(s)...",
        retailer.as_str(),
        barcode_count
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn report(args: &RunArgs, result: &BatchResult, merged: Option<&PathBuf>) {
    match args.format {
        OutputFormat::Json => {
            let report = RunReport {
                retailer: args.retailer.as_str(),
                profile: &args.profile,
                result,
                merged_pdf: merged,
                finished_at: chrono::Local::now().to_rfc3339(),
            };
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(err) => eprintln!("Could not serialize the report: {err}"),
            }
        }
        OutputFormat::Pretty => {
            println!("✅ Downloaded {} invoice(s)", result.downloaded.len());
            for path in &result.downloaded {
                println!("   {}", path.display());
            }
            if !result.failed.is_empty() {
                println!("⚠️  {} barcode(s) failed:", result.failed.len());
                for barcode in &result.failed {
                    println!("   {barcode}");
                }
                println!(
                    "   Recorded in {}",
                    args.failed_barcodes_file.display()
                );
            }
            if let Some(path) = merged {
                println!("📄 Merged PDF: {}", path.display());
            }
        }
    }
}

fn collect_barcodes(args: &RunArgs) -> Result<Vec<String>> {
    let mut barcodes = args.barcodes.clone();

    if let Some(ref path) = args.barcodes_file {
        let content = std::fs::read_to_string(path)
            .map_err(|err| anyhow!("could not read {}: {err}", path.display()))?;
        barcodes.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    if barcodes.is_empty() {
        return Err(anyhow!(
            "no barcodes given. Pass --barcode or --barcodes-file."
        ));
    }

    Ok(barcodes)
}
