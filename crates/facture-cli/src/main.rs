use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "facture")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Retrieve retailer invoices from receipt barcodes",
    long_about = "Facture drives a retailer's invoice-request web form with a scripted Chrome \
                  session for each receipt barcode, collects the downloaded PDFs as \
                  facture_<n>.pdf, records barcodes that keep failing, and can merge the \
                  collected invoices into a single PDF."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download invoices for a batch of receipt barcodes
    Run(commands::run::RunArgs),

    /// List the profiles available in the profile store
    Profiles(commands::profiles::ProfilesArgs),

    /// Merge the collected invoices into a single PDF and delete the sources
    Merge(commands::merge::MergeArgs),

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(&args),
        Commands::Profiles(args) => commands::profiles::execute(&args),
        Commands::Merge(args) => commands::merge::execute(&args),
        Commands::Completion { shell } => commands::completion::execute(shell, &mut Cli::command()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("facture=debug,facture_core=debug,facture_browser=debug,facture_retailers=debug")
    } else {
        EnvFilter::new("facture=info,facture_core=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
