use anyhow::{Result, anyhow};
use clap::Args;
use facture_core::merge::{PdfConcatenator, merge_and_delete};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Args)]
pub struct MergeArgs {
    /// Directory holding the collected invoice PDFs
    #[arg(long, env = "FACTURE_INVOICES_DIR", default_value = "data/invoices")]
    pub invoices_dir: PathBuf,

    /// Directory for the merged PDF
    #[arg(long, env = "FACTURE_MERGED_DIR", default_value = "data/merged_pdf")]
    pub merged_dir: PathBuf,

    /// Merged PDF file name
    #[arg(long, env = "FACTURE_MERGED_FILE_NAME", default_value = "merged_invoices.pdf")]
    pub merged_file_name: String,
}

pub fn execute(args: &MergeArgs) -> Result<()> {
    match merge_invoices(&args.invoices_dir, &args.merged_dir, &args.merged_file_name)? {
        Some(path) => println!("📄 Merged PDF: {}", path.display()),
        None => println!("No PDF files to merge in {}", args.invoices_dir.display()),
    }
    Ok(())
}

/// Merge every PDF in `invoices_dir` into one file via `pdfunite`.
pub fn merge_invoices(
    invoices_dir: &Path,
    merged_dir: &Path,
    merged_file_name: &str,
) -> Result<Option<PathBuf>> {
    merge_and_delete(invoices_dir, merged_dir, merged_file_name, &PdfUnite)
        .map_err(|err| anyhow!("merge failed: {err}"))
}

/// Concatenation collaborator backed by poppler's `pdfunite`.
struct PdfUnite;

impl PdfConcatenator for PdfUnite {
    fn concat(&self, sources: &[PathBuf], output: &Path) -> facture_core::Result<()> {
        if which::which("pdfunite").is_err() {
            return Err(facture_core::Error::Io(std::io::Error::other(
                "pdfunite command not found. Install poppler-utils or use --no-merge.",
            )));
        }

        let result = Command::new("pdfunite").args(sources).arg(output).output()?;

        if !result.status.success() {
            return Err(facture_core::Error::Io(std::io::Error::other(format!(
                "pdfunite failed: {}",
                String::from_utf8_lossy(&result.stderr)
            ))));
        }

        Ok(())
    }
}
