//! Merge step: hand every collected invoice to a PDF concatenation
//! collaborator, then clear the sources.
//!
//! Byte-level PDF assembly is deliberately outside this crate; anything that
//! can concatenate a list of PDFs into one file plugs in here.

use crate::Result;
use std::path::{Path, PathBuf};

/// Collaborator that produces one PDF from many.
pub trait PdfConcatenator {
    fn concat(&self, sources: &[PathBuf], output: &Path) -> Result<()>;
}

/// Merge every PDF in `source_dir` (lexicographic filename order) into
/// `output_dir/file_name`, then delete the sources. Returns `None` when the
/// source directory holds no PDFs; the concatenator is not invoked and
/// nothing is deleted in that case. Sources are only removed after the
/// merged file has been written.
pub fn merge_and_delete(
    source_dir: &Path,
    output_dir: &Path,
    file_name: &str,
    concatenator: &dyn PdfConcatenator,
) -> Result<Option<PathBuf>> {
    let pattern = source_dir.join("*.pdf");
    let mut sources: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|err| std::io::Error::other(err.to_string()))?
        .filter_map(|entry| entry.ok())
        .collect();
    sources.sort();

    if sources.is_empty() {
        tracing::info!("No PDF files to merge in {}", source_dir.display());
        return Ok(None);
    }

    std::fs::create_dir_all(output_dir)?;
    let output = output_dir.join(file_name);

    tracing::info!("Merging {} PDF(s) into {}", sources.len(), output.display());
    concatenator.concat(&sources, &output)?;

    for source in &sources {
        std::fs::remove_file(source)?;
        tracing::debug!("Deleted merged source: {}", source.display());
    }

    Ok(Some(output))
}
