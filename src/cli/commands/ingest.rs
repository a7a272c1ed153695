//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{Pipeline, UploadedFile};
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(paths: &[String], settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let path = Path::new(path);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))?;

        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

        files.push(UploadedFile { name, bytes });
    }

    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Ingesting {} document(s)...", files.len()));

    match pipeline.ingest_files(&files).await {
        Ok(report) => {
            spinner.finish_and_clear();

            for err in &report.errors {
                Output::warning(err);
            }

            Output::success(&format!(
                "Indexed {} chunks from {} document(s)",
                report.chunks_indexed,
                report.processed_files.len()
            ));
            for name in &report.processed_files {
                Output::list_item(name);
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
