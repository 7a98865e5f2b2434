//! Load processed-chunk JSONL files into an in-memory metadata store.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::path::Path;

use lexfuse_core::metadata::{parse_record, InMemoryMetadataStore};

/// Counts from one load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Read every file in `paths`. Malformed lines are skipped with a warning;
/// an unreadable file is an error.
pub fn load_jsonl(paths: &[impl AsRef<Path>]) -> Result<(InMemoryMetadataStore, LoadReport)> {
    let store = InMemoryMetadataStore::new();
    let mut report = LoadReport::default();

    for path in paths {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open metadata file: {}", path.display()))?;

        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok((id, meta)) => {
                    store.insert(id, meta);
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), line = lineno + 1, error = %e, "skipping metadata record");
                    report.skipped += 1;
                }
            }
        }
    }

    tracing::info!(loaded = report.loaded, skipped = report.skipped, records = store.len(), "metadata loaded");
    Ok((store, report))
}
