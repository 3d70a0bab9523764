//! Build a hash store from a flat-text source.

use crate::error::{CapError, Result};
use crate::expand::Expander;
use crate::locate::Locator;
use crate::scanner::RecordScanner;
use capdb_store::{store_path_for, StoreWriter};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Summary of a store build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Records stored under their first name.
    pub records: usize,
    /// Additional names stored as shadows.
    pub aliases: usize,
    /// First names of records stored with unresolved references.
    pub unresolved: Vec<String>,
    /// Names skipped because an earlier record already claimed them.
    pub duplicates: Vec<String>,
    pub output: PathBuf,
}

/// Read every record of `source`, expand it against `source`, and write the
/// hash store to `output` (default `<source>.db`).
///
/// An expansion that exceeds the depth ceiling aborts the build; nothing is
/// written in that case.
pub fn build_store(source: &Path, output: Option<&Path>, max_depth: usize) -> Result<BuildReport> {
    let output = output.map_or_else(|| store_path_for(source), Path::to_path_buf);
    let file = File::open(source).map_err(|e| CapError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;

    let sources = [source.to_path_buf()];
    let expander = Expander::new(Locator::new(&sources, false), max_depth);
    let mut scanner = RecordScanner::new(file, source);
    let mut writer = StoreWriter::new();
    let mut report = BuildReport {
        records: 0,
        aliases: 0,
        unresolved: Vec::new(),
        duplicates: Vec::new(),
        output: output.clone(),
    };

    while let Some(record) = scanner.next_record()? {
        let mut aliases = Vec::new();
        for alias in record.aliases() {
            if alias.is_empty() || aliases.contains(&alias) {
                continue;
            }
            if writer.contains(&alias) {
                warn!(name = %alias, "Duplicate name, keeping the first");
                report.duplicates.push(alias);
                continue;
            }
            aliases.push(alias);
        }
        // The first free name holds the record, the rest point at it.
        let Some((primary, others)) = aliases.split_first() else {
            warn!(record = %record, "Every name already taken, skipping record");
            continue;
        };

        let expansion = expander.expand(record)?;
        let partial = expansion.is_partial();
        if partial {
            warn!(name = %primary, missing = ?expansion.missing, "Storing partially resolved record");
            report.unresolved.push(primary.clone());
        }
        writer
            .insert_record(primary, expansion.record.as_bytes(), partial)
            .map_err(|e| store_error(&output, e))?;
        report.records += 1;

        for alias in others {
            writer
                .insert_shadow(alias, primary)
                .map_err(|e| store_error(&output, e))?;
            report.aliases += 1;
        }
    }

    writer.write(&output).map_err(|e| store_error(&output, e))?;
    info!(
        source = %source.display(),
        output = %output.display(),
        records = report.records,
        aliases = report.aliases,
        unresolved = report.unresolved.len(),
        "Built hash store"
    );
    Ok(report)
}

fn store_error(path: &Path, source: capdb_store::StoreError) -> CapError {
    CapError::Store {
        path: path.to_path_buf(),
        source,
    }
}
