//! Resolution entry point.
//!
//! A [`Resolver`] owns the source list and per-call options; every
//! [`Resolver::resolve`] call opens its own handles and buffers and shares
//! nothing with other calls, so one resolver can serve several threads.

use crate::error::Result;
use crate::expand::{Expander, Expansion};
use crate::locate::Locator;
use crate::record::CapabilityRecord;
use crate::scanner::RecordScanner;
use capdb_config::{Settings, DEFAULT_MAX_DEPTH};
use capdb_store::{HashStore, StoreError};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-resolver options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Deepest allowed `tc` nesting; deeper chains fail with
    /// [`CapError::CycleExceeded`](crate::CapError::CycleExceeded).
    pub max_depth: usize,
    /// Consult `<source>.db` before scanning each source.
    pub use_hash_store: bool,
    /// Record consulted before any source for top-level lookups.
    pub top_record: Option<CapabilityRecord>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            use_hash_store: true,
            top_record: None,
        }
    }
}

impl ResolverOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_depth: settings.max_depth,
            use_hash_store: settings.prefer_hash_store,
            top_record: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_hash_store(mut self, enabled: bool) -> Self {
        self.use_hash_store = enabled;
        self
    }

    pub fn with_top_record(mut self, record: impl Into<CapabilityRecord>) -> Self {
        self.top_record = Some(record.into());
        self
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveStatus {
    /// Every reference resolved.
    Complete,
    /// Some referenced records were missing; their `tc=` text is still in
    /// the record.
    PartiallyUnresolved { missing: Vec<String> },
}

/// A resolved, self-contained record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: CapabilityRecord,
    pub status: ResolveStatus,
}

impl Resolution {
    /// Record length in bytes.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.status, ResolveStatus::PartiallyUnresolved { .. })
    }

    fn from_expansion(expansion: Expansion) -> Self {
        let status = if expansion.is_partial() {
            ResolveStatus::PartiallyUnresolved {
                missing: expansion.missing,
            }
        } else {
            ResolveStatus::Complete
        };
        let mut record = expansion.record;
        record.shrink();
        Self { record, status }
    }
}

/// Resolves capability records from an ordered list of sources.
#[derive(Debug, Clone)]
pub struct Resolver {
    sources: Vec<PathBuf>,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    fn expander(&self) -> Expander<'_> {
        Expander::new(
            Locator::new(&self.sources, self.options.use_hash_store),
            self.options.max_depth,
        )
    }

    /// Find `name` and expand all of its `tc` references.
    ///
    /// Returns [`CapError::NotFound`](crate::CapError::NotFound) when no source has the name, and
    /// fails fast on I/O errors and on exceeding the depth ceiling. Missing
    /// ancestors are not an error: the result is flagged
    /// [`ResolveStatus::PartiallyUnresolved`].
    pub fn resolve(&self, name: &str) -> Result<Resolution> {
        let expander = self.expander();

        let expansion = match &self.options.top_record {
            Some(top) if top.matches(name) => {
                debug!(name, "Using top-level override record");
                expander.expand(top.clone())?
            }
            _ => expander.resolve(name)?,
        };

        let resolution = Resolution::from_expansion(expansion);
        match &resolution.status {
            ResolveStatus::Complete => {
                debug!(name, bytes = resolution.len(), "Resolved");
            }
            ResolveStatus::PartiallyUnresolved { missing } => {
                warn!(name, missing = ?missing, "Resolved with unresolved references");
            }
        }
        Ok(resolution)
    }

    /// The first name of every record across all sources, in source order.
    ///
    /// A name seen in an earlier source hides later records with the same
    /// first name. Sources that cannot be opened are skipped.
    pub fn names(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for path in &self.sources {
            for name in self.source_names(path)? {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        info!(sources = self.sources.len(), records = names.len(), "Listed records");
        Ok(names)
    }

    fn source_names(&self, path: &Path) -> Result<Vec<String>> {
        if self.options.use_hash_store {
            match HashStore::open_for_source(path) {
                Ok(store) => return Ok(store.primary_keys()),
                Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(source = %path.display(), error = %e, "Unusable hash store"),
            }
        }
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!(source = %path.display(), error = %e, "Skipping unopenable source");
                return Ok(Vec::new());
            }
        };
        let mut scanner = RecordScanner::new(file, path);
        let mut names = Vec::new();
        while let Some(record) = scanner.next_record()? {
            names.push(record.primary_name());
        }
        Ok(names)
    }
}

/// Resolve `name` against `sources` with default options.
pub fn resolve(sources: &[PathBuf], name: &str) -> Result<Resolution> {
    Resolver::new(sources.iter().cloned()).resolve(name)
}
