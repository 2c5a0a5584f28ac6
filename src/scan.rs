//! Catalog scans: sources feed the parser, off the main control flow.

use crate::catalog::CatalogSnapshot;
use crate::descriptor::DescriptorParser;
use crate::model::{Domain, ItemRecord};
use crate::sources::Source;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub parsed: usize,
    pub reused: usize,
    pub not_applicable: usize,
    pub malformed: usize,
}

#[derive(Debug, Default)]
pub struct ScanResults {
    pub records: Vec<ItemRecord>,
    pub directories: Vec<PathBuf>,
    pub stats: ScanStats,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub domain: Domain,
    pub generation: u64,
    pub results: ScanResults,
}

/// Shared flag telling a running scan to give up.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one scan needs, detached from the registry that created it.
pub struct ScanJob {
    domain: Domain,
    generation: u64,
    sources: Vec<Arc<dyn Source>>,
    parser: DescriptorParser,
    previous: CatalogSnapshot,
    cancel: CancelToken,
}

impl ScanJob {
    pub fn new(
        domain: Domain,
        generation: u64,
        sources: Vec<Arc<dyn Source>>,
        parser: DescriptorParser,
        previous: CatalogSnapshot,
        cancel: CancelToken,
    ) -> Self {
        Self {
            domain,
            generation,
            sources,
            parser,
            previous,
            cancel,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Runs the scan to completion; `None` if it was cancelled on the way.
    pub fn run(self) -> Option<ScanOutcome> {
        let mut results = ScanResults::default();
        let mut keys = HashSet::new();

        for source in &self.sources {
            if self.cancel.is_cancelled() {
                return self.abandoned();
            }

            let discovery = match source.discover() {
                Ok(discovery) => discovery,
                Err(e) => {
                    warn!("{} source {} failed: {:#}", self.domain, source.name(), e);
                    continue;
                }
            };
            results.directories.extend(discovery.directories);

            for location in discovery.locations {
                if self.cancel.is_cancelled() {
                    return self.abandoned();
                }
                if !keys.insert(location.key.clone()) {
                    debug!("{:?} shadowed by an earlier {}", location.path, location.key);
                    continue;
                }

                if source.reuses_seen() {
                    if let Some(seen) = self.previous.get(&location.key).filter(|r| r.source == location.path) {
                        results.stats.reused += 1;
                        results.records.push(seen.clone());
                        continue;
                    }
                }

                match self.parser.parse_file(self.domain, &location.key, &location.path) {
                    Ok(record) => {
                        results.stats.parsed += 1;
                        results.records.push(record);
                    }
                    Err(e) if e.is_not_applicable() => {
                        debug!("Skipping {:?}: {}", location.path, e);
                        results.stats.not_applicable += 1;
                    }
                    Err(e) => {
                        warn!("Skipping malformed descriptor {:?}: {}", location.path, e);
                        results.stats.malformed += 1;
                    }
                }
            }
        }

        info!(
            "{} scan #{}: {} items ({} parsed, {} reused, {} not applicable, {} malformed)",
            self.domain,
            self.generation,
            results.records.len(),
            results.stats.parsed,
            results.stats.reused,
            results.stats.not_applicable,
            results.stats.malformed
        );
        Some(ScanOutcome {
            domain: self.domain,
            generation: self.generation,
            results,
        })
    }

    fn abandoned(&self) -> Option<ScanOutcome> {
        info!("{} scan #{} abandoned", self.domain, self.generation);
        None
    }
}

/// Runs `job` on its own thread and hands the outcome back through `tx`.
pub fn spawn(job: ScanJob, tx: calloop::channel::Sender<ScanOutcome>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("scan-{}", job.domain()))
        .spawn(move || {
            if let Some(outcome) = job.run() {
                if tx.send(outcome).is_err() {
                    debug!("Scan result dropped, event loop is gone");
                }
            }
        })
}
