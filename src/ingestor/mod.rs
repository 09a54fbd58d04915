//! Channel pool construction
//!
//! [`ChannelPoolBuilder`] runs every configured source through
//! fetch → parse → filter → classify → normalize and merges the survivors into
//! one [`ChannelPool`]. Orchestration of a whole refresh cycle (ledger
//! ownership, rendering, build state) lives in [`rebuild`].

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data_mapping::{Classifier, NameNormalizer};
use crate::errors::AppResult;
use crate::models::{ChannelPool, FailureGranularity, RawEntry, Source};
use crate::proxy::ContentFilter;
use crate::sources::{SourceFetcher, parse_playlist};

pub mod failure_ledger;
pub mod rebuild;
pub mod scheduler;
pub mod state_manager;

pub use failure_ledger::FailureLedger;
pub use rebuild::RebuildService;
pub use scheduler::RefreshScheduler;
pub use state_manager::{BuildReport, BuildState, BuildStateManager};

/// Counters describing one pool build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub sources_total: usize,
    pub sources_attempted: usize,
    /// Sources not fetched because their failure counter reached the limit
    pub sources_skipped: usize,
    pub sources_failed: usize,
    pub entries_parsed: usize,
    pub entries_blocked: usize,
    pub entries_unclassified: usize,
    /// Entries dropped because their stream URL reached the failure limit
    pub entries_circuit_open: usize,
    /// URLs that were new for their channel
    pub urls_merged: usize,
    pub duplicate_urls: usize,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub pool: ChannelPool,
    pub stats: BuildStats,
}

pub struct ChannelPoolBuilder {
    fetcher: Arc<dyn SourceFetcher>,
    filter: ContentFilter,
    classifier: Classifier,
    normalizer: NameNormalizer,
    failure_limit: u32,
    granularity: FailureGranularity,
    max_concurrent_fetches: usize,
}

impl ChannelPoolBuilder {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        filter: ContentFilter,
        classifier: Classifier,
        normalizer: NameNormalizer,
        failure_limit: u32,
    ) -> Self {
        Self {
            fetcher,
            filter,
            classifier,
            normalizer,
            failure_limit,
            granularity: FailureGranularity::default(),
            max_concurrent_fetches: 1,
        }
    }

    /// Builder wired from service configuration with the built-in classifier
    pub fn from_config(config: &Config, fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self::new(
            fetcher,
            ContentFilter::new(&config.filter.blocked_keywords),
            Classifier::builtin(),
            NameNormalizer::default(),
            config.ingestion.failure_limit,
        )
        .with_granularity(config.ingestion.failure_granularity)
        .with_max_concurrent_fetches(config.ingestion.max_concurrent_fetches)
    }

    pub fn with_granularity(mut self, granularity: FailureGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_concurrent_fetches.max(1);
        self
    }

    pub fn failure_limit(&self) -> u32 {
        self.failure_limit
    }

    pub fn granularity(&self) -> FailureGranularity {
        self.granularity
    }

    /// Build a fresh pool from `sources`, updating and then persisting `ledger`.
    ///
    /// Fetch failures are absorbed: they cost the source one ledger failure and
    /// its channels for this build. Only a ledger write failure is returned.
    pub async fn build(
        &self,
        sources: &[Source],
        ledger: &mut FailureLedger,
    ) -> AppResult<BuildOutcome> {
        let start_time = Instant::now();
        let mut stats = BuildStats {
            sources_total: sources.len(),
            ..Default::default()
        };

        // Gate on the ledger as it stood before this build started
        let gate = ledger.snapshot();
        let is_open = |id: &str| gate.get(id).copied().unwrap_or(0) >= self.failure_limit;

        let mut eligible = Vec::with_capacity(sources.len());
        for source in sources {
            if self.granularity == FailureGranularity::PerSource && is_open(&source.url) {
                info!(
                    "Skipping source {} ({} consecutive failures, limit {})",
                    source.url,
                    ledger.count(&source.url),
                    self.failure_limit
                );
                stats.sources_skipped += 1;
                continue;
            }
            eligible.push(source.clone());
        }
        stats.sources_attempted = eligible.len();

        info!(
            "Building channel pool from {} sources ({} skipped, up to {} concurrent fetches)",
            stats.sources_attempted, stats.sources_skipped, self.max_concurrent_fetches
        );

        let mut pool = ChannelPool::new();
        // `buffered` yields in source order, so merging below is deterministic
        let mut fetches = stream::iter(eligible)
            .map(|source| {
                let fetcher = Arc::clone(&self.fetcher);
                async move {
                    let result = fetcher.fetch(&source.url).await;
                    (source, result)
                }
            })
            .buffered(self.max_concurrent_fetches);

        while let Some((source, result)) = fetches.next().await {
            let text = match result {
                Ok(text) => text,
                Err(e) => {
                    stats.sources_failed += 1;
                    match self.granularity {
                        FailureGranularity::PerSource => {
                            let count = ledger.record_failure(&source.url);
                            warn!("Source {} failed ({} consecutive): {}", source.url, count, e);
                        }
                        FailureGranularity::PerStreamUrl => {
                            let charged = ledger.charge_streams(&source.url);
                            warn!(
                                "Source {} failed, charged {} stream URLs: {}",
                                source.url, charged, e
                            );
                        }
                    }
                    continue;
                }
            };

            let entries = parse_playlist(&text);
            debug!("Parsed {} entries from {}", entries.len(), source.url);
            stats.entries_parsed += entries.len();

            match self.granularity {
                FailureGranularity::PerSource => ledger.record_success(&source.url),
                FailureGranularity::PerStreamUrl => {
                    let yielded: BTreeSet<String> =
                        entries.iter().map(|e| e.stream_url.clone()).collect();
                    // Streams gated out this build keep their count
                    for url in yielded.iter().filter(|url| !is_open(url.as_str())) {
                        ledger.record_success(url);
                    }
                    ledger.remember_streams(&source.url, yielded);
                }
            }

            for entry in entries {
                if self.granularity == FailureGranularity::PerStreamUrl
                    && is_open(&entry.stream_url)
                {
                    stats.entries_circuit_open += 1;
                    continue;
                }
                self.merge_entry(&mut pool, &mut stats, &source, entry);
            }
        }

        ledger.persist().await?;

        info!(
            "Built channel pool in {:?}: {} channels, {} URLs ({} of {} sources failed)",
            start_time.elapsed(),
            pool.len(),
            pool.url_count(),
            stats.sources_failed,
            stats.sources_attempted
        );

        Ok(BuildOutcome { pool, stats })
    }

    fn merge_entry(
        &self,
        pool: &mut ChannelPool,
        stats: &mut BuildStats,
        source: &Source,
        entry: RawEntry,
    ) {
        if self.filter.is_blocked(&entry.display_name, &entry.stream_url) {
            stats.entries_blocked += 1;
            return;
        }

        let Some(group) = self.classifier.classify(&source.region, &entry.display_name) else {
            stats.entries_unclassified += 1;
            return;
        };

        let name = self.normalizer.normalize(&entry.display_name);
        if pool.upsert(group, name, &entry.stream_url) {
            stats.urls_merged += 1;
        } else {
            stats.duplicate_urls += 1;
        }
    }
}
