//! Persistent consecutive-failure counters
//!
//! Backing file format is one `<id>|<count>` record per line. The ledger is an
//! explicit object owned by whoever runs builds; there is no process-wide
//! state, so tests can run isolated ledgers side by side.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::AppResult;
use crate::models::ResetPolicy;
use crate::utils::write_atomic;

const RECORD_SEPARATOR: char = '|';

#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: Option<PathBuf>,
    counts: BTreeMap<String, u32>,
    reset_policy: ResetPolicy,
    /// Stream URLs each source yielded on its last successful fetch
    provenance: HashMap<String, BTreeSet<String>>,
}

/// Parse ledger text, skipping malformed lines with a warning
pub fn parse_ledger(text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((id, count)) = line.rsplit_once(RECORD_SEPARATOR) else {
            warn!(
                "Skipping malformed ledger line {}: missing '{}'",
                line_num + 1,
                RECORD_SEPARATOR
            );
            continue;
        };

        let id = id.trim();
        if id.is_empty() {
            warn!("Skipping malformed ledger line {}: empty id", line_num + 1);
            continue;
        }

        match count.trim().parse::<u32>() {
            Ok(count) => {
                counts.insert(id.to_string(), count);
            }
            Err(e) => {
                warn!(
                    "Skipping malformed ledger line {}: bad count '{}': {}",
                    line_num + 1,
                    count,
                    e
                );
            }
        }
    }

    counts
}

impl FailureLedger {
    /// An empty ledger persisted to `path`
    pub fn new<P: Into<PathBuf>>(path: P, reset_policy: ResetPolicy) -> Self {
        Self {
            path: Some(path.into()),
            counts: BTreeMap::new(),
            reset_policy,
            provenance: HashMap::new(),
        }
    }

    /// A ledger that is never written to disk
    pub fn in_memory(reset_policy: ResetPolicy) -> Self {
        Self {
            path: None,
            counts: BTreeMap::new(),
            reset_policy,
            provenance: HashMap::new(),
        }
    }

    pub fn with_counts(mut self, counts: BTreeMap<String, u32>) -> Self {
        self.counts = counts;
        self
    }

    /// Load the ledger at `path`. A missing or unreadable file yields an empty
    /// ledger; loading never fails.
    pub async fn load(path: &Path, reset_policy: ResetPolicy) -> Self {
        let counts = match tokio::fs::read_to_string(path).await {
            Ok(text) => parse_ledger(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No failure ledger at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read failure ledger {}: {} - starting fresh",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };

        info!(
            "Loaded failure ledger from {} ({} records)",
            path.display(),
            counts.len()
        );
        Self::new(path, reset_policy).with_counts(counts)
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    pub fn count(&self, id: &str) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// False once `id` has failed `limit` times in a row; unseen ids are eligible
    pub fn is_eligible(&self, id: &str, limit: u32) -> bool {
        self.count(id) < limit
    }

    /// Increment the counter for `id` by one and return the new value
    pub fn record_failure(&mut self, id: &str) -> u32 {
        let count = self.counts.entry(id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Apply the reset policy after a successful fetch
    pub fn record_success(&mut self, id: &str) {
        match self.reset_policy {
            ResetPolicy::ResetOnSuccess => {
                if self.counts.remove(id).is_some() {
                    debug!("Reset failure counter for {}", id);
                }
            }
            ResetPolicy::Never => {}
        }
    }

    /// Remember the stream URLs `source_id` yielded on a successful fetch
    pub fn remember_streams(&mut self, source_id: &str, stream_urls: BTreeSet<String>) {
        self.provenance.insert(source_id.to_string(), stream_urls);
    }

    /// Charge one failure to every stream URL `source_id` last yielded.
    /// Returns the number of stream URLs charged.
    pub fn charge_streams(&mut self, source_id: &str) -> usize {
        let Some(stream_urls) = self.provenance.get(source_id).cloned() else {
            return 0;
        };
        for url in &stream_urls {
            self.record_failure(url);
        }
        stream_urls.len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counts.clone()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// File representation, one `<id>|<count>` per line in id order
    pub fn render(&self) -> String {
        self.counts
            .iter()
            .map(|(id, count)| format!("{id}{RECORD_SEPARATOR}{count}\n"))
            .collect()
    }

    /// Rewrite the whole backing file. In-memory ledgers are a no-op.
    pub async fn persist(&self) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(path, self.render().as_bytes()).await?;
        debug!(
            "Persisted failure ledger to {} ({} records)",
            path.display(),
            self.counts.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let counts = parse_ledger(
            "http://a.example/list.m3u|2\nno separator\n|4\nhttp://b|x\n\nhttp://c|0\n",
        );
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["http://a.example/list.m3u"], 2);
        assert_eq!(counts["http://c"], 0);
    }

    #[test]
    fn test_parse_uses_last_separator() {
        let counts = parse_ledger("http://a/x?q=a|b|3\n");
        assert_eq!(counts["http://a/x?q=a|b"], 3);
    }

    #[test]
    fn test_eligibility_threshold() {
        let mut ledger = FailureLedger::in_memory(ResetPolicy::Never);
        assert!(ledger.is_eligible("s", 3));
        ledger.record_failure("s");
        ledger.record_failure("s");
        assert!(ledger.is_eligible("s", 3));
        assert_eq!(ledger.record_failure("s"), 3);
        assert!(!ledger.is_eligible("s", 3));
    }

    #[test]
    fn test_reset_policy() {
        let mut resetting = FailureLedger::in_memory(ResetPolicy::ResetOnSuccess);
        resetting.record_failure("s");
        resetting.record_success("s");
        assert_eq!(resetting.count("s"), 0);
        assert!(resetting.is_empty());

        let mut sticky = FailureLedger::in_memory(ResetPolicy::Never);
        sticky.record_failure("s");
        sticky.record_success("s");
        assert_eq!(sticky.count("s"), 1);
    }

    #[test]
    fn test_charge_streams_uses_last_provenance() {
        let mut ledger = FailureLedger::in_memory(ResetPolicy::ResetOnSuccess);
        assert_eq!(ledger.charge_streams("src"), 0);

        ledger.remember_streams(
            "src",
            ["http://s/1".to_string(), "http://s/2".to_string()].into(),
        );
        assert_eq!(ledger.charge_streams("src"), 2);
        assert_eq!(ledger.count("http://s/1"), 1);
        assert_eq!(ledger.count("http://s/2"), 1);
        assert_eq!(ledger.count("src"), 0);
    }

    #[test]
    fn test_render_format() {
        let mut ledger = FailureLedger::in_memory(ResetPolicy::Never);
        ledger.record_failure("http://b");
        ledger.record_failure("http://a");
        ledger.record_failure("http://a");
        assert_eq!(ledger.render(), "http://a|2\nhttp://b|1\n");
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fail.db");

        let mut ledger = FailureLedger::new(&path, ResetPolicy::Never);
        ledger.record_failure("http://a.example/list.m3u");
        ledger.persist().await.unwrap();

        let reloaded = FailureLedger::load(&path, ResetPolicy::Never).await;
        assert_eq!(reloaded.count("http://a.example/list.m3u"), 1);
        assert_eq!(reloaded.snapshot(), ledger.snapshot());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = FailureLedger::load(&dir.path().join("absent.db"), ResetPolicy::Never).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_load_unreadable_file_is_empty() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be read as a file
        let ledger = FailureLedger::load(dir.path(), ResetPolicy::Never).await;
        assert!(ledger.is_empty());
    }
}
