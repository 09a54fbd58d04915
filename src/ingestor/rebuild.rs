//! One full refresh cycle: sources → pool → rendered playlists on disk

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::state_manager::{ActiveBuild, BuildReport, BuildStateManager, ChannelStatus};
use super::{ChannelPoolBuilder, FailureLedger};
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::BuildTrigger;
use crate::proxy::{PlaylistDefinition, PlaylistRenderer, write_playlists};
use crate::sources::{SourceFetcher, load_sources};

/// Owns everything a rebuild touches and enforces single-flight through
/// [`BuildStateManager`]
pub struct RebuildService {
    builder: ChannelPoolBuilder,
    renderer: PlaylistRenderer,
    playlists: Vec<PlaylistDefinition>,
    sources_path: PathBuf,
    output_dir: PathBuf,
    ledger: Mutex<FailureLedger>,
    state: BuildStateManager,
}

impl RebuildService {
    pub fn new(
        builder: ChannelPoolBuilder,
        renderer: PlaylistRenderer,
        playlists: Vec<PlaylistDefinition>,
        sources_path: PathBuf,
        output_dir: PathBuf,
        ledger: FailureLedger,
    ) -> Self {
        Self {
            builder,
            renderer,
            playlists,
            sources_path,
            output_dir,
            ledger: Mutex::new(ledger),
            state: BuildStateManager::new(),
        }
    }

    /// Wire the service from configuration, loading the ledger from disk
    pub async fn from_config(config: &Config, fetcher: Arc<dyn SourceFetcher>) -> AppResult<Self> {
        let ledger = FailureLedger::load(
            &config.storage.failure_ledger_path,
            config.ingestion.reset_policy,
        )
        .await;

        Ok(Self::new(
            ChannelPoolBuilder::from_config(config, fetcher),
            PlaylistRenderer::from_config(&config.ordering)?,
            PlaylistDefinition::from_configs(&config.playlists)?,
            config.storage.sources_path.clone(),
            config.storage.output_path.clone(),
            ledger,
        ))
    }

    pub fn state(&self) -> &BuildStateManager {
        &self.state
    }

    pub fn playlists(&self) -> &[PlaylistDefinition] {
        &self.playlists
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn ledger_snapshot(&self) -> BTreeMap<String, u32> {
        self.ledger.lock().await.snapshot()
    }

    /// Run a rebuild to completion. Fails with `OperationInProgress` if another
    /// build holds the slot.
    pub async fn rebuild(&self, trigger: BuildTrigger) -> AppResult<BuildReport> {
        let active = self.state.try_begin(trigger).await?;
        self.finish(active).await
    }

    /// Claim the build slot now and run the rebuild on a background task
    pub async fn start_background(self: &Arc<Self>, trigger: BuildTrigger) -> AppResult<ActiveBuild> {
        let active = self.state.try_begin(trigger).await?;
        let service = Arc::clone(self);
        let task_active = active.clone();
        // `finish` records its own outcome in the build state
        let task = tokio::spawn(async move { service.finish(task_active).await });

        let state = self.state.clone();
        let watched = active.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!("Rebuild {} aborted: {}", watched.id, e);
                state.fail(&watched, format!("build task aborted: {e}")).await;
            }
        });
        Ok(active)
    }

    async fn finish(&self, active: ActiveBuild) -> AppResult<BuildReport> {
        info!("Starting rebuild {} (trigger: {})", active.id, active.trigger);

        match self.execute(&active).await {
            Ok(report) => {
                info!(
                    "Rebuild {} finished in {}ms: {} channels, {} playlists",
                    report.id,
                    report.duration_ms,
                    report.channels.len(),
                    report.playlists.len()
                );
                self.state.complete(report.clone()).await;
                Ok(report)
            }
            Err(e) => {
                error!("Rebuild {} failed: {}", active.id, e);
                self.state.fail(&active, e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, active: &ActiveBuild) -> AppResult<BuildReport> {
        let sources = load_sources(&self.sources_path).await?;
        if sources.is_empty() {
            warn!("No sources configured in {}", self.sources_path.display());
        }

        // The ledger lock is never held across fetches; the build slot keeps
        // this copy the only writer until it is swapped back
        let mut ledger = self.ledger.lock().await.clone();
        let outcome = self.builder.build(&sources, &mut ledger).await;
        *self.ledger.lock().await = ledger;
        let outcome = outcome?;

        let rendered: Vec<_> = self
            .playlists
            .iter()
            .map(|definition| {
                (
                    definition.clone(),
                    self.renderer.render(&outcome.pool, &definition.selection),
                )
            })
            .collect();
        let playlists = write_playlists(&self.output_dir, &rendered).await?;

        let channels = outcome
            .pool
            .channels()
            .map(|channel| ChannelStatus {
                group: channel.group.label(),
                name: channel.name.clone(),
                url_count: channel.urls.len(),
            })
            .collect();

        let finished_at = Utc::now();
        Ok(BuildReport {
            id: active.id,
            trigger: active.trigger,
            started_at: active.started_at,
            finished_at,
            duration_ms: (finished_at - active.started_at)
                .num_milliseconds()
                .max(0) as u64,
            stats: outcome.stats,
            channels,
            playlists,
        })
    }
}
