use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::RebuildService;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::BuildTrigger;
use crate::utils::cron_helper::next_run_after;

/// Drives rebuilds: once at startup, then at every cron occurrence
pub struct RefreshScheduler {
    service: Arc<RebuildService>,
    schedule: Schedule,
    timezone: Tz,
    build_on_startup: bool,
}

impl RefreshScheduler {
    pub fn new(
        service: Arc<RebuildService>,
        schedule: Schedule,
        timezone: Tz,
        build_on_startup: bool,
    ) -> Self {
        Self {
            service,
            schedule,
            timezone,
            build_on_startup,
        }
    }

    pub fn from_config(config: &Config, service: Arc<RebuildService>) -> AppResult<Self> {
        Ok(Self::new(
            service,
            config.ingestion.schedule()?,
            config.ingestion.tz()?,
            config.ingestion.build_on_startup,
        ))
    }

    /// Run until `cancel` fires. A build already in flight when cancellation
    /// arrives is allowed to finish.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Starting refresh scheduler ({} in {})",
            self.schedule, self.timezone
        );

        if self.build_on_startup {
            self.trigger(BuildTrigger::Startup).await;
        }

        loop {
            let now = Utc::now();
            let Some(next) = next_run_after(&self.schedule, &self.timezone, now) else {
                warn!("Refresh schedule has no future occurrences, scheduler stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(
                "Next scheduled rebuild at {} ({})",
                next.with_timezone(&self.timezone),
                next
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Refresh scheduler cancelled");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.trigger(BuildTrigger::Scheduled).await;
                }
            }
        }

        info!("Refresh scheduler stopped");
    }

    async fn trigger(&self, trigger: BuildTrigger) {
        match self.service.rebuild(trigger).await {
            Ok(_) => {}
            Err(AppError::OperationInProgress { .. }) => {
                info!("Skipping {} rebuild: another build is in progress", trigger);
            }
            Err(e) => {
                error!("{} rebuild failed: {}", trigger, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceResult;
    use crate::ingestor::{ChannelPoolBuilder, FailureLedger};
    use crate::models::ResetPolicy;
    use crate::proxy::{PlaylistDefinition, PlaylistRenderer, PlaylistSelection};
    use crate::sources::SourceFetcher;
    use async_trait::async_trait;
    use std::str::FromStr;
    use tempfile::TempDir;

    struct FixedFetcher;

    #[async_trait]
    impl SourceFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> SourceResult<String> {
            Ok("#EXTINF:-1,CCTV-1\nhttp://s/1.m3u8\n".to_string())
        }
    }

    fn service(dir: &TempDir) -> Arc<RebuildService> {
        let sources_path = dir.path().join("sources.txt");
        std::fs::write(&sources_path, "http://a.example/list.m3u 中国大陆\n").unwrap();

        let builder = ChannelPoolBuilder::from_config(&Config::default(), Arc::new(FixedFetcher));
        Arc::new(RebuildService::new(
            builder,
            PlaylistRenderer::default(),
            vec![PlaylistDefinition::new(
                "iptv_full",
                "full",
                PlaylistSelection::All,
            )],
            sources_path,
            dir.path().join("output"),
            FailureLedger::in_memory(ResetPolicy::ResetOnSuccess),
        ))
    }

    #[tokio::test]
    async fn test_startup_build_then_cancel() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        // Yearly schedule: nothing fires during the test
        let schedule = Schedule::from_str("0 0 4 1 1 *").unwrap();
        let scheduler = RefreshScheduler::new(
            Arc::clone(&service),
            schedule,
            chrono_tz::Asia::Shanghai,
            true,
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while service.state().last_report().await.is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let report = service.state().last_report().await.unwrap();
        assert_eq!(report.trigger, BuildTrigger::Startup);
        assert!(dir.path().join("output/iptv_full.m3u").exists());
    }

    #[tokio::test]
    async fn test_no_startup_build_when_disabled() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let scheduler = RefreshScheduler::new(
            Arc::clone(&service),
            Schedule::from_str("0 0 4 1 1 *").unwrap(),
            chrono_tz::UTC,
            false,
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        scheduler.run(cancel).await;

        assert!(service.state().last_report().await.is_none());
    }
}
