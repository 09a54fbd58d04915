use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::ingestor::BuildStats;
use crate::models::BuildTrigger;
use crate::proxy::WrittenPlaylist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    Building,
}

/// The build currently holding the single-flight slot
#[derive(Debug, Clone, Serialize)]
pub struct ActiveBuild {
    pub id: Uuid,
    pub trigger: BuildTrigger,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub group: String,
    pub name: String,
    pub url_count: usize,
}

/// Summary of the last successful rebuild
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub id: Uuid,
    pub trigger: BuildTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stats: BuildStats,
    pub channels: Vec<ChannelStatus>,
    pub playlists: Vec<WrittenPlaylist>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildFailure {
    pub id: Uuid,
    pub trigger: BuildTrigger,
    pub started_at: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildStatus {
    pub state: BuildState,
    pub current: Option<ActiveBuild>,
    pub last_report: Option<BuildReport>,
    pub last_error: Option<BuildFailure>,
    pub builds_completed: u64,
    pub builds_failed: u64,
}

#[derive(Debug, Default)]
struct StateInner {
    current: Option<ActiveBuild>,
    last_report: Option<BuildReport>,
    last_error: Option<BuildFailure>,
    builds_completed: u64,
    builds_failed: u64,
}

/// Tracks `Idle | Building` and the outcome of the most recent builds.
///
/// Only one build may hold the slot at a time; [`try_begin`](Self::try_begin)
/// refuses a second one instead of queueing it.
#[derive(Clone, Default)]
pub struct BuildStateManager {
    inner: Arc<RwLock<StateInner>>,
}

impl BuildStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the build slot, or fail with `OperationInProgress`
    pub async fn try_begin(&self, trigger: BuildTrigger) -> AppResult<ActiveBuild> {
        let mut inner = self.inner.write().await;

        if let Some(current) = &inner.current {
            return Err(AppError::operation_in_progress(
                "rebuild",
                format!("build {} ({})", current.id, current.trigger),
            ));
        }

        let active = ActiveBuild {
            id: Uuid::new_v4(),
            trigger,
            started_at: Utc::now(),
        };
        inner.current = Some(active.clone());
        Ok(active)
    }

    /// Release the slot and record a successful build
    pub async fn complete(&self, report: BuildReport) {
        let mut inner = self.inner.write().await;
        inner.current = None;
        inner.builds_completed += 1;
        inner.last_report = Some(report);
    }

    /// Release the slot and record a failed build. The previous report is kept.
    pub async fn fail(&self, active: &ActiveBuild, error: String) {
        let mut inner = self.inner.write().await;
        inner.current = None;
        inner.builds_failed += 1;
        inner.last_error = Some(BuildFailure {
            id: active.id,
            trigger: active.trigger,
            started_at: active.started_at,
            failed_at: Utc::now(),
            error,
        });
    }

    pub async fn is_building(&self) -> bool {
        self.inner.read().await.current.is_some()
    }

    pub async fn last_report(&self) -> Option<BuildReport> {
        self.inner.read().await.last_report.clone()
    }

    pub async fn status(&self) -> BuildStatus {
        let inner = self.inner.read().await;
        BuildStatus {
            state: if inner.current.is_some() {
                BuildState::Building
            } else {
                BuildState::Idle
            },
            current: inner.current.clone(),
            last_report: inner.last_report.clone(),
            last_error: inner.last_error.clone(),
            builds_completed: inner.builds_completed,
            builds_failed: inner.builds_failed,
        }
    }
}
