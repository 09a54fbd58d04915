use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::ingestor::state_manager::BuildStatus;
use crate::models::BuildTrigger;
use crate::proxy::{PlaylistFormat, PlaylistSelection};
use crate::web::{
    AppState,
    responses::{ApiResponse, handle_error, with_status},
};

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub build_id: Uuid,
    pub trigger: BuildTrigger,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistInfo {
    pub name: String,
    pub routes: Vec<String>,
    /// Empty when the playlist selects every group
    pub groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub build: BuildStatus,
    pub failure_ledger: BTreeMap<String, u32>,
    pub playlists: Vec<PlaylistInfo>,
}

/// Start a manual rebuild in the background
pub async fn trigger_refresh(State(state): State<AppState>) -> Response {
    match state.rebuild.start_background(BuildTrigger::Manual).await {
        Ok(active) => with_status(
            StatusCode::ACCEPTED,
            RefreshAccepted {
                build_id: active.id,
                trigger: active.trigger,
                started_at: active.started_at,
            },
        ),
        Err(e) => handle_error(e),
    }
}

/// Build state, last report with per-channel URL counts, and the failure ledger
pub async fn build_status(State(state): State<AppState>) -> impl IntoResponse {
    let playlists = state
        .rebuild
        .playlists()
        .iter()
        .map(|definition| PlaylistInfo {
            name: definition.name.clone(),
            routes: PlaylistFormat::ALL
                .iter()
                .map(|f| format!("/{}.{}", definition.route, f.extension()))
                .collect(),
            groups: match &definition.selection {
                PlaylistSelection::All => Vec::new(),
                PlaylistSelection::Groups(groups) => groups.iter().map(|g| g.label()).collect(),
            },
        })
        .collect();

    ApiResponse::success(StatusResponse {
        build: state.rebuild.state().status().await,
        failure_ledger: state.rebuild.ledger_snapshot().await,
        playlists,
    })
}
