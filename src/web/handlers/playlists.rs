use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::models::BuildTrigger;
use crate::proxy::{PlaylistDefinition, PlaylistFormat};
use crate::web::{AppState, responses::error_with_status};

/// Serve the last published rendering of `definition`.
///
/// Before the first successful build the file does not exist; that yields
/// `503` and, when enabled, starts a background build.
pub async fn serve_playlist(
    state: AppState,
    definition: PlaylistDefinition,
    format: PlaylistFormat,
) -> Response {
    let path = definition.path(state.rebuild.output_dir(), format);

    match tokio::fs::read(&path).await {
        Ok(content) => {
            debug!("Serving {} ({} bytes)", path.display(), content.len());
            (
                [
                    (header::CONTENT_TYPE, format.content_type()),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                content,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if state.build_on_missing_output {
                request_missing_output_build(&state).await;
            }
            let mut response = error_with_status(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Playlist '{}' has not been built yet", definition.name),
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from_static("30"));
            response
        }
        Err(e) => {
            error!("Failed to read playlist {}: {}", path.display(), e);
            error_with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read playlist '{}'", definition.name),
            )
        }
    }
}

async fn request_missing_output_build(state: &AppState) {
    match state
        .rebuild
        .start_background(BuildTrigger::MissingOutput)
        .await
    {
        Ok(active) => info!("Started build {} for missing playlist output", active.id),
        Err(AppError::OperationInProgress { .. }) => {
            debug!("Playlist output missing, build already in progress")
        }
        Err(e) => error!("Failed to start build for missing output: {}", e),
    }
}
