use std::path::PathBuf;

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use common::{AlbumUnit, Bitrate};
use library::{BatchOptions, BatchSnapshot};
use tracing::error;

use crate::config::{resolve_dir, resolve_path};
use crate::state::{
    AllGapsRequest, AppState, GapRequest, JsonResult, LoadRequest, LoadResponse,
    OptionsResponse, RemoveRequest, RemovedResponse, StartRequest,
};
use crate::utils::{batch_error, json_error};

pub async fn get_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    let config = state.config.read();
    Json(OptionsResponse {
        bitrates: Bitrate::ALL.to_vec(),
        bitrate: config.bitrate,
        naming_mode: config.naming_mode,
        input_root: config.input_root.clone(),
        output_root: config.output_root.clone(),
    })
}

pub async fn get_batch(State(state): State<AppState>) -> Json<BatchSnapshot> {
    Json(state.scheduler.snapshot())
}

pub async fn load(
    State(state): State<AppState>,
    Json(payload): Json<LoadRequest>,
) -> JsonResult<LoadResponse> {
    let root = requested_dir(&state, payload.input_root.as_deref(), |c| &c.input_root)
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "input_root is required"))?;

    let scheduler = state.scheduler.clone();
    let result = tokio::task::spawn_blocking(move || scheduler.load_albums(&root)).await;
    match result {
        Ok(Ok(albums)) => Ok(Json(LoadResponse { albums })),
        Ok(Err(err)) => Err(batch_error(err)),
        Err(err) => {
            error!("Album discovery task failed: {}", err);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "album discovery failed",
            ))
        }
    }
}

pub async fn start(
    State(state): State<AppState>,
    Json(payload): Json<StartRequest>,
) -> JsonResult<BatchSnapshot> {
    let output_root = requested_dir(&state, payload.output_root.as_deref(), |c| &c.output_root)
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "output_root is required"))?;
    let (bitrate, naming) = {
        let config = state.config.read();
        (
            payload.bitrate.unwrap_or(config.bitrate),
            payload.naming_mode.unwrap_or(config.naming_mode),
        )
    };

    state
        .scheduler
        .start(BatchOptions {
            output_root,
            bitrate,
            naming,
        })
        .map_err(batch_error)?;
    Ok(Json(state.scheduler.snapshot()))
}

pub async fn cancel_current(State(state): State<AppState>) -> Json<BatchSnapshot> {
    state.scheduler.cancel_current();
    Json(state.scheduler.snapshot())
}

pub async fn cancel_all(State(state): State<AppState>) -> Json<BatchSnapshot> {
    state.scheduler.cancel_all();
    Json(state.scheduler.snapshot())
}

pub async fn remove_one(
    State(state): State<AppState>,
    AxumPath((artist, album)): AxumPath<(String, String)>,
) -> JsonResult<RemovedResponse> {
    if state.scheduler.remove_pending(&AlbumUnit::new(artist, album)) {
        Ok(Json(RemovedResponse { removed: 1 }))
    } else {
        Err(json_error(StatusCode::NOT_FOUND, "album not pending"))
    }
}

pub async fn remove_many(
    State(state): State<AppState>,
    Json(payload): Json<RemoveRequest>,
) -> Json<RemovedResponse> {
    let removed = state.scheduler.remove_pending_many(&payload.albums);
    Json(RemovedResponse { removed })
}

pub async fn set_gap(
    State(state): State<AppState>,
    Json(payload): Json<GapRequest>,
) -> JsonResult<()> {
    let unit = AlbumUnit::new(payload.artist, payload.album);
    if state.scheduler.set_gap(&unit, payload.gap) {
        Ok(Json(()))
    } else {
        Err(json_error(StatusCode::NOT_FOUND, "album not pending"))
    }
}

pub async fn set_all_gaps(
    State(state): State<AppState>,
    Json(payload): Json<AllGapsRequest>,
) -> Json<()> {
    state.scheduler.set_all_gaps(payload.gap);
    Json(())
}

/// The request's directory if given, otherwise the configured one.
fn requested_dir(
    state: &AppState,
    requested: Option<&str>,
    configured: impl Fn(&crate::config::ServerConfig) -> &String,
) -> Option<PathBuf> {
    match requested.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Some(resolve_path(&state.config_path, value)),
        None => resolve_dir(&state.config_path, configured(&state.config.read())),
    }
}
