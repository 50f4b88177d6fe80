use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use common::{AlbumUnit, Bitrate, NamingMode};
use library::BatchScheduler;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: BatchScheduler,
    pub config_path: PathBuf,
    pub config: Arc<RwLock<ServerConfig>>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct LoadResponse {
    pub albums: usize,
}

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Serialize)]
pub struct OptionsResponse {
    pub bitrates: Vec<Bitrate>,
    pub bitrate: Bitrate,
    pub naming_mode: NamingMode,
    pub input_root: String,
    pub output_root: String,
}

/// Empty fields fall back to the configured value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoadRequest {
    pub input_root: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub output_root: Option<String>,
    pub bitrate: Option<Bitrate>,
    pub naming_mode: Option<NamingMode>,
}

#[derive(Debug, Deserialize)]
pub struct GapRequest {
    pub artist: String,
    pub album: String,
    pub gap: bool,
}

#[derive(Debug, Deserialize)]
pub struct AllGapsRequest {
    pub gap: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub albums: Vec<AlbumUnit>,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
