//! HTTP server - routes and handlers
//!
//! Wires the upload cache and the thumbnail cache to the outside world.
//! Mutating endpoints answer with the JSON [`Resp`] envelope; file
//! retrieval is delegated to a Range-capable static-file service with the
//! caching and disposition headers layered on top.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, EXPIRES, HOST, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use tower::util::ServiceExt;
use tower_http::services::ServeFile;
use tracing::error;

use crate::cache::{CacheError, FileCache};
use crate::config::SharedConfig;
use crate::http::protocol::{
    content_disposition, decode_filename, http_date, HistoryPage, Overview, PruneN, Resp,
    UploadEntry,
};
use crate::thumb::{codec, FileStore, ThumbCache};

/// Bounding box for served thumbnails.
const THUMB_WIDTH: u32 = 100;
const THUMB_HEIGHT: u32 = 100;

/// Where the thumbnail endpoint points clients when no rendition exists.
const PLACEHOLDER_THUMB: &str = "/static/file.svg";

/// Uploads per history page.
const ITEMS_PER_PAGE: usize = 50;

/// Everything the handlers need. Clones share the underlying caches.
#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FileCache>,
    pub thumbs: ThumbCache,
    pub config: SharedConfig,
}

/// Bridges the upload cache into the thumbnailer's file-store seam. The
/// thumbnail cache only ever sees this one operation.
pub struct UploadStore(pub Arc<FileCache>);

impl FileStore for UploadStore {
    fn get(&self, id: &str) -> Option<PathBuf> {
        self.0.get(id)
    }
}

/// Handler error: an HTTP status plus a message for the `{"Err": ...}`
/// body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "request failed");
        }
        (self.status, Json(Resp::err(self.message))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload/file", post(post_file))
        .route("/oops", post(remove_newest))
        .route("/list", get(get_list))
        .route("/history/:page", get(get_history_page))
        .route("/config/overview", get(get_overview))
        .route("/config/size", post(preview_size_prune))
        .route("/config/age", post(preview_age_prune))
        .route("/purge/thumbs", post(purge_thumbs))
        .route("/purge/all", post(purge_all))
        .route("/thumb/:name", get(get_thumb))
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/:filename", get(get_named_file))
        .with_state(state)
}

/// Reject the request unless it carries the configured password. With no
/// password configured everything is open.
fn check_password(config: &SharedConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = config.snapshot().password else {
        return Ok(());
    };
    let supplied = headers
        .get("X-Airlift-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if supplied.is_empty() {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "password required"));
    }
    if supplied != expected {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "incorrect password"));
    }
    Ok(())
}

/// Host to build returned URLs with: the configured one, or the
/// request's.
fn url_host(config: &SharedConfig, headers: &HeaderMap) -> String {
    let configured = config.snapshot().host;
    if !configured.is_empty() {
        return configured;
    }
    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn join_url(host: &str, tail: &str) -> String {
    if tail.is_empty() {
        host.to_string()
    } else {
        format!("{host}/{tail}")
    }
}

async fn post_file(
    State(state): State<AppState>,
    req: Request,
) -> Result<(StatusCode, Json<Resp>), ApiError> {
    check_password(&state.config, req.headers())?;

    let raw = req
        .headers()
        .get("X-Airlift-Filename")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if raw.is_empty() {
        return Err(ApiError::bad_request("missing filename header"));
    }
    let filename = decode_filename(raw)
        .map_err(|e| ApiError::bad_request(format!("bad format in filename header: {e}")))?;
    if filename.is_empty() {
        return Err(ApiError::bad_request("missing filename header"));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(ApiError::bad_request("filename may not contain path separators"));
    }

    let host = url_host(&state.config, req.headers());
    let body = req
        .into_body()
        .into_data_stream()
        .map(|chunk| chunk.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)));
    let id = state.files.put(body, &filename, &state.config).await?;

    let conf = state.config.snapshot();
    let mut tail = id.clone();
    if conf.append_ext {
        if let Some(ext) = std::path::Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
        {
            tail = format!("{id}.{ext}");
        }
    }
    Ok((
        StatusCode::CREATED,
        Json(Resp::url(join_url(&host, &tail))),
    ))
}

async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> Result<Response, ApiError> {
    serve_upload(&state, &id, false, req).await
}

async fn get_named_file(
    State(state): State<AppState>,
    Path((id, _filename)): Path<(String, String)>,
    req: Request,
) -> Result<Response, ApiError> {
    serve_upload(&state, &id, true, req).await
}

/// Serve an upload with browser-caching headers. `raw_id` may carry a
/// cosmetic extension (`/{id}.{ext}`), which is dropped before lookup.
/// The download filename is only suggested when the URL itself didn't
/// name one.
async fn serve_upload(
    state: &AppState,
    raw_id: &str,
    has_name_segment: bool,
    req: Request,
) -> Result<Response, ApiError> {
    let id = raw_id.split('.').next().unwrap_or(raw_id);
    let path = state
        .files
        .get(id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "ID not found"))?;

    let res = ServeFile::new(&path)
        .oneshot(req)
        .await
        .map_err(|e| ApiError::internal(format!("serving upload: {e}")))?;
    let mut res = res.map(Body::new);

    if !has_name_segment {
        if let Some(stat) = state.files.stat(id) {
            if let Ok(value) = HeaderValue::from_str(&content_disposition(&stat.original_name)) {
                res.headers_mut().insert(CONTENT_DISPOSITION, value);
            }
        }
    }
    let expires = Utc::now() + chrono::Duration::days(90);
    if let Ok(value) = HeaderValue::from_str(&http_date(expires)) {
        res.headers_mut().insert(EXPIRES, value);
    }
    res.headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("public"));
    Ok(res)
}

async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    check_password(&state.config, &headers)?;
    state.files.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Undo the most recent upload.
async fn remove_newest(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Resp>, ApiError> {
    check_password(&state.config, &headers)?;
    let removed = state.files.remove_newest()?;
    let host = url_host(&state.config, &headers);
    Ok(Json(Resp::url(join_url(
        &host,
        removed.as_deref().unwrap_or_default(),
    ))))
}

async fn get_thumb(
    State(state): State<AppState>,
    Path(name): Path<String>,
    req: Request,
) -> Result<Response, ApiError> {
    let Some(id) = name.strip_suffix(".jpg") else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "ID not found"));
    };

    match state.thumbs.get(id, THUMB_WIDTH, THUMB_HEIGHT).await {
        Some(path) => {
            let res = ServeFile::new(&path)
                .oneshot(req)
                .await
                .map_err(|e| ApiError::internal(format!("serving thumbnail: {e}")))?;
            Ok(res.map(Body::new))
        }
        None => Ok((
            StatusCode::FOUND,
            [(LOCATION, HeaderValue::from_static(PLACEHOLDER_THUMB))],
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

/// Newest uploads as JSON, default limit 10.
async fn get_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<UploadEntry>>, ApiError> {
    check_password(&state.config, &headers)?;
    let limit = query.limit.unwrap_or(10);
    Ok(Json(newest_first(&state, 0, limit)))
}

async fn get_history_page(
    State(state): State<AppState>,
    Path(page): Path<usize>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_password(&state.config, &headers)?;

    let total = state.files.len();
    let first_page = || {
        (
            StatusCode::SEE_OTHER,
            [(LOCATION, HeaderValue::from_static("/history/1"))],
        )
            .into_response()
    };
    if page < 1 {
        return Ok(first_page());
    }
    let offset = (page - 1) * ITEMS_PER_PAGE;
    if offset > total {
        return Ok(first_page());
    }

    let list = newest_first(&state, offset, ITEMS_PER_PAGE);
    let total_pages = total.div_ceil(ITEMS_PER_PAGE).max(1);
    let shown = list.len();
    let page_data = HistoryPage {
        list,
        current_page: page,
        total_pages,
        next_page: (total > offset + shown).then(|| page + 1),
        prev_page: (page > 1).then(|| page - 1),
        append_ext: state.config.snapshot().append_ext,
    };
    Ok(Json(page_data).into_response())
}

/// Uploads sorted newest first, `offset` in and at most `limit` out.
fn newest_first(state: &AppState, offset: usize, limit: usize) -> Vec<UploadEntry> {
    state
        .files
        .sorted_ids()
        .into_iter()
        .rev()
        .skip(offset)
        .take(limit)
        .filter_map(|id| {
            let stat = state.files.stat(&id)?;
            Some(UploadEntry {
                has_thumb: codec::format_supported(std::path::Path::new(&stat.original_name)),
                name: stat.original_name,
                uploaded: stat.mod_time.into(),
                size: stat.size,
                id,
            })
        })
        .collect()
}

async fn get_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Overview>, ApiError> {
    check_password(&state.config, &headers)?;
    let (thumbs_size, _) = state.thumbs.stats().await;
    Ok(Json(Overview {
        num_uploads: state.files.len(),
        uploads_size: state.files.size(),
        thumbs_size,
    }))
}

/// How many uploads a size limit of `n` megabytes would evict.
async fn preview_size_prune(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PruneN>,
) -> Result<Json<PruneN>, ApiError> {
    check_password(&state.config, &headers)?;
    let count = state.files.maybe_cut_to_size(body.n * 1024 * 1024);
    Ok(Json(PruneN { n: count as u64 }))
}

/// How many uploads an age limit of `n` days would prune.
async fn preview_age_prune(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PruneN>,
) -> Result<Json<PruneN>, ApiError> {
    check_password(&state.config, &headers)?;
    let cutoff = SystemTime::now() - Duration::from_secs(body.n * 24 * 60 * 60);
    let count = state.files.maybe_remove_older_than(cutoff);
    Ok(Json(PruneN { n: count as u64 }))
}

async fn purge_thumbs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    check_password(&state.config, &headers)?;
    state.thumbs.purge().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn purge_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    check_password(&state.config, &headers)?;
    state.files.purge()?;
    state.thumbs.purge().await?;
    Ok(StatusCode::NO_CONTENT)
}
