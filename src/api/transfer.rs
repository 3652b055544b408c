//! File import and export endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::import::formats::FileFormat;
use crate::import::submit::BatchReport;
use crate::import::{self, EntityKind};
use crate::state::AppState;

#[derive(Deserialize)]
struct ImportParams {
    format: FileFormat,
}

fn default_export_format() -> FileFormat {
    FileFormat::Json
}

#[derive(Deserialize)]
struct ExportParams {
    #[serde(default = "default_export_format")]
    format: FileFormat,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/import/{kind}", post(import_file))
        .route("/export/{kind}", get(export_file))
}

fn parse_kind(kind: &str) -> Result<EntityKind, AppError> {
    EntityKind::parse(kind).ok_or_else(|| AppError::BadRequest(format!("unknown collection '{}'", kind)))
}

async fn import_file(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> Result<Json<BatchReport>, AppError> {
    let kind = parse_kind(&kind)?;
    let report = import::import_file(&state.stores, kind, params.format, &body).await?;
    Ok(Json(report))
}

async fn export_file(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let kind = parse_kind(&kind)?;
    let file = import::export_kind(&state.stores, kind, params.format).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
