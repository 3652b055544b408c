use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::access_codes::{
    AccessCodeView, BulkActivationReport, BulkDeleteReport, EditRequest, IssueRequest, edit_code,
    issue_codes, tracker,
};
use crate::error::AppError;
use crate::state::AppState;
use crate::views::{CheckState, Selection};

#[derive(Deserialize)]
struct BulkActiveRequest {
    ids: Vec<String>,
    active: bool,
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

/// Checkbox state of the code list: the current selection plus at most one
/// row toggle and one header-checkbox change.
#[derive(Deserialize)]
struct SelectionRequest {
    #[serde(default)]
    selected: Vec<String>,
    toggle: Option<String>,
    select_all: Option<bool>,
}

#[derive(Serialize)]
struct SelectionResponse {
    selected: Vec<String>,
    state: CheckState,
}

#[derive(Deserialize)]
struct RedeemRequest {
    encoded_value: String,
    user_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/access-codes", get(list_codes).post(issue))
        .route("/access-codes/{id}", put(edit).delete(remove))
        .route("/access-codes/{id}/toggle", post(toggle))
        .route("/access-codes/bulk/active", post(bulk_active))
        .route("/access-codes/bulk/delete", post(bulk_delete))
        .route("/access-codes/selection", post(selection))
        .route("/access-codes/redeem", post(redeem))
}

async fn list_codes(State(state): State<AppState>) -> Result<Json<Vec<AccessCodeView>>, AppError> {
    let codes = state.stores.access_codes.fetch_all().await?;
    Ok(Json(codes.into_iter().map(AccessCodeView::from).collect()))
}

async fn issue(
    State(state): State<AppState>,
    Json(req): Json<IssueRequest>,
) -> Result<(StatusCode, Json<Vec<AccessCodeView>>), AppError> {
    let codes = issue_codes(&state.stores, &req, state.config.max_codes_per_issue).await?;
    Ok((
        StatusCode::CREATED,
        Json(codes.into_iter().map(AccessCodeView::from).collect()),
    ))
}

async fn edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditRequest>,
) -> Result<Json<AccessCodeView>, AppError> {
    let code = edit_code(&state.stores, &id, &req).await?;
    Ok(Json(code.into()))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.stores.access_codes.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccessCodeView>, AppError> {
    let code = tracker::toggle(state.stores.access_codes.as_ref(), &id).await?;
    Ok(Json(code.into()))
}

async fn bulk_active(
    State(state): State<AppState>,
    Json(req): Json<BulkActiveRequest>,
) -> Result<Json<BulkActivationReport>, AppError> {
    let selection = Selection::from_ids(req.ids);
    let report =
        tracker::bulk_set_active(state.stores.access_codes.as_ref(), selection.ids(), req.active)
            .await?;
    Ok(Json(report))
}

async fn bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteReport>, AppError> {
    let selection = Selection::from_ids(req.ids);
    let report = tracker::bulk_delete(state.stores.access_codes.as_ref(), selection.ids()).await?;
    Ok(Json(report))
}

async fn selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let visible: Vec<String> = state
        .stores
        .access_codes
        .fetch_all()
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut selection = Selection::from_ids(req.selected).retain_visible(&visible);
    if let Some(id) = req.toggle {
        selection = selection.with_toggled(&id).retain_visible(&visible);
    }
    if let Some(all) = req.select_all {
        selection = selection.with_all(&visible, all);
    }

    Ok(Json(SelectionResponse {
        state: selection.state(&visible),
        selected: selection.ids().to_vec(),
    }))
}

async fn redeem(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<AccessCodeView>, AppError> {
    if req.encoded_value.trim().is_empty() || req.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("encoded_value and user_id are required".to_string()));
    }
    let code = tracker::redeem(
        state.stores.access_codes.as_ref(),
        req.encoded_value.trim(),
        req.user_id.trim(),
        Utc::now(),
    )
    .await?;
    Ok(Json(code.into()))
}
