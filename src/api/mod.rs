mod access_codes;
mod resources;
mod transfer;

use std::collections::BTreeSet;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Exam, NewsArticle, Question, Subject, Tag, UserProfile};
use crate::state::AppState;
use crate::views::{self, TagCount};

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/tags/counts", get(tag_counts))
        .route("/questions/by-tags", get(questions_by_tags))
        .merge(resources::routes::<Subject>("/subjects"))
        .merge(resources::routes::<Tag>("/tags"))
        .merge(resources::routes::<Question>("/questions"))
        .merge(resources::routes::<Exam>("/exams"))
        .merge(resources::routes::<NewsArticle>("/news"))
        .merge(resources::routes::<UserProfile>("/users"))
        .merge(access_codes::routes())
        .merge(transfer::routes())
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    match &state.db {
        Some(db) => {
            sqlx::query("select 1").execute(db).await?;
        }
        None => {
            state.stores.tags.fetch_all().await?;
        }
    }
    Ok(StatusCode::OK)
}

async fn tag_counts(State(state): State<AppState>) -> Result<Json<Vec<TagCount>>, AppError> {
    let (tags, questions) = tokio::try_join!(
        state.stores.tags.fetch_all(),
        state.stores.questions.fetch_all()
    )?;
    Ok(Json(views::tag_counts(&tags, &questions)))
}

#[derive(Deserialize)]
struct TagFilter {
    /// Comma-separated tag ids; a question must carry all of them.
    #[serde(default)]
    tags: String,
}

async fn questions_by_tags(
    State(state): State<AppState>,
    Query(filter): Query<TagFilter>,
) -> Result<Json<Vec<Question>>, AppError> {
    let selected: BTreeSet<String> = filter
        .tags
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();

    let questions = state.stores.questions.fetch_all().await?;
    let matching = views::filter_by_tags(&questions, &selected)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(matching))
}
