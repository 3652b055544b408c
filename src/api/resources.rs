//! CRUD endpoints shared by every entity except access codes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Exam, NewsArticle, Question, Subject, Tag, UserProfile, Validate};
use crate::state::AppState;
use crate::store::{EntityStore, Record, Stores};

#[async_trait]
pub trait Resource: Record + Validate + Serialize + DeserializeOwned {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>>;

    /// Checks the body and fills derived fields before it is written.
    async fn prepare(&mut self, _stores: &Stores) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

async fn known_subject(stores: &Stores, subject_id: &str) -> Result<Subject, AppError> {
    stores
        .subjects
        .find(subject_id)
        .await?
        .ok_or_else(|| AppError::Validation(format!("unknown subject '{}'", subject_id)))
}

#[async_trait]
impl Resource for Subject {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.subjects
    }
}

#[async_trait]
impl Resource for Tag {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.tags
    }
}

#[async_trait]
impl Resource for Question {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.questions
    }

    async fn prepare(&mut self, stores: &Stores) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        known_subject(stores, &self.subject_id).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for Exam {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.exams
    }

    async fn prepare(&mut self, stores: &Stores) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.subject_name = known_subject(stores, &self.subject_id).await?.name;
        Ok(())
    }
}

#[async_trait]
impl Resource for NewsArticle {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.news
    }
}

#[async_trait]
impl Resource for UserProfile {
    fn store(stores: &Stores) -> &Arc<dyn EntityStore<Self>> {
        &stores.users
    }
}

pub fn routes<E: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<E>).post(create::<E>))
        .route(&format!("{}/{{id}}", path), put(update::<E>).delete(remove::<E>))
}

async fn list<E: Resource>(State(state): State<AppState>) -> Result<Json<Vec<E>>, AppError> {
    let items = E::store(&state.stores).fetch_all().await?;
    Ok(Json(items))
}

async fn create<E: Resource>(
    State(state): State<AppState>,
    Json(mut item): Json<E>,
) -> Result<(StatusCode, Json<E>), AppError> {
    if item.id().trim().is_empty() {
        item.set_id(Uuid::new_v4().to_string());
    }
    item.prepare(&state.stores).await?;
    E::store(&state.stores)
        .insert_many(std::slice::from_ref(&item))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut item): Json<E>,
) -> Result<Json<E>, AppError> {
    item.set_id(id);
    item.prepare(&state.stores).await?;
    if !E::store(&state.stores).update(&item).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(item))
}

async fn remove<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if E::store(&state.stores).delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
