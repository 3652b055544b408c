//! Persistence seam. Every entity is reached through [`EntityStore`], so the
//! handlers and services do not know which backend holds the data.

pub mod records;
pub mod rest;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::config::RestConfig;
use crate::error::AppError;
use crate::models::{AccessCode, Exam, NewsArticle, Question, Subject, Tag, UserProfile};

pub use rest::RestStore;
pub use sqlite::SqliteStore;

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Table metadata and column binding for one entity type.
pub trait Record: Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    /// Column order used by [`Record::bind_columns`]; `id` comes first.
    const COLUMNS: &'static [&'static str];
    const SORT_COLUMN: &'static str;
    /// Whether the REST backend accepts inserts for this table.
    const REST_INSERTABLE: bool = true;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

#[async_trait]
pub trait EntityStore<E: Send + Sync + 'static>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<E>, AppError>;
    async fn find(&self, id: &str) -> Result<Option<E>, AppError>;
    /// Inserts the whole batch in one backend call. Returns the number of
    /// rows written.
    async fn insert_many(&self, items: &[E]) -> Result<usize, AppError>;
    /// Inserts new records and overwrites stored ones with the same id.
    /// Returns the number of records written.
    async fn upsert_many(&self, items: &[E]) -> Result<usize, AppError>;
    /// First record whose `column` equals `value`.
    async fn find_by(&self, column: &'static str, value: &str) -> Result<Option<E>, AppError>;
    /// Returns `false` when no record has the item's id.
    async fn update(&self, item: &E) -> Result<bool, AppError>;
    /// Writes `item` only while the stored record still has `guard_column`
    /// equal to `expected`. Returns `false` when nothing matched.
    async fn update_if(
        &self,
        item: &E,
        guard_column: &'static str,
        expected: bool,
    ) -> Result<bool, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct Stores {
    pub subjects: Arc<dyn EntityStore<Subject>>,
    pub tags: Arc<dyn EntityStore<Tag>>,
    pub questions: Arc<dyn EntityStore<Question>>,
    pub exams: Arc<dyn EntityStore<Exam>>,
    pub news: Arc<dyn EntityStore<NewsArticle>>,
    pub access_codes: Arc<dyn EntityStore<AccessCode>>,
    pub users: Arc<dyn EntityStore<UserProfile>>,
}

impl Stores {
    pub fn sqlite(db: SqlitePool) -> Self {
        Self {
            subjects: Arc::new(SqliteStore::new(db.clone())),
            tags: Arc::new(SqliteStore::new(db.clone())),
            questions: Arc::new(SqliteStore::new(db.clone())),
            exams: Arc::new(SqliteStore::new(db.clone())),
            news: Arc::new(SqliteStore::new(db.clone())),
            access_codes: Arc::new(SqliteStore::new(db.clone())),
            users: Arc::new(SqliteStore::new(db)),
        }
    }

    pub fn rest(config: RestConfig) -> Result<Self, AppError> {
        let client = rest::build_client()?;
        Ok(Self {
            subjects: Arc::new(RestStore::new(client.clone(), config.clone())),
            tags: Arc::new(RestStore::new(client.clone(), config.clone())),
            questions: Arc::new(RestStore::new(client.clone(), config.clone())),
            exams: Arc::new(RestStore::new(client.clone(), config.clone())),
            news: Arc::new(RestStore::new(client.clone(), config.clone())),
            access_codes: Arc::new(RestStore::new(client.clone(), config.clone())),
            users: Arc::new(RestStore::new(client, config)),
        })
    }
}
