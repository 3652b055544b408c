//! Batch import/export: file parsing, row normalization, entity mapping and
//! batch submission.

pub mod export;
pub mod formats;
pub mod mapper;
pub mod normalize;
pub mod submit;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::{EntityStore, Stores};
use export::ExportFile;
use formats::FileFormat;
use mapper::{FromImportRow, MappingContext, map_rows};
use submit::{BatchReport, WriteMode, submit_batch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Subject,
    Tag,
    Question,
    Exam,
    News,
    AccessCode,
    User,
}

impl EntityKind {
    /// Collection name, as used in URLs and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Subject => "subjects",
            EntityKind::Tag => "tags",
            EntityKind::Question => "questions",
            EntityKind::Exam => "exams",
            EntityKind::News => "news",
            EntityKind::AccessCode => "access_codes",
            EntityKind::User => "users",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "subjects" => Some(EntityKind::Subject),
            "tags" => Some(EntityKind::Tag),
            "questions" => Some(EntityKind::Question),
            "exams" => Some(EntityKind::Exam),
            "news" => Some(EntityKind::News),
            "access-codes" | "access_codes" => Some(EntityKind::AccessCode),
            "users" | "teachers" => Some(EntityKind::User),
            _ => None,
        }
    }
}

async fn import_into<E>(
    store: &dyn EntityStore<E>,
    format: FileFormat,
    bytes: &[u8],
    ctx: &MappingContext,
) -> Result<BatchReport, AppError>
where
    E: FromImportRow + Send + Sync + 'static,
{
    let rows = formats::parse_rows(format, bytes)?;
    let rows_read = rows.len();
    let entities = map_rows::<E>(rows, ctx)?;
    let mode = if E::UPSERT { WriteMode::Upsert } else { WriteMode::Insert };
    submit_batch(store, E::KIND, rows_read, entities, mode).await
}

/// Parses `bytes`, maps every row into `kind` records and submits them as
/// one batch. Subject and user lookups are read from the stores first.
pub async fn import_file(
    stores: &Stores,
    kind: EntityKind,
    format: FileFormat,
    bytes: &[u8],
) -> Result<BatchReport, AppError> {
    let (subjects, users) = tokio::try_join!(stores.subjects.fetch_all(), stores.users.fetch_all())?;
    let ctx = MappingContext::new(&subjects, &users, Utc::now());

    match kind {
        EntityKind::Subject => import_into(stores.subjects.as_ref(), format, bytes, &ctx).await,
        EntityKind::Tag => import_into(stores.tags.as_ref(), format, bytes, &ctx).await,
        EntityKind::Question => import_into(stores.questions.as_ref(), format, bytes, &ctx).await,
        EntityKind::Exam => import_into(stores.exams.as_ref(), format, bytes, &ctx).await,
        EntityKind::News => import_into(stores.news.as_ref(), format, bytes, &ctx).await,
        EntityKind::AccessCode => {
            import_into(stores.access_codes.as_ref(), format, bytes, &ctx).await
        }
        EntityKind::User => import_into(stores.users.as_ref(), format, bytes, &ctx).await,
    }
}

/// Reads every `kind` record and renders it as a download.
pub async fn export_kind(
    stores: &Stores,
    kind: EntityKind,
    format: FileFormat,
) -> Result<ExportFile, AppError> {
    match kind {
        EntityKind::Subject => export::export_records(kind, format, &stores.subjects.fetch_all().await?),
        EntityKind::Tag => export::export_records(kind, format, &stores.tags.fetch_all().await?),
        EntityKind::Question => {
            export::export_records(kind, format, &stores.questions.fetch_all().await?)
        }
        EntityKind::Exam => export::export_records(kind, format, &stores.exams.fetch_all().await?),
        EntityKind::News => export::export_records(kind, format, &stores.news.fetch_all().await?),
        EntityKind::AccessCode => {
            export::export_records(kind, format, &stores.access_codes.fetch_all().await?)
        }
        EntityKind::User => export::export_records(kind, format, &stores.users.fetch_all().await?),
    }
}
