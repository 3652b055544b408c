use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::import::EntityKind;
use crate::import::normalize::{ImportRow, NormalizedRow, normalize_row};
use crate::models::{
    AccessCode, AccessCodeType, Branch, Difficulty, Exam, FieldError, NewsArticle, Question,
    QuestionType, Subject, Tag, UserProfile, UserRole, Validate,
};

pub const NO_VALID_ROWS: &str = "The file contains no valid rows to import";

/// Why a single row was left out of an import.
#[derive(Debug, Error, PartialEq)]
pub enum RowRejection {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value '{value}' for '{field}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("unknown subject '{0}'")]
    UnknownSubject(String),

    #[error("no user id given and no existing user with e-mail '{0}'")]
    UnknownUser(String),
}

impl From<FieldError> for RowRejection {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::Missing(field) => RowRejection::MissingField(field),
            FieldError::Invalid { field, value } => RowRejection::InvalidValue { field, value },
        }
    }
}

/// Lookup tables built from the currently stored lists.
#[derive(Debug, Clone)]
pub struct MappingContext {
    subjects_by_name: HashMap<String, (String, String)>,
    subject_ids: HashSet<String>,
    user_ids_by_email: HashMap<String, String>,
    now: DateTime<Utc>,
}

impl MappingContext {
    pub fn new(subjects: &[Subject], users: &[UserProfile], now: DateTime<Utc>) -> Self {
        let subjects_by_name = subjects
            .iter()
            .map(|s| (s.name.trim().to_lowercase(), (s.id.clone(), s.name.clone())))
            .collect();
        let subject_ids = subjects.iter().map(|s| s.id.clone()).collect();
        let user_ids_by_email = users
            .iter()
            .map(|u| (u.email.trim().to_lowercase(), u.id.clone()))
            .collect();

        Self {
            subjects_by_name,
            subject_ids,
            user_ids_by_email,
            now,
        }
    }

    /// Case-insensitive name lookup, returning `(id, stored name)`.
    pub fn subject_by_name(&self, name: &str) -> Option<(&str, &str)> {
        self.subjects_by_name
            .get(&name.trim().to_lowercase())
            .map(|(id, name)| (id.as_str(), name.as_str()))
    }

    fn subject_name_by_id(&self, id: &str) -> Option<&str> {
        self.subjects_by_name
            .values()
            .find(|(subject_id, _)| subject_id == id)
            .map(|(_, name)| name.as_str())
    }

    fn resolve_subject(&self, name: &str) -> Result<(String, String), RowRejection> {
        self.subject_by_name(name)
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .ok_or_else(|| RowRejection::UnknownSubject(name.to_string()))
    }
}

/// Conversion from one normalized import row into a typed entity.
pub trait FromImportRow: Validate + Sized {
    const KIND: EntityKind;
    /// Imported rows replace stored records with the same id.
    const UPSERT: bool = false;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection>;
}

/// Normalizes and maps every row, skipping (and logging) rows that fail.
/// An empty input or a batch where every row failed is a validation error.
pub fn map_rows<E: FromImportRow>(
    rows: Vec<ImportRow>,
    ctx: &MappingContext,
) -> Result<Vec<E>, AppError> {
    if rows.is_empty() {
        return Err(AppError::Validation(NO_VALID_ROWS.to_string()));
    }

    let total = rows.len();
    let mut mapped = Vec::with_capacity(total);
    for (index, row) in rows.into_iter().enumerate() {
        let normalized = normalize_row(row);
        let mapped_row = E::from_row(&normalized, ctx)
            .and_then(|entity| entity.validate().map(|_| entity).map_err(RowRejection::from));
        match mapped_row {
            Ok(entity) => mapped.push(entity),
            Err(reason) => {
                warn!("Skipping {} row {}: {}", E::KIND.as_str(), index + 1, reason);
            }
        }
    }

    if mapped.is_empty() {
        return Err(AppError::Validation(NO_VALID_ROWS.to_string()));
    }

    info!("Mapped {} of {} {} rows", mapped.len(), total, E::KIND.as_str());
    Ok(mapped)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn require(row: &NormalizedRow, key: &str, field: &'static str) -> Result<String, RowRejection> {
    row.text(key).ok_or(RowRejection::MissingField(field))
}

fn parsed<T>(
    row: &NormalizedRow,
    key: &str,
    field: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RowRejection> {
    let raw = require(row, key, field)?;
    parse(&raw).ok_or(RowRejection::InvalidValue { field, value: raw })
}

/// First of `keys` that holds text.
fn text_of(row: &NormalizedRow, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| row.text(key))
}

fn row_id(row: &NormalizedRow) -> String {
    row.text("id").unwrap_or_else(|| Uuid::new_v4().to_string())
}

impl FromImportRow for Question {
    const KIND: EntityKind = EntityKind::Question;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection> {
        let question_type = parsed(row, "questiontype", "questionType", QuestionType::parse)?;
        let question_text = require(row, "questiontext", "questionText")?;
        let difficulty = parsed(row, "difficulty", "difficulty", Difficulty::parse)?;

        let subject_id = match (row.text("subjectid"), row.text("subjectname")) {
            (Some(id), _) if ctx.subject_ids.contains(&id) => id,
            (Some(id), None) => return Err(RowRejection::UnknownSubject(id)),
            (_, Some(name)) => ctx.resolve_subject(&name)?.0,
            (None, None) => return Err(RowRejection::MissingField("subjectName")),
        };

        let mut options = row.list("options");
        let mut correct_option_index = None;
        let mut correct_answers = Vec::new();
        let mut model_answer = None;

        // Range checks happen in `Validate`.
        match question_type {
            QuestionType::Mcq | QuestionType::TrueFalse => {
                if question_type == QuestionType::TrueFalse && options.is_empty() {
                    options = vec!["True".to_string(), "False".to_string()];
                }
                correct_option_index = row.integer("correctoptionindex");
            }
            QuestionType::FillInTheBlanks => {
                correct_answers = row.list("correctanswers");
                options.clear();
            }
            QuestionType::ShortAnswer => {
                model_answer = row.text("modelanswer");
                options.clear();
            }
        }

        Ok(Question {
            id: row_id(row),
            subject_id,
            question_type,
            question_text,
            difficulty,
            options,
            correct_option_index,
            correct_answers,
            model_answer,
            tag_ids: row.list("tagids"),
            created_at: ctx.now,
        })
    }
}

impl FromImportRow for Exam {
    const KIND: EntityKind = EntityKind::Exam;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection> {
        let title = require(row, "title", "title")?;
        let subject = require(row, "subjectname", "subjectName")?;
        let (subject_id, subject_name) = ctx.resolve_subject(&subject)?;

        Ok(Exam {
            id: row_id(row),
            title,
            description: row.text("description"),
            subject_id,
            subject_name,
            question_ids: row.list("questionids"),
            published: row.flag("published").unwrap_or(false),
            image: row.text("image"),
            image_hint: row.text("imagehint"),
            teacher_name: row.text("teachername"),
            teacher_id: row.text("teacherid"),
            duration_in_minutes: row.integer("durationinminutes"),
            created_at: ctx.now,
        })
    }
}

impl FromImportRow for NewsArticle {
    const KIND: EntityKind = EntityKind::News;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection> {
        Ok(NewsArticle {
            id: row_id(row),
            title: require(row, "title", "title")?,
            content: require(row, "content", "content")?,
            image: row.text("image"),
            created_at: ctx.now,
        })
    }
}

impl FromImportRow for AccessCode {
    const KIND: EntityKind = EntityKind::AccessCode;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection> {
        let name = require(row, "name", "name")?;
        let encoded_value = require(row, "encodedvalue", "encodedValue")?;
        let raw_type = text_of(row, &["type", "codetype"]).ok_or(RowRejection::MissingField("type"))?;
        let code_type = AccessCodeType::parse(&raw_type).ok_or(RowRejection::InvalidValue {
            field: "type",
            value: raw_type.clone(),
        })?;
        let valid_from = parsed(row, "validfrom", "validFrom", parse_timestamp)?;
        let valid_until = parsed(row, "validuntil", "validUntil", parse_timestamp)?;

        let (subject_id, subject_name) = match row.text("subjectname") {
            Some(name) if code_type.requires_subject() => {
                let (id, name) = ctx.resolve_subject(&name)?;
                (Some(id), Some(name))
            }
            None if code_type.requires_subject() => {
                match row.text("subjectid") {
                    Some(id) => match ctx.subject_name_by_id(&id) {
                        Some(name) => {
                            let name = name.to_string();
                            (Some(id), Some(name))
                        }
                        None => return Err(RowRejection::UnknownSubject(id)),
                    },
                    None => return Err(RowRejection::MissingField("subjectName")),
                }
            }
            _ => (None, None),
        };

        let is_used = row.flag("isused").unwrap_or(false);

        Ok(AccessCode {
            id: row_id(row),
            name,
            encoded_value,
            code_type,
            subject_id,
            subject_name,
            valid_from,
            valid_until,
            is_active: row.flag("isactive").unwrap_or(true),
            is_used,
            used_at: row.text("usedat").and_then(|v| parse_timestamp(&v)).filter(|_| is_used),
            used_by_user_id: row.text("usedbyuserid").filter(|_| is_used),
            created_at: ctx.now,
        })
    }
}

impl FromImportRow for UserProfile {
    const KIND: EntityKind = EntityKind::User;
    const UPSERT: bool = true;

    fn from_row(row: &NormalizedRow, ctx: &MappingContext) -> Result<Self, RowRejection> {
        let email = require(row, "email", "email")?.to_lowercase();
        let id = match row.text("id") {
            Some(id) => id,
            None => ctx
                .user_ids_by_email
                .get(&email)
                .cloned()
                .ok_or_else(|| RowRejection::UnknownUser(email.clone()))?,
        };
        let role = match row.text("role") {
            Some(raw) => UserRole::parse(&raw).ok_or(RowRejection::InvalidValue {
                field: "role",
                value: raw,
            })?,
            None => UserRole::default(),
        };

        Ok(UserProfile {
            id,
            email,
            name: row.text("name"),
            role,
            subjects_taught_ids: row.list("subjectstaughtids"),
            created_at: ctx.now,
        })
    }
}

impl FromImportRow for Subject {
    const KIND: EntityKind = EntityKind::Subject;

    fn from_row(row: &NormalizedRow, _ctx: &MappingContext) -> Result<Self, RowRejection> {
        Ok(Subject {
            id: row_id(row),
            name: require(row, "name", "name")?,
            description: row.text("description"),
            branch: parsed(row, "branch", "branch", Branch::parse)?,
            image: row.text("image"),
            sort_order: row
                .integer("order")
                .or_else(|| row.integer("sortorder"))
                .unwrap_or(0),
        })
    }
}

impl FromImportRow for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    fn from_row(row: &NormalizedRow, _ctx: &MappingContext) -> Result<Self, RowRejection> {
        Ok(Tag {
            id: row_id(row),
            name: require(row, "name", "name")?,
        })
    }
}
