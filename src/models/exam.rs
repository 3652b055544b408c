use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject_id: String,
    /// Filled from the subject store on create and update.
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    #[sqlx(json)]
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub image: Option<String>,
    pub image_hint: Option<String>,
    pub teacher_name: Option<String>,
    pub teacher_id: Option<String>,
    pub duration_in_minutes: Option<i64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
