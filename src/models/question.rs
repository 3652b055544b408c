use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    FillInTheBlanks,
    ShortAnswer,
}

impl QuestionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mcq" => Some(QuestionType::Mcq),
            "true_false" => Some(QuestionType::TrueFalse),
            "fill_in_the_blanks" | "fill_in_blanks" => Some(QuestionType::FillInTheBlanks),
            "short_answer" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub subject_id: String,
    pub question_type: QuestionType,
    pub question_text: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    #[sqlx(json)]
    pub options: Vec<String>,
    pub correct_option_index: Option<i64>,
    #[serde(default)]
    #[sqlx(json)]
    pub correct_answers: Vec<String>,
    pub model_answer: Option<String>,
    #[serde(default)]
    #[sqlx(json)]
    pub tag_ids: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
