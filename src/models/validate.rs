//! Field rules every stored record must satisfy, whether it arrives through
//! an import file or a create/update request.

use thiserror::Error;

use crate::models::{
    AccessCode, Exam, NewsArticle, Question, QuestionType, Subject, Tag, UserProfile,
};

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("missing required field '{0}'")]
    Missing(&'static str),

    #[error("invalid value '{value}' for '{field}'")]
    Invalid { field: &'static str, value: String },
}

pub trait Validate {
    fn validate(&self) -> Result<(), FieldError>;
}

fn required(value: &str, field: &'static str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        Err(FieldError::Missing(field))
    } else {
        Ok(())
    }
}

impl Validate for Subject {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.name, "name")
    }
}

impl Validate for Tag {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.name, "name")
    }
}

impl Validate for Question {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.question_text, "questionText")?;
        required(&self.subject_id, "subjectId")?;

        match self.question_type {
            QuestionType::Mcq | QuestionType::TrueFalse => {
                if self.options.len() < 2 {
                    return Err(FieldError::Invalid {
                        field: "options",
                        value: self.options.join(","),
                    });
                }
                let index = self
                    .correct_option_index
                    .ok_or(FieldError::Missing("correctOptionIndex"))?;
                if index < 0 || index as usize >= self.options.len() {
                    return Err(FieldError::Invalid {
                        field: "correctOptionIndex",
                        value: index.to_string(),
                    });
                }
            }
            QuestionType::FillInTheBlanks => {
                if self.correct_answers.is_empty() {
                    return Err(FieldError::Missing("correctAnswers"));
                }
            }
            QuestionType::ShortAnswer => {}
        }
        Ok(())
    }
}

impl Validate for Exam {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.title, "title")?;
        required(&self.subject_id, "subjectId")?;
        match self.duration_in_minutes {
            Some(minutes) if minutes <= 0 => Err(FieldError::Invalid {
                field: "durationInMinutes",
                value: minutes.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl Validate for NewsArticle {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.title, "title")?;
        required(&self.content, "content")
    }
}

impl Validate for AccessCode {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.name, "name")?;
        required(&self.encoded_value, "encodedValue")?;
        if self.valid_until < self.valid_from {
            return Err(FieldError::Invalid {
                field: "validUntil",
                value: self.valid_until.to_rfc3339(),
            });
        }
        if self.code_type.requires_subject()
            && self.subject_id.as_deref().is_none_or(|id| id.trim().is_empty())
        {
            return Err(FieldError::Missing("subjectId"));
        }
        Ok(())
    }
}

impl Validate for UserProfile {
    fn validate(&self) -> Result<(), FieldError> {
        required(&self.email, "email")?;
        if !self.email.contains('@') {
            return Err(FieldError::Invalid {
                field: "email",
                value: self.email.clone(),
            });
        }
        Ok(())
    }
}
