use sqlx::types::Json;

use crate::models::{AccessCode, Exam, NewsArticle, Question, Subject, Tag, UserProfile};
use crate::store::{Record, SqliteQuery};

impl Record for Subject {
    const TABLE: &'static str = "subjects";
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "description", "branch", "image", "sort_order"];
    const SORT_COLUMN: &'static str = "sort_order";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.branch)
            .bind(&self.image)
            .bind(self.sort_order)
    }
}

impl Record for Tag {
    const TABLE: &'static str = "tags";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const SORT_COLUMN: &'static str = "name";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(&self.id).bind(&self.name)
    }
}

impl Record for Question {
    const TABLE: &'static str = "questions";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "subject_id",
        "question_type",
        "question_text",
        "difficulty",
        "options",
        "correct_option_index",
        "correct_answers",
        "model_answer",
        "tag_ids",
        "created_at",
    ];
    const SORT_COLUMN: &'static str = "created_at";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.subject_id)
            .bind(self.question_type)
            .bind(&self.question_text)
            .bind(self.difficulty)
            .bind(Json(&self.options))
            .bind(self.correct_option_index)
            .bind(Json(&self.correct_answers))
            .bind(&self.model_answer)
            .bind(Json(&self.tag_ids))
            .bind(self.created_at)
    }
}

impl Record for Exam {
    const TABLE: &'static str = "exams";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "description",
        "subject_id",
        "subject_name",
        "question_ids",
        "published",
        "image",
        "image_hint",
        "teacher_name",
        "teacher_id",
        "duration_in_minutes",
        "created_at",
    ];
    const SORT_COLUMN: &'static str = "created_at";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.title)
            .bind(&self.description)
            .bind(&self.subject_id)
            .bind(&self.subject_name)
            .bind(Json(&self.question_ids))
            .bind(self.published)
            .bind(&self.image)
            .bind(&self.image_hint)
            .bind(&self.teacher_name)
            .bind(&self.teacher_id)
            .bind(self.duration_in_minutes)
            .bind(self.created_at)
    }
}

impl Record for NewsArticle {
    const TABLE: &'static str = "news";
    const COLUMNS: &'static [&'static str] = &["id", "title", "content", "image", "created_at"];
    const SORT_COLUMN: &'static str = "created_at";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.title)
            .bind(&self.content)
            .bind(&self.image)
            .bind(self.created_at)
    }
}

impl Record for AccessCode {
    const TABLE: &'static str = "access_codes";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "encoded_value",
        "code_type",
        "subject_id",
        "subject_name",
        "valid_from",
        "valid_until",
        "is_active",
        "is_used",
        "used_at",
        "used_by_user_id",
        "created_at",
    ];
    const SORT_COLUMN: &'static str = "created_at";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.name)
            .bind(&self.encoded_value)
            .bind(self.code_type)
            .bind(&self.subject_id)
            .bind(&self.subject_name)
            .bind(self.valid_from)
            .bind(self.valid_until)
            .bind(self.is_active)
            .bind(self.is_used)
            .bind(self.used_at)
            .bind(&self.used_by_user_id)
            .bind(self.created_at)
    }
}

impl Record for UserProfile {
    const TABLE: &'static str = "user_profiles";
    const COLUMNS: &'static [&'static str] =
        &["id", "email", "name", "role", "subjects_taught_ids", "created_at"];
    const SORT_COLUMN: &'static str = "email";
    // Accounts are created by the auth service; profiles can only be edited.
    const REST_INSERTABLE: bool = false;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.email)
            .bind(&self.name)
            .bind(self.role)
            .bind(Json(&self.subjects_taught_ids))
            .bind(self.created_at)
    }
}
