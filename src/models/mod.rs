pub mod access_code;
pub mod exam;
pub mod news;
pub mod question;
pub mod subject;
pub mod user;
pub mod validate;

pub use access_code::{AccessCode, AccessCodeType, CodeStatus};
pub use exam::Exam;
pub use news::NewsArticle;
pub use question::{Difficulty, Question, QuestionType};
pub use subject::{Branch, Subject, Tag};
pub use user::{UserProfile, UserRole};
pub use validate::{FieldError, Validate};
