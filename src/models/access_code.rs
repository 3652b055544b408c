use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The nine kinds of access code the platform sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum AccessCodeType {
    GeneralMonthly,
    GeneralQuarterly,
    #[serde(rename = "general_6_months")]
    #[sqlx(rename = "general_6_months")]
    General6Months,
    GeneralYearly,
    ChooseSingleSubjectMonthly,
    ChooseSingleSubjectQuarterly,
    #[serde(rename = "choose_single_subject_6_months")]
    #[sqlx(rename = "choose_single_subject_6_months")]
    ChooseSingleSubject6Months,
    ChooseSingleSubjectYearly,
    SubjectSpecific,
}

impl AccessCodeType {
    pub const ALL: [AccessCodeType; 9] = [
        AccessCodeType::GeneralMonthly,
        AccessCodeType::GeneralQuarterly,
        AccessCodeType::General6Months,
        AccessCodeType::GeneralYearly,
        AccessCodeType::ChooseSingleSubjectMonthly,
        AccessCodeType::ChooseSingleSubjectQuarterly,
        AccessCodeType::ChooseSingleSubject6Months,
        AccessCodeType::ChooseSingleSubjectYearly,
        AccessCodeType::SubjectSpecific,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessCodeType::GeneralMonthly => "general_monthly",
            AccessCodeType::GeneralQuarterly => "general_quarterly",
            AccessCodeType::General6Months => "general_6_months",
            AccessCodeType::GeneralYearly => "general_yearly",
            AccessCodeType::ChooseSingleSubjectMonthly => "choose_single_subject_monthly",
            AccessCodeType::ChooseSingleSubjectQuarterly => "choose_single_subject_quarterly",
            AccessCodeType::ChooseSingleSubject6Months => "choose_single_subject_6_months",
            AccessCodeType::ChooseSingleSubjectYearly => "choose_single_subject_yearly",
            AccessCodeType::SubjectSpecific => "subject_specific",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Subject-scoped codes must carry a subject id.
    pub fn requires_subject(self) -> bool {
        let name = self.as_str();
        name.starts_with("subject_") || name.starts_with("choose_single_subject_")
    }

    /// Fixed validity length in calendar months, `None` when the admin
    /// supplies the window.
    pub fn duration_months(self) -> Option<u32> {
        let name = self.as_str();
        if name.ends_with("_monthly") {
            Some(1)
        } else if name.ends_with("_quarterly") {
            Some(3)
        } else if name.ends_with("_6_months") {
            Some(6)
        } else if name.ends_with("_yearly") {
            Some(12)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    Active,
    Inactive,
    Used,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessCode {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub encoded_value: String,
    pub code_type: AccessCodeType,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by_user_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}
