use std::collections::HashSet;

use chrono::{DateTime, Months, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{AccessCode, AccessCodeType, Subject};
use crate::store::Stores;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRequest {
    pub name: String,
    pub code_type: AccessCodeType,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub subject_id: Option<String>,
    /// Only read for `subject_specific` codes.
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub name: String,
    pub code_type: AccessCodeType,
    pub subject_id: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Start and end of a code's validity. Fixed-length types run from `now`;
/// `subject_specific` takes the admin's dates as given.
pub fn validity_window(
    code_type: AccessCodeType,
    now: DateTime<Utc>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    match code_type.duration_months() {
        Some(months) => {
            let until = now
                .checked_add_months(Months::new(months))
                .ok_or_else(|| AppError::Validation("validity window is out of range".to_string()))?;
            Ok((now, until))
        }
        None => {
            let (Some(from), Some(until)) = (valid_from, valid_until) else {
                return Err(AppError::Validation(format!(
                    "{} codes need both a start and an end date",
                    code_type.as_str()
                )));
            };
            if until < from {
                return Err(AppError::Validation(
                    "the end date must not be before the start date".to_string(),
                ));
            }
            Ok((from, until))
        }
    }
}

pub fn generate_token() -> String {
    format!("QR-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Subject id and name to store for a code of `code_type`. Codes that are
/// not subject scoped never carry a subject.
fn subject_fields(
    code_type: AccessCodeType,
    subject_id: Option<&str>,
    subject: Option<&Subject>,
) -> Result<(Option<String>, Option<String>), AppError> {
    if !code_type.requires_subject() {
        return Ok((None, None));
    }

    let Some(subject_id) = subject_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Err(AppError::Validation(format!(
            "{} codes need a subject",
            code_type.as_str()
        )));
    };

    match subject {
        Some(subject) if subject.id == subject_id => {
            Ok((Some(subject.id.clone()), Some(subject.name.clone())))
        }
        _ => Err(AppError::Validation(format!("unknown subject '{}'", subject_id))),
    }
}

/// Builds the records for one issuance. Nothing is written; any validation
/// failure rejects the whole request.
pub fn build_codes(
    req: &IssueRequest,
    subject: Option<&Subject>,
    now: DateTime<Utc>,
    max_quantity: u32,
) -> Result<Vec<AccessCode>, AppError> {
    let base_name = req.name.trim();
    if base_name.is_empty() {
        return Err(AppError::Validation("a code name is required".to_string()));
    }
    if req.quantity == 0 || req.quantity > max_quantity {
        return Err(AppError::Validation(format!(
            "quantity must be between 1 and {}",
            max_quantity
        )));
    }

    let (subject_id, subject_name) =
        subject_fields(req.code_type, req.subject_id.as_deref(), subject)?;
    let (valid_from, valid_until) =
        validity_window(req.code_type, now, req.valid_from, req.valid_until)?;

    let mut tokens = HashSet::with_capacity(req.quantity as usize);
    let codes = (1..=req.quantity)
        .map(|n| {
            let mut token = generate_token();
            while !tokens.insert(token.clone()) {
                token = generate_token();
            }

            let name = if req.quantity > 1 {
                format!("{} #{}", base_name, n)
            } else {
                base_name.to_string()
            };

            AccessCode {
                id: Uuid::new_v4().to_string(),
                name,
                encoded_value: token,
                code_type: req.code_type,
                subject_id: subject_id.clone(),
                subject_name: subject_name.clone(),
                valid_from,
                valid_until,
                is_active: true,
                is_used: false,
                used_at: None,
                used_by_user_id: None,
                created_at: now,
            }
        })
        .collect();

    Ok(codes)
}

/// Applies an edit to a stored code. The token, id and redemption state are
/// kept; the activation flag of a used code cannot change.
pub fn rebuild_code(
    existing: &AccessCode,
    req: &EditRequest,
    subject: Option<&Subject>,
    now: DateTime<Utc>,
) -> Result<AccessCode, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("a code name is required".to_string()));
    }

    let (subject_id, subject_name) =
        subject_fields(req.code_type, req.subject_id.as_deref(), subject)?;
    let (valid_from, valid_until) =
        validity_window(req.code_type, now, req.valid_from, req.valid_until)?;

    let is_active = if existing.is_used {
        existing.is_active
    } else {
        req.is_active.unwrap_or(existing.is_active)
    };

    Ok(AccessCode {
        id: existing.id.clone(),
        name: name.to_string(),
        encoded_value: existing.encoded_value.clone(),
        code_type: req.code_type,
        subject_id,
        subject_name,
        valid_from,
        valid_until,
        is_active,
        is_used: existing.is_used,
        used_at: existing.used_at,
        used_by_user_id: existing.used_by_user_id.clone(),
        created_at: existing.created_at,
    })
}

async fn load_subject(stores: &Stores, subject_id: Option<&str>) -> Result<Option<Subject>, AppError> {
    match subject_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => stores.subjects.find(id).await,
        None => Ok(None),
    }
}

/// Validates, builds and stores a batch of new codes with one insert.
pub async fn issue_codes(
    stores: &Stores,
    req: &IssueRequest,
    max_quantity: u32,
) -> Result<Vec<AccessCode>, AppError> {
    let subject = if req.code_type.requires_subject() {
        load_subject(stores, req.subject_id.as_deref()).await?
    } else {
        None
    };

    let codes = build_codes(req, subject.as_ref(), Utc::now(), max_quantity)?;
    stores.access_codes.insert_many(&codes).await?;

    info!(
        "Issued {} {} code(s) named '{}'",
        codes.len(),
        req.code_type.as_str(),
        req.name.trim()
    );
    Ok(codes)
}

pub async fn edit_code(stores: &Stores, id: &str, req: &EditRequest) -> Result<AccessCode, AppError> {
    let existing = stores.access_codes.find(id).await?.ok_or(AppError::NotFound)?;
    let subject = if req.code_type.requires_subject() {
        load_subject(stores, req.subject_id.as_deref()).await?
    } else {
        None
    };

    let updated = rebuild_code(&existing, req, subject.as_ref(), Utc::now())?;
    if !stores.access_codes.update(&updated).await? {
        return Err(AppError::NotFound);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::Branch;

    fn math() -> Subject {
        Subject {
            id: "S1".to_string(),
            name: "Math".to_string(),
            description: None,
            branch: Branch::Scientific,
            image: None,
            sort_order: 0,
        }
    }

    fn request(code_type: AccessCodeType, quantity: u32) -> IssueRequest {
        IssueRequest {
            name: "Spring promo".to_string(),
            code_type,
            quantity,
            subject_id: None,
            valid_from: None,
            valid_until: None,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn fixed_windows_follow_calendar_months() {
        let now = at(2026, 1, 31);
        let cases = [
            (AccessCodeType::GeneralMonthly, at(2026, 2, 28)),
            (AccessCodeType::GeneralQuarterly, at(2026, 4, 30)),
            (AccessCodeType::General6Months, at(2026, 7, 31)),
            (AccessCodeType::GeneralYearly, at(2027, 1, 31)),
            (AccessCodeType::ChooseSingleSubjectMonthly, at(2026, 2, 28)),
        ];

        for (code_type, expected_until) in cases {
            let (from, until) = validity_window(code_type, now, None, None).expect("window");
            assert_eq!(from, now);
            assert_eq!(until, expected_until, "{}", code_type.as_str());
        }
    }

    #[test]
    fn admin_window_needs_both_ordered_dates() {
        let now = at(2026, 1, 1);
        let t = AccessCodeType::SubjectSpecific;
        assert!(validity_window(t, now, None, Some(at(2026, 2, 1))).is_err());
        assert!(validity_window(t, now, Some(at(2026, 2, 1)), None).is_err());
        assert!(validity_window(t, now, Some(at(2026, 2, 1)), Some(at(2026, 1, 1))).is_err());

        let (from, until) =
            validity_window(t, now, Some(at(2026, 3, 1)), Some(at(2026, 6, 1))).expect("window");
        assert_eq!(from, at(2026, 3, 1));
        assert_eq!(until, at(2026, 6, 1));
    }

    #[test]
    fn quantity_produces_numbered_distinct_codes() {
        let codes = build_codes(&request(AccessCodeType::GeneralMonthly, 3), None, at(2026, 1, 1), 10)
            .expect("codes");

        let names: Vec<&str> = codes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Spring promo #1", "Spring promo #2", "Spring promo #3"]);

        let tokens: HashSet<&str> = codes.iter().map(|c| c.encoded_value.as_str()).collect();
        assert_eq!(tokens.len(), 3);
        assert!(codes.iter().all(|c| c.is_active && !c.is_used));
    }

    #[test]
    fn single_code_keeps_plain_name() {
        let codes = build_codes(&request(AccessCodeType::GeneralYearly, 1), None, at(2026, 1, 1), 10)
            .expect("codes");
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].name, "Spring promo");
    }

    #[test]
    fn subject_scoped_codes_need_a_known_subject() {
        let now = at(2026, 1, 1);
        let mut req = request(AccessCodeType::ChooseSingleSubjectYearly, 2);
        assert!(matches!(build_codes(&req, None, now, 10), Err(AppError::Validation(_))));

        req.subject_id = Some("S9".to_string());
        assert!(matches!(build_codes(&req, None, now, 10), Err(AppError::Validation(_))));

        req.subject_id = Some("S1".to_string());
        let codes = build_codes(&req, Some(&math()), now, 10).expect("codes");
        assert_eq!(codes[0].subject_name.as_deref(), Some("Math"));
    }

    #[test]
    fn general_codes_drop_subject() {
        let mut req = request(AccessCodeType::GeneralMonthly, 1);
        req.subject_id = Some("S1".to_string());
        let codes = build_codes(&req, Some(&math()), at(2026, 1, 1), 10).expect("codes");
        assert!(codes[0].subject_id.is_none());
    }

    #[test]
    fn invalid_quantity_or_name_is_rejected() {
        let now = at(2026, 1, 1);
        assert!(build_codes(&request(AccessCodeType::GeneralMonthly, 0), None, now, 10).is_err());
        assert!(build_codes(&request(AccessCodeType::GeneralMonthly, 11), None, now, 10).is_err());

        let mut req = request(AccessCodeType::GeneralMonthly, 1);
        req.name = "   ".to_string();
        assert!(build_codes(&req, None, now, 10).is_err());
    }

    #[test]
    fn edit_keeps_token_and_redemption_state() {
        let now = at(2026, 1, 1);
        let mut existing = build_codes(&request(AccessCodeType::GeneralMonthly, 1), None, now, 10)
            .expect("codes")
            .remove(0);
        existing.is_used = true;
        existing.used_at = Some(at(2026, 1, 5));
        existing.used_by_user_id = Some("U1".to_string());

        let edit = EditRequest {
            name: "Renamed".to_string(),
            code_type: AccessCodeType::SubjectSpecific,
            subject_id: Some("S1".to_string()),
            valid_from: Some(at(2026, 2, 1)),
            valid_until: Some(at(2026, 3, 1)),
            is_active: Some(false),
        };
        let updated = rebuild_code(&existing, &edit, Some(&math()), at(2026, 1, 10)).expect("edit");

        assert_eq!(updated.encoded_value, existing.encoded_value);
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.name, "Renamed");
        assert!(updated.is_used);
        assert!(updated.is_active, "used codes keep their activation flag");
        assert_eq!(updated.used_by_user_id.as_deref(), Some("U1"));
        assert_eq!(updated.valid_from, at(2026, 2, 1));
    }
}
