use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::{AccessCode, CodeStatus};
use crate::store::EntityStore;

pub fn status(code: &AccessCode) -> CodeStatus {
    if code.is_used {
        CodeStatus::Used
    } else if code.is_active {
        CodeStatus::Active
    } else {
        CodeStatus::Inactive
    }
}

/// A stored code together with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct AccessCodeView {
    #[serde(flatten)]
    pub code: AccessCode,
    pub status: CodeStatus,
}

impl From<AccessCode> for AccessCodeView {
    fn from(code: AccessCode) -> Self {
        let status = status(&code);
        Self { code, status }
    }
}

/// Copy of `code` with the new activation flag. Used codes are immutable.
pub fn with_active(code: &AccessCode, active: bool) -> Result<AccessCode, AppError> {
    if code.is_used {
        return Err(AppError::Conflict(format!(
            "code '{}' has been used and cannot be {}",
            code.name,
            if active { "activated" } else { "deactivated" }
        )));
    }
    let mut updated = code.clone();
    updated.is_active = active;
    Ok(updated)
}

/// Flips one code between active and inactive.
pub async fn toggle(store: &dyn EntityStore<AccessCode>, id: &str) -> Result<AccessCode, AppError> {
    let code = store.find(id).await?.ok_or(AppError::NotFound)?;
    let updated = with_active(&code, !code.is_active)?;

    if !store.update(&updated).await? {
        return Err(AppError::NotFound);
    }
    info!("Access code {} is now {:?}", updated.id, status(&updated));
    Ok(updated)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkActivationReport {
    pub updated: usize,
    pub unchanged: usize,
    pub skipped_used: usize,
    pub missing: usize,
}

/// Sets the activation flag on every selected code, in selection order.
/// Used codes are skipped and counted; a store failure stops the loop.
pub async fn bulk_set_active(
    store: &dyn EntityStore<AccessCode>,
    ids: &[String],
    active: bool,
) -> Result<BulkActivationReport, AppError> {
    let codes: HashMap<String, AccessCode> = store
        .fetch_all()
        .await?
        .into_iter()
        .map(|c| (c.id.clone(), c))
        .collect();

    let mut report = BulkActivationReport::default();
    for id in ids {
        let Some(code) = codes.get(id) else {
            report.missing += 1;
            continue;
        };
        if code.is_used {
            report.skipped_used += 1;
            continue;
        }
        if code.is_active == active {
            report.unchanged += 1;
            continue;
        }

        let updated = with_active(code, active)?;
        if let Err(e) = store.update(&updated).await {
            error!("Bulk activation stopped at {} after {} updates: {}", id, report.updated, e);
            return Err(AppError::BatchAborted {
                completed: report.updated,
                total: ids.len(),
                reason: e.to_string(),
            });
        }
        report.updated += 1;
    }

    if report.skipped_used > 0 {
        warn!("Skipped {} used code(s) during bulk activation", report.skipped_used);
    }
    info!("Bulk activation: {:?}", report);
    Ok(report)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub deleted: usize,
    pub missing: usize,
}

/// Deletes the selected codes one call at a time. The first failure stops
/// the loop; codes already deleted stay deleted.
pub async fn bulk_delete(
    store: &dyn EntityStore<AccessCode>,
    ids: &[String],
) -> Result<BulkDeleteReport, AppError> {
    let mut report = BulkDeleteReport::default();

    for id in ids {
        match store.delete(id).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => report.missing += 1,
            Err(e) => {
                error!("Bulk delete stopped at {} after {} deletions: {}", id, report.deleted, e);
                return Err(AppError::BatchAborted {
                    completed: report.deleted,
                    total: ids.len(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!("Bulk delete: {:?}", report);
    Ok(report)
}

/// Marks the code with `encoded_value` as used by `user_id`. A code can be
/// redeemed once, while active and inside its validity window.
pub async fn redeem(
    store: &dyn EntityStore<AccessCode>,
    encoded_value: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<AccessCode, AppError> {
    let code = store
        .find_by("encoded_value", encoded_value)
        .await?
        .ok_or(AppError::NotFound)?;

    if code.is_used {
        return Err(AppError::Conflict("this code has already been used".to_string()));
    }
    if !code.is_active {
        return Err(AppError::Conflict("this code is not active".to_string()));
    }
    if now < code.valid_from {
        return Err(AppError::Conflict("this code is not valid yet".to_string()));
    }
    if now > code.valid_until {
        return Err(AppError::Conflict("this code has expired".to_string()));
    }

    let mut redeemed = code;
    redeemed.is_used = true;
    redeemed.used_at = Some(now);
    redeemed.used_by_user_id = Some(user_id.to_string());

    // Another redemption may have landed since the read.
    if !store.update_if(&redeemed, "is_used", false).await? {
        warn!("Access code {} was redeemed concurrently", redeemed.id);
        return Err(AppError::Conflict("this code has already been used".to_string()));
    }
    info!("Access code {} redeemed by {}", redeemed.id, user_id);
    Ok(redeemed)
}
