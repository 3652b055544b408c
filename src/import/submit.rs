use serde::Serialize;
use tracing::{error, info};

use crate::error::AppError;
use crate::import::EntityKind;
use crate::store::EntityStore;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchReport {
    pub kind: EntityKind,
    /// Rows found in the file.
    pub rows_read: usize,
    /// Rows that survived mapping and were sent to the store.
    pub submitted: usize,
    pub inserted: usize,
}

/// How a batch is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    /// Records whose id is already stored are overwritten.
    Upsert,
}

/// Hands the whole batch to the store in a single call. Atomicity is
/// whatever the store gives; a failure is reported for the whole batch.
pub async fn submit_batch<E: Send + Sync + 'static>(
    store: &dyn EntityStore<E>,
    kind: EntityKind,
    rows_read: usize,
    entities: Vec<E>,
    mode: WriteMode,
) -> Result<BatchReport, AppError> {
    if entities.is_empty() {
        return Err(AppError::Validation(
            crate::import::mapper::NO_VALID_ROWS.to_string(),
        ));
    }

    let submitted = entities.len();
    let written = match mode {
        WriteMode::Insert => store.insert_many(&entities).await,
        WriteMode::Upsert => store.upsert_many(&entities).await,
    };
    let inserted = match written {
        Ok(n) => n,
        Err(e) if e.is_unimplemented() => {
            info!("Batch insert of {} is not available: {}", kind.as_str(), e);
            return Err(e);
        }
        Err(e) => {
            error!("Batch insert of {} {} failed: {}", submitted, kind.as_str(), e);
            return Err(e);
        }
    };

    info!("Imported {} {} ({} rows read)", inserted, kind.as_str(), rows_read);
    Ok(BatchReport {
        kind,
        rows_read,
        submitted,
        inserted,
    })
}
