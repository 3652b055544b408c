use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

use crate::error::AppError;
use crate::store::{EntityStore, Record};

pub struct SqliteStore<E> {
    db: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SqliteStore<E> {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for SqliteStore<E> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

fn select_sql<E: Record>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

fn insert_sql<E: Record>() -> String {
    let placeholders = (1..=E::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders
    )
}

// Stored rows keep their id and creation time.
fn upsert_sql<E: Record>() -> String {
    let assignments = E::COLUMNS
        .iter()
        .filter(|column| !matches!(**column, "id" | "created_at"))
        .map(|column| format!("{0} = excluded.{0}", column))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ON CONFLICT(id) DO UPDATE SET {}", insert_sql::<E>(), assignments)
}

// id is bound as ?1 by `bind_columns`, so it doubles as the WHERE parameter.
fn update_sql<E: Record>() -> String {
    let assignments = E::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {} WHERE id = ?1", E::TABLE, assignments)
}

#[async_trait]
impl<E> EntityStore<E> for SqliteStore<E>
where
    E: Record + for<'r> FromRow<'r, SqliteRow>,
{
    async fn fetch_all(&self) -> Result<Vec<E>, AppError> {
        let sql = format!("{} ORDER BY {} ASC", select_sql::<E>(), E::SORT_COLUMN);
        let rows = sqlx::query_as::<_, E>(&sql).fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn find(&self, id: &str) -> Result<Option<E>, AppError> {
        let sql = format!("{} WHERE id = ?1", select_sql::<E>());
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn insert_many(&self, items: &[E]) -> Result<usize, AppError> {
        let sql = insert_sql::<E>();
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;

        for item in items {
            item.bind_columns(sqlx::query(&sql))
                .execute(&mut *tx)
                .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn upsert_many(&self, items: &[E]) -> Result<usize, AppError> {
        let sql = upsert_sql::<E>();
        let mut tx = self.db.begin().await?;
        let mut written = 0;

        for item in items {
            item.bind_columns(sqlx::query(&sql))
                .execute(&mut *tx)
                .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn find_by(&self, column: &'static str, value: &str) -> Result<Option<E>, AppError> {
        let sql = format!("{} WHERE {} = ?1 LIMIT 1", select_sql::<E>(), column);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn update(&self, item: &E) -> Result<bool, AppError> {
        let sql = update_sql::<E>();
        let result = item
            .bind_columns(sqlx::query(&sql))
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn update_if(
        &self,
        item: &E,
        guard_column: &'static str,
        expected: bool,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "{} AND {} = ?{}",
            update_sql::<E>(),
            guard_column,
            E::COLUMNS.len() + 1
        );
        let result = item
            .bind_columns(sqlx::query(&sql))
            .bind(expected)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::{AccessCode, AccessCodeType, Branch, Subject, Tag};
    use crate::test_support::setup_test_db;

    fn subject(id: &str, name: &str, sort_order: i64) -> Subject {
        Subject {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            branch: Branch::Scientific,
            image: None,
            sort_order,
        }
    }

    #[test]
    fn update_sql_reuses_id_placeholder() {
        assert_eq!(update_sql::<Tag>(), "UPDATE tags SET name = ?2 WHERE id = ?1");
        assert_eq!(insert_sql::<Tag>(), "INSERT INTO tags (id, name) VALUES (?1, ?2)");
        assert_eq!(
            upsert_sql::<Tag>(),
            "INSERT INTO tags (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET name = excluded.name"
        );
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_inserts() {
        let pool = setup_test_db().await;
        let store = SqliteStore::<Subject>::new(pool);
        store
            .insert_many(&[subject("s1", "Math", 1)])
            .await
            .expect("Failed to insert subject");

        let written = store
            .upsert_many(&[subject("s1", "Mathematics", 1), subject("s2", "Physics", 2)])
            .await
            .expect("Failed to upsert");
        assert_eq!(written, 2);

        let subjects = store.fetch_all().await.expect("Failed to fetch");
        let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Mathematics", "Physics"]);
    }

    #[tokio::test]
    async fn test_update_if_only_matches_expected_state() {
        let pool = setup_test_db().await;
        let store = SqliteStore::<AccessCode>::new(pool);
        let now = Utc::now();
        let code = AccessCode {
            id: "c1".to_string(),
            name: "Code".to_string(),
            encoded_value: "QR-ABC".to_string(),
            code_type: AccessCodeType::GeneralMonthly,
            subject_id: None,
            subject_name: None,
            valid_from: now,
            valid_until: now,
            is_active: true,
            is_used: false,
            used_at: None,
            used_by_user_id: None,
            created_at: now,
        };
        store
            .insert_many(std::slice::from_ref(&code))
            .await
            .expect("Failed to insert code");

        let found = store
            .find_by("encoded_value", "QR-ABC")
            .await
            .expect("Failed to find")
            .expect("Code not found");
        assert_eq!(found.id, "c1");

        let mut first = code.clone();
        first.is_used = true;
        first.used_by_user_id = Some("U1".to_string());
        assert!(store.update_if(&first, "is_used", false).await.expect("update"));

        let mut second = code;
        second.is_used = true;
        second.used_by_user_id = Some("U2".to_string());
        assert!(!store.update_if(&second, "is_used", false).await.expect("update"));

        let stored = store.find("c1").await.expect("find").expect("missing");
        assert_eq!(stored.used_by_user_id.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_insert_and_fetch_subjects() {
        let pool = setup_test_db().await;
        let store = SqliteStore::<Subject>::new(pool);

        let inserted = store
            .insert_many(&[subject("s2", "Physics", 2), subject("s1", "Math", 1)])
            .await
            .expect("Failed to insert subjects");
        assert_eq!(inserted, 2);

        let subjects = store.fetch_all().await.expect("Failed to fetch subjects");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name, "Math");
        assert_eq!(subjects[1].branch, Branch::Scientific);
    }

    #[tokio::test]
    async fn test_update_and_delete_subject() {
        let pool = setup_test_db().await;
        let store = SqliteStore::<Subject>::new(pool);
        store
            .insert_many(&[subject("s1", "Math", 1)])
            .await
            .expect("Failed to insert subject");

        let mut changed = subject("s1", "Mathematics", 1);
        changed.branch = Branch::Common;
        assert!(store.update(&changed).await.expect("Failed to update"));

        let found = store
            .find("s1")
            .await
            .expect("Failed to find")
            .expect("Subject not found");
        assert_eq!(found.name, "Mathematics");
        assert_eq!(found.branch, Branch::Common);

        assert!(!store.update(&subject("missing", "x", 0)).await.expect("Failed to update"));
        assert!(store.delete("s1").await.expect("Failed to delete"));
        assert!(!store.delete("s1").await.expect("Failed to delete"));
        assert!(store.fetch_all().await.expect("Failed to fetch").is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let pool = setup_test_db().await;
        let store = SqliteStore::<Tag>::new(pool);

        let dup = Tag { id: "t1".to_string(), name: "algebra".to_string() };
        let result = store.insert_many(&[dup.clone(), dup]).await;
        assert!(result.is_err());
        assert!(store.fetch_all().await.expect("Failed to fetch").is_empty());
    }
}
