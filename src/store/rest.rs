//! Relational BaaS reached over its PostgREST endpoint.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::RestConfig;
use crate::error::AppError;
use crate::store::{EntityStore, Record};

pub fn build_client() -> Result<Client, AppError> {
    Client::builder()
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))
}

pub struct RestStore<E> {
    client: Client,
    config: RestConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Record> RestStore<E> {
    pub fn new(client: Client, config: RestConfig) -> Self {
        Self {
            client,
            config,
            _entity: PhantomData,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, E::TABLE)
    }

    /// Table URL with `pairs` as encoded query parameters.
    fn query_url(&self, pairs: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.table_url())
            .map_err(|e| AppError::Config(format!("REST_URL is invalid: {}", e)))?;
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn id_filter(id: &str) -> (&'static str, String) {
        ("id", format!("eq.{}", id))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    async fn checked(response: Response, action: &str) -> Result<Response, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Backend rejected {} on {}: {} {}",
                action,
                E::TABLE,
                status,
                body
            )));
        }
        Ok(response)
    }

    /// PATCH with `filters`; `true` when at least one row changed.
    async fn patch(&self, item: &E, filters: &[(&str, String)]) -> Result<bool, AppError>
    where
        E: Serialize,
    {
        let url = self.query_url(filters)?;
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(item)
            .send()
            .await?;
        let response = Self::checked(response, "update").await?;

        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl<E> EntityStore<E> for RestStore<E>
where
    E: Record + Serialize + DeserializeOwned,
{
    async fn fetch_all(&self) -> Result<Vec<E>, AppError> {
        let url = self.query_url(&[
            ("select", "*".to_string()),
            ("order", format!("{}.asc", E::SORT_COLUMN)),
        ])?;
        let response = self.request(Method::GET, url).send().await?;
        let response = Self::checked(response, "select").await?;

        let body_text = response.text().await?;
        serde_json::from_str::<Vec<E>>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse {} rows: {}", E::TABLE, e);
            AppError::BadRequest(format!("Failed to parse backend response: {}", e))
        })
    }

    async fn find(&self, id: &str) -> Result<Option<E>, AppError> {
        self.find_by("id", id).await
    }

    async fn find_by(&self, column: &'static str, value: &str) -> Result<Option<E>, AppError> {
        let url = self.query_url(&[
            ("select", "*".to_string()),
            (column, format!("eq.{}", value)),
            ("limit", "1".to_string()),
        ])?;
        let response = self.request(Method::GET, url).send().await?;
        let response = Self::checked(response, "select").await?;

        let mut rows: Vec<E> = response.json().await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    async fn insert_many(&self, items: &[E]) -> Result<usize, AppError> {
        if !E::REST_INSERTABLE {
            return Err(AppError::Unimplemented(format!(
                "inserting into {} is not supported by the REST backend",
                E::TABLE
            )));
        }
        if items.is_empty() {
            return Ok(0);
        }

        let response = self
            .request(Method::POST, self.query_url(&[])?)
            .header("Prefer", "return=minimal")
            .json(items)
            .send()
            .await?;
        Self::checked(response, "insert").await?;

        tracing::info!("Inserted {} rows into {}", items.len(), E::TABLE);
        Ok(items.len())
    }

    async fn upsert_many(&self, items: &[E]) -> Result<usize, AppError> {
        if items.is_empty() {
            return Ok(0);
        }

        // Rows the backend cannot create are only ever patched in place.
        if !E::REST_INSERTABLE {
            let mut written = 0;
            for item in items {
                if self.patch(item, &[Self::id_filter(item.id())]).await? {
                    written += 1;
                } else {
                    tracing::warn!("No {} row with id {}, skipped", E::TABLE, item.id());
                }
            }
            return Ok(written);
        }

        let response = self
            .request(Method::POST, self.query_url(&[])?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(items)
            .send()
            .await?;
        Self::checked(response, "upsert").await?;

        tracing::info!("Upserted {} rows into {}", items.len(), E::TABLE);
        Ok(items.len())
    }

    async fn update(&self, item: &E) -> Result<bool, AppError> {
        self.patch(item, &[Self::id_filter(item.id())]).await
    }

    async fn update_if(
        &self,
        item: &E,
        guard_column: &'static str,
        expected: bool,
    ) -> Result<bool, AppError> {
        self.patch(
            item,
            &[Self::id_filter(item.id()), (guard_column, format!("eq.{}", expected))],
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let url = self.query_url(&[Self::id_filter(id)])?;
        let response = self
            .request(Method::DELETE, url)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = Self::checked(response, "delete").await?;

        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(!rows.is_empty())
    }
}
