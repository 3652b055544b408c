use std::env;
use std::net::SocketAddr;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://eduadmin.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_CODES_PER_ISSUE: u32 = 500;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: String,
}

impl RestConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("REST_URL")
            .map_err(|_| AppError::Config("REST_URL is not set".to_string()))?;
        let api_key = env::var("REST_API_KEY")
            .map_err(|_| AppError::Config("REST_API_KEY is not set".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub rest: Option<RestConfig>,
    /// Upper bound on `quantity` for a single access-code issuance.
    pub max_codes_per_issue: u32,
    /// Largest accepted import file.
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: StoreBackend::Sqlite,
            rest: None,
            max_codes_per_issue: DEFAULT_MAX_CODES_PER_ISSUE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let backend = match env::var("STORE_BACKEND").as_deref() {
            Err(_) | Ok("sqlite") => StoreBackend::Sqlite,
            Ok("rest") => StoreBackend::Rest,
            Ok(other) => {
                return Err(AppError::Config(format!(
                    "STORE_BACKEND must be 'sqlite' or 'rest', got '{}'",
                    other
                )));
            }
        };

        let rest = match backend {
            StoreBackend::Rest => Some(RestConfig::new_from_env()?),
            StoreBackend::Sqlite => None,
        };

        let max_codes_per_issue = match env::var("MAX_CODES_PER_ISSUE") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| AppError::Config(format!("MAX_CODES_PER_ISSUE is invalid: {}", e)))?,
            Err(_) => DEFAULT_MAX_CODES_PER_ISSUE,
        };

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|e| AppError::Config(format!("MAX_UPLOAD_BYTES is invalid: {}", e)))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            database_url,
            bind_addr,
            backend,
            rest,
            max_codes_per_issue,
            max_upload_bytes,
        })
    }
}
