use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Branch {
    Scientific,
    Literary,
    Common,
}

impl Branch {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "scientific" => Some(Branch::Scientific),
            "literary" => Some(Branch::Literary),
            "common" => Some(Branch::Common),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub branch: Branch,
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub name: String,
}
