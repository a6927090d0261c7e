use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KapacitorRecord {
    pub id: i64,
    pub src_id: i64,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub active: bool,
}
