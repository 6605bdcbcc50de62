use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One FAQ entry. Lifecycle is owned by the admin surface; the FAQ intent
/// path only ever reads these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub keywords: Vec<String>,
    pub category: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or updating an entry through the admin
/// surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBaseDraft {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_category() -> String {
    "general".to_owned()
}

fn default_active() -> bool {
    true
}
