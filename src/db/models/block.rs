use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Blocks
// ============================================================================

/// A reusable prompt fragment. `template` may reference request fields with
/// `{{subject}}`, `{{context}}`, `{{items}}` and `{{environment}}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub key: String,
    pub name: String,
    pub template: String,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockInput {
    pub key: String,
    pub name: String,
    pub template: String,
    pub category: Option<String>,
}
