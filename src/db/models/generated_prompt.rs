use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Generated prompts (compile history)
// ============================================================================

/// A persisted compile result. `metadata`, `character_pack` and
/// `gem_optimization` are stored verbatim as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPrompt {
    pub id: String,
    pub user_id: String,
    pub profile_id: String,
    pub blueprint_id: String,
    pub blueprint_version: i64,
    pub compiled_prompt: String,
    pub seed: String,
    pub score: i64,
    pub warnings: Vec<String>,
    pub metadata: serde_json::Value,
    pub character_pack: Option<serde_json::Value>,
    pub gem_optimization: Option<serde_json::Value>,
    pub created_at: String,
}
