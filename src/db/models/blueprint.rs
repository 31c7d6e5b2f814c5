use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Blueprints (versioned)
// ============================================================================

/// A blueprint with its current (highest) version's blocks and constraints.
/// `owner_user_id` is `None` for system catalog blueprints.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub owner_user_id: Option<String>,
    pub version: i64,
    pub blocks: Vec<String>,
    pub constraints: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Blueprint {
    pub fn is_system(&self) -> bool {
        self.owner_user_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintVersion {
    pub id: String,
    pub blueprint_id: String,
    pub version: i64,
    pub blocks: Vec<String>,
    pub constraints: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlueprintInput {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub blocks: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Metadata fields update in place; any change to `blocks` or `constraints`
/// produces a new version.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlueprintInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub blocks: Option<Vec<String>>,
    pub constraints: Option<Vec<String>>,
}
