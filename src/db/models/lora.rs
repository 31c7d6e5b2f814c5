use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// LoRA models
// ============================================================================

/// Training lifecycle of a LoRA version. Training itself happens at the
/// external provider; only `Ready` versions can be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoraStatus {
    Training,
    Ready,
    Failed,
}

impl LoraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "training" => Some(Self::Training),
            "ready" => Some(Self::Ready),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoraModel {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    /// Adapter identifier at the generation provider.
    pub model_name: String,
    pub trigger_word: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoraVersion {
    pub id: String,
    pub lora_id: String,
    pub version: i64,
    pub status: LoraStatus,
    pub default_weight: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoraInput {
    pub name: String,
    pub model_name: String,
    pub trigger_word: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoraVersionInput {
    pub status: Option<LoraStatus>,
    pub default_weight: Option<f64>,
}
