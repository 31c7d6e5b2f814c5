use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Filters
// ============================================================================

/// Text injected into the prompt when a filter value is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FilterEffect {
    pub text: String,
    /// Emphasis weight; `None` or 1.0 renders the text unweighted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub key: String,
    pub name: String,
    pub options: Vec<String>,
    pub effects: BTreeMap<String, FilterEffect>,
    pub is_premium: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Filter {
    pub fn effect(&self, value: &str) -> Option<&FilterEffect> {
        self.effects.get(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilterInput {
    pub key: String,
    pub name: String,
    pub options: Vec<String>,
    pub effects: BTreeMap<String, FilterEffect>,
    pub is_premium: Option<bool>,
}
