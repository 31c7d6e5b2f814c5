use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Compile input
// ============================================================================

/// The request DTO for a single compile. Field presence and types are
/// enforced by the HTTP layer; the compiler only interprets values.
///
/// `filters` is ordered by key, which fixes the order filter fragments are
/// emitted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompileInput {
    pub profile_id: String,
    pub blueprint_id: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub restrictions: Vec<String>,
}

/// An activated LoRA adapter for one compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoraActivation {
    pub version: i64,
    pub weight: f64,
    pub trigger_word: String,
    pub model_name: String,
}

/// Free-form cinematic modifiers, prefixed as a `[VISUAL STYLE: ...]` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CinematicSettings {
    #[serde(default)]
    pub optics: Option<String>,
    #[serde(default)]
    pub vfx: Vec<String>,
    #[serde(default)]
    pub style_dna: Option<String>,
}

impl CinematicSettings {
    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map(str::trim).unwrap_or("").is_empty();
        blank(&self.optics) && blank(&self.style_dna) && self.vfx.iter().all(|v| v.trim().is_empty())
    }
}

// ============================================================================
// Compile output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompileMetadata {
    pub profile_id: String,
    pub blueprint_id: String,
    pub blueprint_version: i64,
    /// Filters whose selected value was recognized.
    pub filter_count: usize,
    /// Blocks whose text made it into the prompt.
    pub block_count: usize,
    pub dropped_blocks: Vec<String>,
    pub dropped_filters: Vec<String>,
    pub constraint_violations: usize,
    /// Transforms that changed the prompt, in pipeline order.
    pub transforms: Vec<String>,
    pub truncated: bool,
    pub negative_prompt: Option<String>,
    pub lora_applied: bool,
}

/// Deterministic given identical input and catalog state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub compiled_prompt: String,
    pub seed: String,
    /// Guidance signal in 0..=100; never gates the result.
    pub score: u8,
    pub warnings: Vec<String>,
    pub metadata: CompileMetadata,
}

/// Text-only personalization bundle for platforms that cannot consume
/// LoRA trigger-word syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPack {
    pub name: String,
    pub trigger_concept: String,
    pub target_platform: String,
    pub reference_notes: Vec<String>,
    pub prose: String,
}

/// Auxiliary payload produced by Gemini Gems presets. Returned next to the
/// compiled prompt, never merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GemOptimization {
    pub applied_gems: Vec<String>,
    pub negative_prompt: String,
    pub recommendations: Vec<String>,
}

/// A compile result plus its optional side payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    #[serde(flatten)]
    pub result: CompileResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_pack: Option<CharacterPack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gem_optimization: Option<GemOptimization>,
}
