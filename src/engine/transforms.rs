//! Augmentation pipeline applied to the assembled base prompt.
//!
//! Each transform is a pure `String -> String` step. The pipeline order is
//! fixed by [`build_pipeline`]: LoRA, then cinematic style, then Gemini Gems.

use crate::db::models::Profile;

use super::context::CompileContext;
use super::gems::Gem;
use super::lora;
use super::platform_rules::separator;
use super::types::{CinematicSettings, LoraActivation};

pub struct TransformOutcome {
    pub prompt: String,
    pub warnings: Vec<String>,
}

impl TransformOutcome {
    fn unchanged(prompt: String) -> Self {
        Self { prompt, warnings: Vec::new() }
    }
}

pub trait PromptTransform {
    fn name(&self) -> &'static str;
    fn apply(&self, prompt: String, profile: &Profile) -> TransformOutcome;
}

fn append(prompt: String, fragment: &str, profile: &Profile) -> String {
    if prompt.is_empty() {
        fragment.to_string()
    } else {
        format!("{prompt}{}{fragment}", separator(profile))
    }
}

// ============================================================================
// LoRA
// ============================================================================

/// Appends the trigger word and weight tag. A no-op on platforms outside the
/// LoRA allow-list; the compiler emits a Character Pack for those instead.
pub struct LoraTransform {
    pub activation: LoraActivation,
}

impl PromptTransform for LoraTransform {
    fn name(&self) -> &'static str {
        "lora"
    }

    fn apply(&self, prompt: String, profile: &Profile) -> TransformOutcome {
        if !lora::supports_lora(profile) {
            return TransformOutcome::unchanged(prompt);
        }

        let mut warnings = Vec::new();
        let (weight, clamped) = lora::clamp_weight(self.activation.weight);
        if clamped {
            warnings.push(format!(
                "LoRA weight {} clamped to {weight:.2}",
                self.activation.weight
            ));
        }
        let fragment = lora::render_trigger(&self.activation, weight, profile);
        TransformOutcome {
            prompt: append(prompt, &fragment, profile),
            warnings,
        }
    }
}

// ============================================================================
// Cinematic
// ============================================================================

pub struct CinematicTransform {
    pub settings: CinematicSettings,
}

impl CinematicTransform {
    fn style_block(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(optics) = self.settings.optics.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(format!("Optics: {optics}"));
        }
        let vfx: Vec<&str> = self
            .settings
            .vfx
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if !vfx.is_empty() {
            parts.push(format!("VFX: {}", vfx.join(", ")));
        }
        if let Some(dna) = self.settings.style_dna.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(format!("Style DNA: {dna}"));
        }
        (!parts.is_empty()).then(|| format!("[VISUAL STYLE: {}]", parts.join("; ")))
    }
}

impl PromptTransform for CinematicTransform {
    fn name(&self) -> &'static str {
        "cinematic"
    }

    fn apply(&self, prompt: String, _profile: &Profile) -> TransformOutcome {
        match self.style_block() {
            Some(block) if prompt.is_empty() => TransformOutcome::unchanged(block),
            Some(block) => TransformOutcome::unchanged(format!("{block} {prompt}")),
            None => TransformOutcome::unchanged(prompt),
        }
    }
}

// ============================================================================
// Gemini Gems
// ============================================================================

pub struct GemsTransform {
    pub gems: Vec<&'static Gem>,
}

impl PromptTransform for GemsTransform {
    fn name(&self) -> &'static str {
        "gemini_gems"
    }

    fn apply(&self, prompt: String, profile: &Profile) -> TransformOutcome {
        let prompt = self
            .gems
            .iter()
            .fold(prompt, |acc, gem| append(acc, gem.directive, profile));
        TransformOutcome::unchanged(prompt)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub fn build_pipeline(ctx: &CompileContext, gems: &[&'static Gem]) -> Vec<Box<dyn PromptTransform>> {
    let mut pipeline: Vec<Box<dyn PromptTransform>> = Vec::new();
    if let Some(activation) = ctx.active_lora() {
        pipeline.push(Box::new(LoraTransform { activation: activation.clone() }));
    }
    if let Some(settings) = ctx.cinematic() {
        pipeline.push(Box::new(CinematicTransform { settings: settings.clone() }));
    }
    if !gems.is_empty() {
        pipeline.push(Box::new(GemsTransform { gems: gems.to_vec() }));
    }
    pipeline
}

pub struct PipelineOutput {
    pub prompt: String,
    /// Names of transforms that changed the prompt, in order.
    pub applied: Vec<&'static str>,
    pub warnings: Vec<String>,
}

pub fn run_pipeline(pipeline: &[Box<dyn PromptTransform>], base: String, profile: &Profile) -> PipelineOutput {
    pipeline.iter().fold(
        PipelineOutput { prompt: base, applied: Vec::new(), warnings: Vec::new() },
        |mut out, transform| {
            let before = out.prompt.clone();
            let outcome = transform.apply(out.prompt, profile);
            if outcome.prompt != before {
                out.applied.push(transform.name());
            }
            out.warnings.extend(outcome.warnings);
            out.prompt = outcome.prompt;
            out
        },
    )
}
