//! Prompt compiler: explicit multi-stage pipeline from a compile context and
//! a catalog snapshot to a compiled prompt.
//!
//!   resolve profile/blueprint → blocks → filter effects → join → constraints
//!   → transforms (LoRA → cinematic → Gems) → platform formatting → seed/score
//!
//! The compiler is a pure function of its inputs. It only fails for
//! references it cannot resolve at all (unknown profile or blueprint);
//! every data-quality problem degrades into a warning.

use std::sync::LazyLock;

use regex::Regex;

use crate::db::models::Profile;
use crate::error::AppError;

use super::catalog::CatalogSnapshot;
use super::constraints::{self, ConstraintSubject};
use super::context::CompileContext;
use super::gems::{self, Gem};
use super::lora;
use super::platform_rules::{self, separator};
use super::scoring::{self, ScoreInputs, ScoringPolicy};
use super::seed;
use super::transforms::{self, PipelineOutput};
use super::types::{CompileInput, CompileMetadata, CompileOutput, CompileResult};

// ============================================================================
// Compilation Stages
// ============================================================================

/// Named stages of the compile pipeline, always run in this order. Each stage
/// runs inside its own `compile_stage` tracing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationStage {
    /// Look up the profile and blueprint.
    Resolve,
    /// Turn blueprint block keys into text fragments.
    BlockResolution,
    /// Append filter-effect fragments.
    FilterEffects,
    /// Check blueprint constraint rules against the assembled prompt.
    Constraints,
    /// Apply LoRA, cinematic and Gemini Gems transforms within the length limit.
    Transforms,
    /// Attach negatives per profile rules.
    PlatformFormat,
    /// Derive seed and score.
    Finalize,
}

impl CompilationStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolve => "Resolving references",
            Self::BlockResolution => "Resolving blocks",
            Self::FilterEffects => "Applying filters",
            Self::Constraints => "Checking constraints",
            Self::Transforms => "Applying transforms",
            Self::PlatformFormat => "Formatting for platform",
            Self::Finalize => "Scoring",
        }
    }

    fn enter(self) -> tracing::span::EnteredSpan {
        tracing::debug_span!("compile_stage", stage = self.label()).entered()
    }
}

// ============================================================================
// Blueprint resolution
// ============================================================================

/// The blueprint a compile runs against, regardless of where it came from.
struct ResolvedBlueprint<'a> {
    id: &'a str,
    version: i64,
    blocks: &'a [String],
    constraints: &'a [String],
}

fn resolve_blueprint<'a>(
    ctx: &'a CompileContext,
    catalog: &'a CatalogSnapshot,
) -> Result<ResolvedBlueprint<'a>, AppError> {
    let id = ctx.input().blueprint_id.as_str();

    if let Some(reg) = ctx.user_blueprint().filter(|r| r.id == id) {
        return Ok(ResolvedBlueprint {
            id: &reg.id,
            version: reg.version,
            blocks: &reg.blocks,
            constraints: &reg.constraints,
        });
    }

    catalog
        .blueprint(id)
        .map(|bp| ResolvedBlueprint {
            id: &bp.id,
            version: bp.version,
            blocks: &bp.blocks,
            constraints: &bp.constraints,
        })
        .ok_or_else(|| AppError::Validation(format!("Unknown blueprint '{id}'")))
}

// ============================================================================
// Block resolution
// ============================================================================

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_]+)\s*\}\}").expect("placeholder pattern is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Substitute `{{field}}` placeholders from the request. Unknown placeholder
/// names are replaced with nothing and reported.
fn render_template(template: &str, input: &CompileInput, block_key: &str, warnings: &mut Vec<String>) -> String {
    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        match caps[1].to_ascii_lowercase().as_str() {
            "subject" => input.subject.trim().to_string(),
            "context" => input.context.trim().to_string(),
            "environment" => input.environment.trim().to_string(),
            "items" => input
                .items
                .iter()
                .map(|i| i.trim())
                .filter(|i| !i.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            other => {
                warnings.push(format!("Block '{block_key}' references unknown placeholder '{other}'"));
                String::new()
            }
        }
    });
    WHITESPACE_RUN.replace_all(rendered.trim(), " ").into_owned()
}

#[derive(Default)]
struct Assembly {
    fragments: Vec<String>,
    applied: usize,
    dropped: Vec<String>,
}

fn resolve_blocks(
    blueprint: &ResolvedBlueprint,
    input: &CompileInput,
    catalog: &CatalogSnapshot,
    warnings: &mut Vec<String>,
) -> Assembly {
    let mut out = Assembly::default();
    for key in blueprint.blocks {
        let Some(block) = catalog.block(key) else {
            warnings.push(format!("Unknown block '{key}' skipped"));
            out.dropped.push(key.clone());
            continue;
        };
        let text = render_template(&block.template, input, key, warnings);
        if text.is_empty() {
            warnings.push(format!("Block '{key}' rendered empty and was skipped"));
            out.dropped.push(key.clone());
            continue;
        }
        out.fragments.push(text);
        out.applied += 1;
    }
    out
}

// ============================================================================
// Filter effects
// ============================================================================

fn resolve_filters(
    input: &CompileInput,
    catalog: &CatalogSnapshot,
    profile: &Profile,
    warnings: &mut Vec<String>,
) -> Assembly {
    let mut out = Assembly::default();
    for (key, value) in &input.filters {
        let Some(filter) = catalog.filter(key) else {
            warnings.push(format!("Unknown filter '{key}' ignored"));
            out.dropped.push(key.clone());
            continue;
        };
        let Some(effect) = filter.effect(value) else {
            warnings.push(format!("Unknown value '{value}' for filter '{key}' ignored"));
            out.dropped.push(key.clone());
            continue;
        };
        let text = effect.text.trim();
        if text.is_empty() {
            // A deliberate "none" option: recognized, contributes nothing.
            out.applied += 1;
            continue;
        }
        out.fragments
            .push(platform_rules::render_weighted(text, effect.weight, profile.weight_syntax));
        out.applied += 1;
    }
    out
}

// ============================================================================
// Transforms within the length limit
// ============================================================================

struct Fitted {
    output: PipelineOutput,
    truncated: bool,
    dropped_transforms: Vec<&'static str>,
}

/// Run the transform pipeline so the result fits the profile's length limit.
///
/// Transform fragments are never split. The base prompt is cut at a boundary
/// to leave room for them; when even that would leave no base prompt at all,
/// the last transform is dropped and fitting starts over.
fn transform_within_limit(ctx: &CompileContext, gems: &[&'static Gem], base: String, profile: &Profile) -> Fitted {
    let mut pipeline = transforms::build_pipeline(ctx, gems);
    let Some(max) = platform_rules::length_limit(profile) else {
        return Fitted {
            output: transforms::run_pipeline(&pipeline, base, profile),
            truncated: false,
            dropped_transforms: Vec::new(),
        };
    };

    let base_len = base.chars().count();
    let mut dropped_transforms = Vec::new();
    loop {
        let full = transforms::run_pipeline(&pipeline, base.clone(), profile);
        let total = full.prompt.chars().count();
        if total <= max {
            return Fitted {
                output: full,
                truncated: !dropped_transforms.is_empty(),
                dropped_transforms,
            };
        }

        // Transform overhead is independent of the base text once it is non-empty.
        let overhead = total.saturating_sub(base_len);
        if overhead < max {
            let (cut, _) = platform_rules::truncate_at_boundary(&base, max - overhead, separator(profile));
            if !cut.is_empty() || base.is_empty() {
                return Fitted {
                    output: transforms::run_pipeline(&pipeline, cut, profile),
                    truncated: true,
                    dropped_transforms,
                };
            }
        }

        match pipeline.pop() {
            Some(transform) => dropped_transforms.push(transform.name()),
            None => {
                let (cut, _) = platform_rules::truncate_at_boundary(&base, max, separator(profile));
                return Fitted {
                    output: transforms::run_pipeline(&pipeline, cut, profile),
                    truncated: true,
                    dropped_transforms,
                };
            }
        }
    }
}

// ============================================================================
// Compile
// ============================================================================

pub fn compile(
    ctx: &CompileContext,
    catalog: &CatalogSnapshot,
    policy: &ScoringPolicy,
) -> Result<CompileOutput, AppError> {
    let input = ctx.input();

    let (profile, blueprint) = {
        let _stage = CompilationStage::Resolve.enter();
        let profile = catalog
            .profile(&input.profile_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown profile '{}'", input.profile_id)))?;
        (profile, resolve_blueprint(ctx, catalog)?)
    };
    let mut warnings: Vec<String> = Vec::new();

    // Blocks, then filters, in that order
    let blocks = {
        let _stage = CompilationStage::BlockResolution.enter();
        resolve_blocks(&blueprint, input, catalog, &mut warnings)
    };
    let filters = {
        let _stage = CompilationStage::FilterEffects.enter();
        resolve_filters(input, catalog, profile, &mut warnings)
    };
    let assembled = blocks
        .fragments
        .iter()
        .chain(filters.fragments.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator(profile));

    let violations = {
        let _stage = CompilationStage::Constraints.enter();
        let report = constraints::evaluate(
            blueprint.constraints,
            &ConstraintSubject { input, prompt: &assembled },
        );
        let violations = report.violations.len();
        warnings.extend(report.violations);
        warnings.extend(report.unparsed);
        violations
    };

    let (selected_gems, fitted, character_pack) = {
        let _stage = CompilationStage::Transforms.enter();
        let selected_gems = gems::select(ctx.gems(), &mut warnings);
        let fitted = transform_within_limit(ctx, &selected_gems, assembled, profile);
        warnings.extend(fitted.output.warnings.iter().cloned());
        for name in &fitted.dropped_transforms {
            warnings.push(format!(
                "Transform '{name}' dropped to fit {} characters for profile '{}'",
                profile.max_length.unwrap_or_default(),
                profile.name
            ));
        }
        if fitted.truncated {
            warnings.push(format!(
                "Prompt truncated to {} characters for profile '{}'",
                profile.max_length.unwrap_or_default(),
                profile.name
            ));
        }

        let character_pack = match ctx.active_lora() {
            Some(activation) if !lora::supports_lora(profile) => {
                warnings.push(format!(
                    "Profile '{}' does not support LoRA trigger words; returning a Character Pack instead",
                    profile.name
                ));
                Some(lora::build_character_pack(activation, input, profile))
            }
            _ => None,
        };
        (selected_gems, fitted, character_pack)
    };

    let formatted = {
        let _stage = CompilationStage::PlatformFormat.enter();
        platform_rules::attach_negatives(fitted.output.prompt, &input.restrictions, profile)
    };

    let _stage = CompilationStage::Finalize.enter();
    let seed = seed::derive_seed(ctx, blueprint.version);
    let score = scoring::score(
        &ScoreInputs {
            applied: blocks.applied + filters.applied,
            dropped: blocks.dropped.len() + filters.dropped.len(),
            violations,
            truncated: fitted.truncated,
        },
        policy,
    );

    tracing::debug!(
        profile = %profile.id,
        blueprint = %blueprint.id,
        version = blueprint.version,
        score,
        warnings = warnings.len(),
        "Prompt compiled"
    );

    // Applied transforms come from the final fitted run, so anything dropped
    // for length is not reported.
    let applied = fitted.output.applied;
    let gem_optimization = if applied.contains(&"gemini_gems") {
        gems::optimization(&selected_gems)
    } else {
        None
    };

    let result = CompileResult {
        compiled_prompt: formatted.prompt,
        seed,
        score,
        warnings,
        metadata: CompileMetadata {
            profile_id: profile.id.clone(),
            blueprint_id: blueprint.id.to_string(),
            blueprint_version: blueprint.version,
            filter_count: filters.applied,
            block_count: blocks.applied,
            dropped_blocks: blocks.dropped,
            dropped_filters: filters.dropped,
            constraint_violations: violations,
            transforms: applied.iter().map(|s| s.to_string()).collect(),
            truncated: fitted.truncated,
            negative_prompt: formatted.negative_prompt,
            lora_applied: applied.contains(&"lora"),
        },
    };

    Ok(CompileOutput {
        result,
        character_pack,
        gem_optimization,
    })
}

// ============================================================================
// Tests
// ============================================================================
