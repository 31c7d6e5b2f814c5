//! Per-request compile context.
//!
//! Everything a single compile needs beyond the catalog snapshot lives here:
//! the request input, a transiently registered user blueprint, the active
//! LoRA and the augmentation settings. A context is built fresh for every
//! request and never shared, so no LoRA or style state can leak from one
//! request into another.

use serde::{Deserialize, Serialize};

use crate::db::models::Blueprint;

use super::types::{CinematicSettings, CompileInput, LoraActivation};

/// A user-authored blueprint registered for one compile. It resolves through
/// the same path as catalog blueprints and takes precedence on id clashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBlueprintRegistration {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub version: i64,
    pub blocks: Vec<String>,
    pub constraints: Vec<String>,
}

impl From<&Blueprint> for UserBlueprintRegistration {
    fn from(bp: &Blueprint) -> Self {
        Self {
            id: bp.id.clone(),
            name: bp.name.clone(),
            description: bp.description.clone(),
            category: bp.category.clone(),
            version: bp.version,
            blocks: bp.blocks.clone(),
            constraints: bp.constraints.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileContext {
    input: CompileInput,
    user_blueprint: Option<UserBlueprintRegistration>,
    lora: Option<LoraActivation>,
    cinematic: Option<CinematicSettings>,
    gems: Vec<String>,
}

impl CompileContext {
    pub fn new(input: CompileInput) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    pub fn register_user_blueprint(mut self, registration: UserBlueprintRegistration) -> Self {
        self.user_blueprint = Some(registration);
        self
    }

    /// `None` compiles without any LoRA.
    pub fn set_active_lora(mut self, lora: Option<LoraActivation>) -> Self {
        self.lora = lora;
        self
    }

    pub fn with_cinematic(mut self, settings: Option<CinematicSettings>) -> Self {
        self.cinematic = settings.filter(|s| !s.is_empty());
        self
    }

    pub fn with_gems(mut self, gems: Vec<String>) -> Self {
        self.gems = gems;
        self
    }

    pub fn input(&self) -> &CompileInput {
        &self.input
    }

    pub fn user_blueprint(&self) -> Option<&UserBlueprintRegistration> {
        self.user_blueprint.as_ref()
    }

    pub fn active_lora(&self) -> Option<&LoraActivation> {
        self.lora.as_ref()
    }

    pub fn cinematic(&self) -> Option<&CinematicSettings> {
        self.cinematic.as_ref()
    }

    pub fn gems(&self) -> &[String] {
        &self.gems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cinematic_is_dropped() {
        let ctx = CompileContext::new(CompileInput::default())
            .with_cinematic(Some(CinematicSettings {
                optics: Some("   ".into()),
                vfx: vec![],
                style_dna: None,
            }));
        assert!(ctx.cinematic().is_none());
    }

    #[test]
    fn test_lora_can_be_cleared() {
        let lora = LoraActivation {
            version: 1,
            weight: 0.8,
            trigger_word: "ohwx".into(),
            model_name: "ohwx-v1".into(),
        };
        let ctx = CompileContext::new(CompileInput::default()).set_active_lora(Some(lora));
        assert!(ctx.active_lora().is_some());
        let ctx = ctx.set_active_lora(None);
        assert!(ctx.active_lora().is_none());
    }
}
