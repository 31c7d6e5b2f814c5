//! LoRA trigger-word syntax and the Character Pack fallback.

use crate::db::models::{Profile, WeightSyntax};

use super::platform_rules::separator;
use super::types::{CharacterPack, CompileInput, LoraActivation};

/// Platform name substrings (lowercase) that accept LoRA trigger-word syntax.
const LORA_PLATFORMS: &[&str] = &[
    "flux",
    "stable diffusion",
    "stable-diffusion",
    "sdxl",
    "sd1.5",
    "sd 1.5",
    "modelslab",
    "comfy",
    "automatic1111",
];

pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 2.0;

pub fn supports_lora(profile: &Profile) -> bool {
    let platform = profile.platform.to_ascii_lowercase();
    LORA_PLATFORMS.iter().any(|p| platform.contains(p))
}

/// Clamp a weight into the accepted range, reporting whether it moved.
pub fn clamp_weight(weight: f64) -> (f64, bool) {
    if !weight.is_finite() {
        return (1.0, true);
    }
    let clamped = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
    (clamped, clamped != weight)
}

/// Render the trigger fragment for a platform that supports LoRA.
///
/// Double-colon platforms weight the trigger word directly; everything else
/// gets the trigger word followed by a `<lora:model:weight>` tag.
pub fn render_trigger(lora: &LoraActivation, weight: f64, profile: &Profile) -> String {
    let trigger = lora.trigger_word.trim();
    match profile.weight_syntax {
        WeightSyntax::DoubleColon if !trigger.is_empty() => format!("{trigger}::{weight:.2}"),
        _ => {
            let tag = format!("<lora:{}:{weight:.2}>", lora.model_name.trim());
            if trigger.is_empty() {
                tag
            } else {
                format!("{trigger}{}{tag}", separator(profile))
            }
        }
    }
}

/// Prose bundle describing the same personalization intent for platforms
/// that only accept plain text guidance.
pub fn build_character_pack(
    lora: &LoraActivation,
    input: &CompileInput,
    profile: &Profile,
) -> CharacterPack {
    let name = lora.model_name.trim().to_string();
    let trigger = lora.trigger_word.trim().to_string();
    let (weight, _) = clamp_weight(lora.weight);

    let mut notes = vec![format!(
        "Keep the character \"{trigger}\" visually consistent across every generation"
    )];
    if !input.subject.trim().is_empty() {
        notes.push(format!("Subject: {}", input.subject.trim()));
    }
    if !input.environment.trim().is_empty() {
        notes.push(format!("Environment: {}", input.environment.trim()));
    }
    notes.push(format!("Source adapter: {name} (version {})", lora.version));

    let strength = if weight >= 1.2 {
        "strongly"
    } else if weight >= 0.6 {
        "clearly"
    } else {
        "subtly"
    };
    let prose = format!(
        "Depict the recurring character known as \"{trigger}\" {strength}, matching their \
         established face, build and styling. Treat \"{trigger}\" as a specific person, \
         not a generic description, and keep identity details unchanged between images."
    );

    CharacterPack {
        name,
        trigger_concept: trigger,
        target_platform: profile.platform.clone(),
        reference_notes: notes,
        prose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::platform_rules::builtin_profiles;

    fn profile(id: &str) -> Profile {
        builtin_profiles().into_iter().find(|p| p.id == id).unwrap()
    }

    fn activation(weight: f64) -> LoraActivation {
        LoraActivation {
            version: 2,
            weight,
            trigger_word: "ohwx woman".into(),
            model_name: "ohwx-v2".into(),
        }
    }

    #[test]
    fn test_allow_list() {
        assert!(supports_lora(&profile("flux-dev")));
        assert!(supports_lora(&profile("sdxl-base")));
        assert!(!supports_lora(&profile("midjourney-v6")));
        assert!(!supports_lora(&profile("dalle-3")));
    }

    #[test]
    fn test_clamp_weight() {
        assert_eq!(clamp_weight(0.8), (0.8, false));
        assert_eq!(clamp_weight(3.5), (2.0, true));
        assert_eq!(clamp_weight(-1.0), (0.0, true));
        assert_eq!(clamp_weight(f64::NAN), (1.0, true));
    }

    #[test]
    fn test_render_trigger_per_syntax() {
        let lora = activation(0.8);
        assert_eq!(
            render_trigger(&lora, 0.8, &profile("flux-dev")),
            "ohwx woman, <lora:ohwx-v2:0.80>"
        );
        assert_eq!(
            render_trigger(&lora, 0.8, &profile("midjourney-v6")),
            "ohwx woman::0.80"
        );
    }

    #[test]
    fn test_character_pack_mentions_trigger() {
        let input = CompileInput {
            subject: "a detective".into(),
            ..CompileInput::default()
        };
        let pack = build_character_pack(&activation(1.4), &input, &profile("midjourney-v6"));
        assert_eq!(pack.trigger_concept, "ohwx woman");
        assert_eq!(pack.target_platform, "Midjourney");
        assert!(pack.prose.contains("strongly"));
        assert!(pack.reference_notes.iter().any(|n| n == "Subject: a detective"));
    }
}
