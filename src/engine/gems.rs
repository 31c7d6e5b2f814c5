//! Gemini Gems, named optimization presets.
//!
//! Each gem contributes a directive appended to the prompt (through
//! [`super::transforms::GemsTransform`]) plus negative terms and a
//! recommendation that are returned in a separate [`GemOptimization`].

use super::types::GemOptimization;

#[derive(Debug, PartialEq, Eq)]
pub struct Gem {
    pub key: &'static str,
    pub label: &'static str,
    pub directive: &'static str,
    pub negatives: &'static [&'static str],
    pub recommendation: &'static str,
}

pub const GEMS: &[Gem] = &[
    Gem {
        key: "biometric_preservation",
        label: "Biometric Preservation",
        directive: "preserve exact facial structure, eye shape and skin tone of the reference identity",
        negatives: &["face distortion", "identity drift", "asymmetric eyes"],
        recommendation: "Use a reference image with a neutral expression and even lighting.",
    },
    Gem {
        key: "hyper_realism",
        label: "Hyper Realism",
        directive: "photorealistic, true-to-life materials, physically accurate light falloff",
        negatives: &["cartoon", "illustration", "plastic skin", "oversaturated"],
        recommendation: "Pair with a prime-lens optics setting for natural depth of field.",
    },
    Gem {
        key: "skin_texture",
        label: "Skin Texture",
        directive: "natural skin texture with visible pores and subtle imperfections",
        negatives: &["airbrushed skin", "waxy skin"],
        recommendation: "Keep sharpening low to avoid exaggerated pores.",
    },
    Gem {
        key: "cinematic_lighting",
        label: "Cinematic Lighting",
        directive: "motivated cinematic lighting with soft key and controlled contrast",
        negatives: &["flat lighting", "blown highlights"],
        recommendation: "Combine with a single lighting filter to avoid conflicting light sources.",
    },
    Gem {
        key: "anatomy_guard",
        label: "Anatomy Guard",
        directive: "anatomically correct hands and limbs, natural proportions",
        negatives: &["extra fingers", "fused fingers", "malformed limbs"],
        recommendation: "Prefer mid-shot framing when hands are visible.",
    },
];

fn normalize(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
}

pub fn lookup(name: &str) -> Option<&'static Gem> {
    let key = normalize(name);
    GEMS.iter().find(|g| g.key == key)
}

/// Resolve requested gem names in request order, dropping duplicates.
/// Unknown names become warnings.
pub fn select(names: &[String], warnings: &mut Vec<String>) -> Vec<&'static Gem> {
    let mut selected: Vec<&'static Gem> = Vec::new();
    for name in names {
        match lookup(name) {
            Some(gem) if !selected.contains(&gem) => selected.push(gem),
            Some(_) => {}
            None => warnings.push(format!("Unknown Gemini Gem '{}' ignored", name.trim())),
        }
    }
    selected
}

/// Side payload for the selected gems, or `None` when nothing was selected.
pub fn optimization(gems: &[&'static Gem]) -> Option<GemOptimization> {
    if gems.is_empty() {
        return None;
    }

    let mut negatives: Vec<&str> = Vec::new();
    for term in gems.iter().flat_map(|g| g.negatives.iter().copied()) {
        if !negatives.contains(&term) {
            negatives.push(term);
        }
    }

    Some(GemOptimization {
        applied_gems: gems.iter().map(|g| g.key.to_string()).collect(),
        negative_prompt: negatives.join(", "),
        recommendations: gems.iter().map(|g| g.recommendation.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_normalizes_names() {
        assert_eq!(lookup("Hyper Realism").map(|g| g.key), Some("hyper_realism"));
        assert_eq!(lookup("skin-texture").map(|g| g.key), Some("skin_texture"));
        assert!(lookup("glitter").is_none());
    }

    #[test]
    fn test_select_dedupes_and_warns() {
        let mut warnings = Vec::new();
        let names = vec![
            "anatomy_guard".to_string(),
            "glitter".to_string(),
            "Anatomy Guard".to_string(),
            "hyper_realism".to_string(),
        ];
        let gems = select(&names, &mut warnings);
        let keys: Vec<&str> = gems.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["anatomy_guard", "hyper_realism"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("glitter"));
    }

    #[test]
    fn test_optimization_payload() {
        assert!(optimization(&[]).is_none());

        let gems = vec![lookup("skin_texture").unwrap(), lookup("hyper_realism").unwrap()];
        let opt = optimization(&gems).unwrap();
        assert_eq!(opt.applied_gems, vec!["skin_texture", "hyper_realism"]);
        assert!(opt.negative_prompt.starts_with("airbrushed skin, waxy skin, cartoon"));
        assert_eq!(opt.recommendations.len(), 2);
    }
}
