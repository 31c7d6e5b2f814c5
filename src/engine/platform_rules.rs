//! Platform formatting rules.
//!
//! Profiles carry the data (weight syntax, negative syntax, separator, length
//! limit); this module holds the built-in profile definitions and the
//! functions that apply those rules to a compiled prompt.

use crate::db::models::{NegativeSyntax, Profile, WeightSyntax};

// ============================================================================
// Built-in profiles
// ============================================================================

pub fn builtin_profiles() -> Vec<Profile> {
    vec![
        profile("midjourney-v6", "Midjourney v6", "Midjourney", Some(600), WeightSyntax::DoubleColon, NegativeSyntax::Flag),
        profile("flux-dev", "Flux Dev", "Flux", Some(1000), WeightSyntax::Parenthesized, NegativeSyntax::None),
        profile("sdxl-base", "SDXL Base", "SDXL", Some(750), WeightSyntax::Parenthesized, NegativeSyntax::None),
        profile("dalle-3", "DALL-E 3", "DALL-E", Some(4000), WeightSyntax::None, NegativeSyntax::Inline),
    ]
}

fn profile(
    id: &str,
    name: &str,
    platform: &str,
    max_length: Option<i64>,
    weight_syntax: WeightSyntax,
    negative_syntax: NegativeSyntax,
) -> Profile {
    let now = chrono::Utc::now().to_rfc3339();
    Profile {
        id: id.into(),
        name: name.into(),
        platform: platform.into(),
        max_length,
        weight_syntax,
        negative_syntax,
        separator: DEFAULT_SEPARATOR.into(),
        is_builtin: true,
        created_at: now.clone(),
        updated_at: now,
    }
}

pub const DEFAULT_SEPARATOR: &str = ", ";

/// The separator to join fragments with; blank separators fall back to `", "`.
pub fn separator(profile: &Profile) -> &str {
    if profile.separator.is_empty() {
        DEFAULT_SEPARATOR
    } else {
        &profile.separator
    }
}

// ============================================================================
// Weight syntax
// ============================================================================

pub fn render_weighted(text: &str, weight: Option<f64>, syntax: WeightSyntax) -> String {
    let weight = match weight {
        Some(w) if w.is_finite() && (w - 1.0).abs() > f64::EPSILON => w,
        _ => return text.to_string(),
    };
    match syntax {
        WeightSyntax::Parenthesized => format!("({text}:{weight:.2})"),
        WeightSyntax::DoubleColon => format!("{text}::{weight:.2}"),
        WeightSyntax::None => text.to_string(),
    }
}

// ============================================================================
// Final formatting
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedPrompt {
    pub prompt: String,
    /// Restrictions joined with `", "`, reported even when the platform takes
    /// negatives out of band.
    pub negative_prompt: Option<String>,
}

/// The profile's positive-prompt length limit in characters, if any.
pub fn length_limit(profile: &Profile) -> Option<usize> {
    profile.max_length.filter(|l| *l > 0).map(|l| l as usize)
}

/// Attach restrictions per the profile's negative syntax. The positive prompt
/// is expected to already fit [`length_limit`].
pub fn attach_negatives(mut prompt: String, restrictions: &[String], profile: &Profile) -> FormattedPrompt {
    let terms: Vec<&str> = restrictions
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    let negative_prompt = (!terms.is_empty()).then(|| terms.join(", "));

    if let Some(ref negative) = negative_prompt {
        match profile.negative_syntax {
            NegativeSyntax::Flag => prompt.push_str(&format!(" --no {negative}")),
            NegativeSyntax::Inline => prompt.push_str(&format!(" [avoid: {negative}]")),
            NegativeSyntax::None => {}
        }
    }

    FormattedPrompt { prompt, negative_prompt }
}

/// Cut `text` to at most `max` characters, preferring the last separator,
/// then the last whitespace, inside the limit.
pub fn truncate_at_boundary(text: &str, max: usize, separator: &str) -> (String, bool) {
    if text.chars().count() <= max {
        return (text.to_string(), false);
    }

    let cut = text
        .char_indices()
        .nth(max)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let boundary = head
        .rfind(separator)
        .filter(|idx| *idx > 0)
        .or_else(|| head.rfind(char::is_whitespace).filter(|idx| *idx > 0))
        .unwrap_or(cut);

    (head[..boundary].trim_end().to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(id: &str) -> Profile {
        builtin_profiles().into_iter().find(|p| p.id == id).unwrap()
    }

    #[test]
    fn test_builtin_profiles_are_unique() {
        let profiles = builtin_profiles();
        let mut ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), profiles.len());
    }

    #[test]
    fn test_render_weighted() {
        assert_eq!(render_weighted("neon", None, WeightSyntax::Parenthesized), "neon");
        assert_eq!(render_weighted("neon", Some(1.0), WeightSyntax::Parenthesized), "neon");
        assert_eq!(render_weighted("neon", Some(1.3), WeightSyntax::Parenthesized), "(neon:1.30)");
        assert_eq!(render_weighted("neon", Some(0.5), WeightSyntax::DoubleColon), "neon::0.50");
        assert_eq!(render_weighted("neon", Some(1.3), WeightSyntax::None), "neon");
    }

    #[test]
    fn test_truncate_prefers_separator() {
        let (out, cut) = truncate_at_boundary("soft light, wide angle shot, neon", 20, ", ");
        assert!(cut);
        assert_eq!(out, "soft light");
    }

    #[test]
    fn test_truncate_falls_back_to_whitespace() {
        let (out, cut) = truncate_at_boundary("cinematic dramatic portrait", 15, ", ");
        assert!(cut);
        assert_eq!(out, "cinematic");
    }

    #[test]
    fn test_truncate_noop_within_limit() {
        assert_eq!(truncate_at_boundary("short", 10, ", "), ("short".to_string(), false));
    }

    #[test]
    fn test_truncate_to_zero_is_empty() {
        assert_eq!(truncate_at_boundary("soft light", 0, ", "), (String::new(), true));
    }

    #[test]
    fn test_length_limit_ignores_non_positive() {
        let mut p = find("flux-dev");
        assert_eq!(length_limit(&p), Some(1000));
        p.max_length = Some(0);
        assert_eq!(length_limit(&p), None);
        p.max_length = None;
        assert_eq!(length_limit(&p), None);
    }

    #[test]
    fn test_negative_syntax() {
        let restrictions = vec!["blur".to_string(), " ".to_string(), "text".to_string()];

        let mj = attach_negatives("a cat".into(), &restrictions, &find("midjourney-v6"));
        assert_eq!(mj.prompt, "a cat --no blur, text");
        assert_eq!(mj.negative_prompt.as_deref(), Some("blur, text"));

        let dalle = attach_negatives("a cat".into(), &restrictions, &find("dalle-3"));
        assert_eq!(dalle.prompt, "a cat [avoid: blur, text]");

        let flux = attach_negatives("a cat".into(), &restrictions, &find("flux-dev"));
        assert_eq!(flux.prompt, "a cat");
        assert_eq!(flux.negative_prompt.as_deref(), Some("blur, text"));
    }
}
