//! Deterministic seed derivation.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::context::CompileContext;
use super::types::{CinematicSettings, CompileInput, LoraActivation};

/// Canonical form hashed when no seed is supplied. Field order is fixed by
/// the struct and the filter map is ordered, so the JSON is stable.
#[derive(Serialize)]
struct SeedMaterial<'a> {
    input: &'a CompileInput,
    blueprint_version: i64,
    lora: Option<&'a LoraActivation>,
    cinematic: Option<&'a CinematicSettings>,
    gems: &'a [String],
}

/// A supplied, non-blank seed is echoed back trimmed. Otherwise the seed is
/// the first four bytes of a SHA-256 over the context, as a decimal `u32`.
pub fn derive_seed(ctx: &CompileContext, blueprint_version: i64) -> String {
    if let Some(seed) = ctx.input().seed.as_deref().map(str::trim) {
        if !seed.is_empty() {
            return seed.to_string();
        }
    }

    let material = SeedMaterial {
        input: ctx.input(),
        blueprint_version,
        lora: ctx.active_lora(),
        cinematic: ctx.cinematic(),
        gems: ctx.gems(),
    };
    // Serializing plain data into a Vec cannot fail.
    let bytes = serde_json::to_vec(&material).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    tracing::trace!(seed, digest = %hex::encode(&digest[..8]), "Derived seed");
    seed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(seed: Option<&str>, subject: &str) -> CompileContext {
        CompileContext::new(CompileInput {
            profile_id: "flux-dev".into(),
            blueprint_id: "bp-1".into(),
            seed: seed.map(String::from),
            subject: subject.into(),
            ..CompileInput::default()
        })
    }

    #[test]
    fn test_supplied_seed_is_echoed() {
        assert_eq!(derive_seed(&ctx(Some(" 12345 "), "cat"), 1), "12345");
    }

    #[test]
    fn test_blank_seed_is_derived() {
        let derived = derive_seed(&ctx(Some("  "), "cat"), 1);
        assert!(derived.parse::<u32>().is_ok());
    }

    #[test]
    fn test_derived_seed_is_stable_and_input_sensitive() {
        let a = derive_seed(&ctx(None, "cat"), 1);
        assert_eq!(a, derive_seed(&ctx(None, "cat"), 1));
        assert_ne!(a, derive_seed(&ctx(None, "dog"), 1));
        assert_ne!(a, derive_seed(&ctx(None, "cat"), 2));
    }
}
