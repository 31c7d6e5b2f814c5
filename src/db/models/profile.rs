use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Profile: target platform descriptor
// ============================================================================

/// How a weighted fragment is rendered for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum WeightSyntax {
    /// `(text:1.20)`: Stable Diffusion / Flux style.
    Parenthesized,
    /// `text::1.20`: Midjourney multi-prompt style.
    DoubleColon,
    /// Weights are dropped; the text is emitted as-is.
    None,
}

impl WeightSyntax {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parenthesized => "parenthesized",
            Self::DoubleColon => "double_colon",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parenthesized" => Some(Self::Parenthesized),
            "double_colon" => Some(Self::DoubleColon),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// How restrictions (negative terms) are attached to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum NegativeSyntax {
    /// ` --no a, b` suffix.
    Flag,
    /// ` [avoid: a, b]` suffix.
    Inline,
    /// Platform takes negatives out of band; only reported in metadata.
    None,
}

impl NegativeSyntax {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Inline => "inline",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flag" => Some(Self::Flag),
            "inline" => Some(Self::Inline),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Platform family name, matched against the LoRA allow-list.
    pub platform: String,
    /// Maximum length of the positive prompt in characters.
    pub max_length: Option<i64>,
    pub weight_syntax: WeightSyntax,
    pub negative_syntax: NegativeSyntax,
    pub separator: String,
    pub is_builtin: bool,
    pub created_at: String,
    pub updated_at: String,
}
