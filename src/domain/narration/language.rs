use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of leading characters inspected when guessing a story's language
const DETECTION_WINDOW: usize = 100;

/// Narration languages supported by the voice profiles and the synthesis backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 2] = [LanguageCode::English, LanguageCode::Chinese];

    /// Get the language tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Chinese => "zh",
        }
    }

    /// Language tag understood by Google Translate TTS
    pub fn google_tag(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Chinese => "zh-CN",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(LanguageCode::English),
            "zh" | "zh-cn" | "zh-hans" => Ok(LanguageCode::Chinese),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// CJK Unified Ideographs block
pub fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_ideograph)
}

/// Guess the language of stored story text from its opening characters
pub fn detect_language(text: &str) -> LanguageCode {
    if text.chars().take(DETECTION_WINDOW).any(is_cjk_ideograph) {
        LanguageCode::Chinese
    } else {
        LanguageCode::English
    }
}
