//! The fixed set of transcription languages.
//!
//! Selection only affects the transcription driver; the voice path is
//! language-agnostic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported transcription language, mapped to the locale tag consumed by
/// the speech recognition capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Korean,
    English,
    Spanish,
    French,
    Japanese,
    ChineseSimplified,
}

impl Language {
    /// All supported languages, in display order.
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Korean,
        Language::Spanish,
        Language::French,
        Language::Japanese,
        Language::ChineseSimplified,
    ];

    /// The locale tag handed to the recognition capability.
    pub fn locale_tag(self) -> &'static str {
        match self {
            Language::Korean => "ko-KR",
            Language::English => "en-US",
            Language::Spanish => "es-ES",
            Language::French => "fr-FR",
            Language::Japanese => "ja-JP",
            Language::ChineseSimplified => "zh-CN",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Language::Korean => "Korean",
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::Japanese => "Japanese",
            Language::ChineseSimplified => "Chinese (Simplified)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.locale_tag())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Parses either a locale tag (`ko-KR`) or a label (`korean`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ko-kr" | "korean" => Ok(Language::Korean),
            "en-us" | "english" => Ok(Language::English),
            "es-es" | "spanish" => Ok(Language::Spanish),
            "fr-fr" | "french" => Ok(Language::French),
            "ja-jp" | "japanese" => Ok(Language::Japanese),
            "zh-cn" | "chinese" | "chinese-simplified" => Ok(Language::ChineseSimplified),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_tags_round_trip() {
        for lang in Language::ALL {
            let parsed: Language = lang.locale_tag().parse().expect("tag parses");
            assert_eq!(parsed, lang);
        }
    }

    #[test]
    fn labels_parse() {
        assert_eq!("Korean".parse::<Language>().unwrap(), Language::Korean);
        assert_eq!("english".parse::<Language>().unwrap(), Language::English);
        assert!("klingon".parse::<Language>().is_err());
    }
}
