//! Language Detector (C2, §4.9): deterministic script + stop-word heuristic,
//! no external call.

use unicode_segmentation::UnicodeSegmentation;

const RUSSIAN_STOPWORDS: &[&str] = &["и", "в", "не", "на", "что", "как", "это", "для"];
const UZBEK_MARKERS: &[&str] = &["bo'ladi", "bilan", "lar", "ning", "uchun", "qanday"];
const ENGLISH_STOPWORDS: &[&str] = &["the", "is", "are", "what", "how", "and", "for", "to"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedLanguage {
    En,
    Ru,
    Uz,
    Unknown,
}

impl DetectedLanguage {
    /// `unknown` is treated as `en` downstream (§4.9).
    pub fn as_effective_str(&self) -> &'static str {
        match self {
            DetectedLanguage::En | DetectedLanguage::Unknown => "en",
            DetectedLanguage::Ru => "ru",
            DetectedLanguage::Uz => "uz",
        }
    }
}

/// Priority order from §4.9: Cyrillic + Russian stop-words -> `ru`; Cyrillic
/// or Latin with Uzbek digraphs/particles -> `uz`; Latin ASCII-dominant with
/// English stop-words -> `en`; otherwise `unknown`.
pub fn detect_language(text: &str) -> DetectedLanguage {
    let lower = text.to_lowercase();
    let total_alpha = lower.chars().filter(|c| c.is_alphabetic()).count().max(1);
    let cyrillic = lower.chars().filter(|c| is_cyrillic(*c)).count();
    let cyrillic_dominant = cyrillic * 2 >= total_alpha;

    let has_russian_stopword = contains_any_word(&lower, RUSSIAN_STOPWORDS);
    let has_uzbek_marker = contains_any_word(&lower, UZBEK_MARKERS);
    let has_english_stopword = contains_any_word(&lower, ENGLISH_STOPWORDS);

    if cyrillic_dominant && has_russian_stopword {
        return DetectedLanguage::Ru;
    }

    if has_uzbek_marker {
        return DetectedLanguage::Uz;
    }

    let latin = lower.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let latin_dominant = latin * 2 >= total_alpha;

    if latin_dominant && has_english_stopword {
        return DetectedLanguage::En;
    }

    DetectedLanguage::Unknown
}

fn is_cyrillic(c: char) -> bool {
    matches!(c as u32, 0x0400..=0x04FF)
}

fn contains_any_word(haystack: &str, words: &[&str]) -> bool {
    let tokens: Vec<&str> = haystack.unicode_words().collect();
    words.iter().any(|w| tokens.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_russian_from_cyrillic_and_stopwords() {
        assert_eq!(detect_language("что такое гранулы и как они работают"), DetectedLanguage::Ru);
    }

    #[test]
    fn detects_english_from_latin_and_stopwords() {
        assert_eq!(detect_language("what is the warranty for this"), DetectedLanguage::En);
    }

    #[test]
    fn detects_uzbek_marker() {
        assert_eq!(detect_language("bu mahsulot bilan qanday ishlaydi"), DetectedLanguage::Uz);
    }

    #[test]
    fn unrecognized_falls_back_to_unknown_which_resolves_to_en() {
        let detected = detect_language("#$%@!");
        assert_eq!(detected, DetectedLanguage::Unknown);
        assert_eq!(detected.as_effective_str(), "en");
    }
}
