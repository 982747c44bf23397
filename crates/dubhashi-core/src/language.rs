//! Language catalogue and per-participant selection.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::turn::Participant;

/// Source language code used when no selection has been made.
pub const DEFAULT_LANGUAGE_CODE: &str = "hi-IN";

/// Translation target name used when no selection has been made.
pub const DEFAULT_TARGET_NAME: &str = "hindi";

/// The languages the speech service accepts, as `(name, code)` pairs.
pub const LANGUAGES: [(&str, &str); 10] = [
    ("Hindi", "hi-IN"),
    ("Telugu", "te-IN"),
    ("Punjabi", "pa-IN"),
    ("Tamil", "ta-IN"),
    ("Kannada", "kn-IN"),
    ("Bengali", "bn-IN"),
    ("Gujarati", "gu-IN"),
    ("Marathi", "mr-IN"),
    ("Malayalam", "ml-IN"),
    ("Odia", "od-IN"),
];

/// A selectable language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub code: String,
}

impl Language {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// The name in the form the translation service expects ("Telugu" ->
    /// "telugu").
    pub fn target_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Look up a catalogue language by display name or code, case-insensitively.
pub fn find_language(query: &str) -> Option<Language> {
    LANGUAGES
        .iter()
        .find(|(name, code)| query.eq_ignore_ascii_case(name) || query.eq_ignore_ascii_case(code))
        .map(|(name, code)| Language::new(*name, *code))
}

/// One selected language per conversation participant.
///
/// Selections may be absent; the accessors fall back to the defaults the
/// services expect, logging a warning since a silent fallback can translate
/// into the wrong language without the user noticing.
#[derive(Debug, Clone, Default)]
pub struct LanguagePair {
    a: Option<Language>,
    b: Option<Language>,
}

impl LanguagePair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one participant's language, replacing any previous selection.
    pub fn set(&mut self, participant: Participant, language: Language) {
        match participant {
            Participant::A => self.a = Some(language),
            Participant::B => self.b = Some(language),
        }
    }

    pub fn get(&self, participant: Participant) -> Option<&Language> {
        match participant {
            Participant::A => self.a.as_ref(),
            Participant::B => self.b.as_ref(),
        }
    }

    /// Exchange the two selections.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    /// Speech-recognition code for the speaking participant.
    pub fn source_code(&self, speaker: Participant) -> String {
        match self.get(speaker) {
            Some(language) if !language.code.is_empty() => language.code.clone(),
            _ => {
                warn!(
                    participant = speaker.label(),
                    fallback = DEFAULT_LANGUAGE_CODE,
                    "no language selected for speaker, using default"
                );
                DEFAULT_LANGUAGE_CODE.to_string()
            }
        }
    }

    /// Translation target name for the listening participant.
    pub fn target_name(&self, speaker: Participant) -> String {
        let listener = speaker.other();
        match self.get(listener) {
            Some(language) if !language.name.is_empty() => language.target_name(),
            _ => {
                warn!(
                    participant = listener.label(),
                    fallback = DEFAULT_TARGET_NAME,
                    "no language selected for listener, using default"
                );
                DEFAULT_TARGET_NAME.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_language() {
        assert_eq!(
            find_language("telugu"),
            Some(Language::new("Telugu", "te-IN"))
        );
        assert_eq!(
            find_language("TA-IN"),
            Some(Language::new("Tamil", "ta-IN"))
        );
        assert_eq!(find_language("klingon"), None);
    }

    #[test]
    fn test_pair_routing() {
        let mut pair = LanguagePair::new();
        pair.set(Participant::A, Language::new("Hindi", "hi-IN"));
        pair.set(Participant::B, Language::new("Telugu", "te-IN"));

        // A speaks Hindi; the translation target is B's language.
        assert_eq!(pair.source_code(Participant::A), "hi-IN");
        assert_eq!(pair.target_name(Participant::A), "telugu");

        assert_eq!(pair.source_code(Participant::B), "te-IN");
        assert_eq!(pair.target_name(Participant::B), "hindi");
    }

    #[test]
    fn test_swap() {
        let mut pair = LanguagePair::new();
        pair.set(Participant::A, Language::new("Bengali", "bn-IN"));
        pair.set(Participant::B, Language::new("Marathi", "mr-IN"));

        pair.swap();
        assert_eq!(pair.get(Participant::A).unwrap().code, "mr-IN");
        assert_eq!(pair.get(Participant::B).unwrap().code, "bn-IN");
    }

    #[test]
    fn test_defaults_when_unset() {
        let pair = LanguagePair::new();
        assert_eq!(pair.source_code(Participant::A), DEFAULT_LANGUAGE_CODE);
        assert_eq!(pair.target_name(Participant::A), DEFAULT_TARGET_NAME);
    }

    #[test]
    fn test_empty_code_falls_back() {
        let mut pair = LanguagePair::new();
        pair.set(Participant::A, Language::new("Hindi", ""));
        assert_eq!(pair.source_code(Participant::A), DEFAULT_LANGUAGE_CODE);
    }
}
