use std::collections::HashMap;

use crate::error::MorseError;
use crate::international;

/// Relative element durations, normalized against the dit (always 1).
/// Positive = sound, negative = silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioTable {
    pub dit: f64,
    pub dah: f64,
    pub intra_space: f64,
    pub char_space: f64,
    pub word_space: f64,
}

impl RatioTable {
    pub(crate) fn international() -> Self {
        RatioTable {
            dit: international::RATIO_DIT,
            dah: international::RATIO_DAH,
            intra_space: international::RATIO_INTRA_SPACE,
            char_space: international::RATIO_CHAR_SPACE,
            word_space: international::RATIO_WORD_SPACE,
        }
    }
}

/// An immutable per-language dictionary: bidirectional letter maps, the
/// ratio table and the morse-match charset. Built through [`Dictionary::load`]
/// from the static registry; option overlays extend the letter maps.
#[derive(Debug, Clone)]
pub struct Dictionary {
    id: String,
    options: Vec<String>,
    text_to_morse: HashMap<String, String>,
    morse_to_text: HashMap<String, String>,
    ratio: RatioTable,
}

const REGISTERED: &[&str] = &["international"];

impl Dictionary {
    /// Look up a dictionary by name and overlay the named options in
    /// order. Unknown names or options are hard errors, never silently
    /// defaulted.
    pub fn load(name: &str, options: &[&str]) -> Result<Dictionary, MorseError> {
        if !REGISTERED.contains(&name) {
            return Err(MorseError::UnknownDictionary(name.to_string()));
        }
        let mut dict = Dictionary {
            id: name.to_string(),
            options: Vec::new(),
            text_to_morse: HashMap::new(),
            morse_to_text: HashMap::new(),
            ratio: RatioTable::international(),
        };
        dict.extend(international::LETTERS);
        for &option in options {
            let table = match option {
                "prosigns" => international::PROSIGNS,
                "accents" => international::ACCENTS,
                _ => {
                    return Err(MorseError::UnknownOption {
                        dictionary: name.to_string(),
                        option: option.to_string(),
                    })
                }
            };
            dict.extend(table);
            dict.options.push(option.to_string());
        }
        Ok(dict)
    }

    fn extend(&mut self, table: &[(&str, &str)]) {
        for &(letter, code) in table {
            self.text_to_morse
                .insert(letter.to_string(), code.to_string());
            // First registration wins on the reverse side, so a base
            // letter keeps priority over an overlay sharing its code
            // (e.g. '&' vs <AS>).
            self.morse_to_text
                .entry(code.to_string())
                .or_insert_with(|| letter.to_string());
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn ratio(&self) -> &RatioTable {
        &self.ratio
    }

    /// Text token to element string, retrying uppercase on a miss.
    pub fn text_to_morse(&self, token: &str) -> Option<&str> {
        if let Some(code) = self.text_to_morse.get(token) {
            return Some(code);
        }
        self.text_to_morse
            .get(token.to_uppercase().as_str())
            .map(String::as_str)
    }

    /// Element string to display token.
    pub fn morse_to_text(&self, code: &str) -> Option<&str> {
        self.morse_to_text.get(code).map(String::as_str)
    }

    /// Heuristic for classifying free input as Morse rather than text:
    /// outside of directives it contains nothing but signal marks,
    /// separators and whitespace, and at least one signal mark.
    pub fn looks_like_morse(&self, input: &str) -> bool {
        let mut in_directive = false;
        let mut saw_mark = false;
        for ch in input.chars() {
            match ch {
                '[' => in_directive = true,
                ']' => in_directive = false,
                _ if in_directive => {}
                '.' | '-' | '_' => saw_mark = true,
                '/' | '|' => {}
                c if c.is_whitespace() => {}
                _ => return false,
            }
        }
        saw_mark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_international() {
        let dict = Dictionary::load("international", &[]).unwrap();
        assert_eq!(dict.text_to_morse("A"), Some(".-"));
        assert_eq!(dict.text_to_morse("a"), Some(".-"));
        assert_eq!(dict.morse_to_text("---"), Some("O"));
        assert_eq!(dict.ratio().dit, 1.0);
    }

    #[test]
    fn unknown_dictionary_is_hard_error() {
        let err = Dictionary::load("klingon", &[]).unwrap_err();
        assert_eq!(err, MorseError::UnknownDictionary("klingon".to_string()));
    }

    #[test]
    fn unknown_option_is_hard_error() {
        let err = Dictionary::load("international", &["tags2"]).unwrap_err();
        assert!(matches!(err, MorseError::UnknownOption { .. }));
    }

    #[test]
    fn prosign_overlay() {
        let bare = Dictionary::load("international", &[]).unwrap();
        assert_eq!(bare.text_to_morse("<SOS>"), None);

        let dict = Dictionary::load("international", &["prosigns"]).unwrap();
        assert_eq!(dict.text_to_morse("<SOS>"), Some("...---..."));
        // Base letters keep priority on the reverse map.
        assert_eq!(dict.morse_to_text(".-..."), Some("&"));
    }

    #[test]
    fn accents_overlay_with_case_retry() {
        let dict = Dictionary::load("international", &["accents"]).unwrap();
        assert_eq!(dict.text_to_morse("é"), Some("..-.."));
        assert_eq!(dict.text_to_morse("É"), Some("..-.."));
    }

    #[test]
    fn morse_match_heuristic() {
        let dict = Dictionary::load("international", &[]).unwrap();
        assert!(dict.looks_like_morse(".. .- / --"));
        assert!(dict.looks_like_morse("[t20/10] ._ ."));
        assert!(!dict.looks_like_morse("E"));
        assert!(!dict.looks_like_morse("hello."));
        assert!(!dict.looks_like_morse("   "));
    }

    #[test]
    fn every_letter_uses_known_elements() {
        let dict = Dictionary::load("international", &["prosigns", "accents"]).unwrap();
        for (_, code) in dict.text_to_morse.iter() {
            assert!(code.chars().all(|c| c == '.' || c == '-'), "{code}");
        }
    }
}
