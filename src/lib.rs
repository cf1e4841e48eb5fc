// Morse code engine: grammar, translation, Farnsworth timing and an
// adaptive streaming decoder.

pub mod decoder;
pub mod dictionary;
pub mod error;
pub mod message;
pub mod parse;
pub mod timing;
pub mod translate;

mod international;

// Re-export main public API
pub use decoder::{DecoderEvent, MorseDecoder, SpeedEvent};
pub use dictionary::Dictionary;
pub use error::MorseError;
pub use message::{tidy_morse, tidy_text, Directive, Domain, Message, Node, Token};
pub use timing::{get_notes, get_timings, Note, Speed};
pub use translate::{load, load_morse, load_text};

/// Translate text straight to Morse display form.
pub fn text_to_morse(text: &str, dict: &Dictionary) -> Result<String, MorseError> {
    let message = translate::load_text(text, dict)?;
    if message.has_error() {
        return Err(MorseError::Untranslatable);
    }
    Ok(message.display_morse())
}

/// Translate Morse straight to text display form.
pub fn morse_to_text(morse: &str, dict: &Dictionary) -> Result<String, MorseError> {
    let message = translate::load_morse(morse, dict)?;
    if message.has_error() {
        return Err(MorseError::Untranslatable);
    }
    Ok(message.display_text())
}

/// Parse, translate and time a text message in one call.
pub fn text_to_timings(
    text: &str,
    dict: &Dictionary,
    speed: Speed,
) -> Result<Vec<f64>, MorseError> {
    let message = translate::load_text(text, dict)?;
    timing::get_timings(&message, dict, speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> Dictionary {
        Dictionary::load("international", &[]).unwrap()
    }

    #[test]
    fn test_text_to_morse() {
        assert_eq!(text_to_morse("sos", &dict()).unwrap(), "... --- ...");
        assert!(text_to_morse("\u{00df}", &dict()).is_err());
    }

    #[test]
    fn test_morse_to_text() {
        assert_eq!(morse_to_text(".... ..", &dict()).unwrap(), "HI");
    }

    #[test]
    fn test_text_to_timings() {
        let timings = text_to_timings("et", &dict(), Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![60.0, -180.0, 180.0]);
    }

    #[test]
    fn test_directives_pass_through() {
        let timings = text_to_timings("e[500]e", &dict(), Speed::new(20.0, 20.0)).unwrap();
        assert_eq!(timings, vec![60.0, -500.0, 60.0]);
    }
}
