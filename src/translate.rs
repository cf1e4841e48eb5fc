use crate::dictionary::Dictionary;
use crate::error::MorseError;
use crate::message::{Domain, Message, Node, Token};
use crate::parse;

/// Annotate a parsed tree with its translation under `dict`.
///
/// Pure: returns a new tree. Each symbol token is looked up in the
/// active direction's map (text lookups retry uppercase); a miss is
/// recorded as `None` in the parallel translation and sets the error
/// flag on the run and the root. Space sentinels translate to
/// themselves. Never fails - callers inspect [`Message::has_error`].
pub fn translate(message: &Message, dict: &Dictionary) -> Message {
    let mut out = message.clone();
    let mut root_error = false;
    for node in &mut out.nodes {
        let Node::Words(words) = node else { continue };
        words.translation = words
            .children
            .iter()
            .map(|token| match token {
                Token::CharSpace => Some(Token::CharSpace),
                Token::WordSpace => Some(Token::WordSpace),
                Token::Symbol(raw) => {
                    let mapped = match message.domain {
                        Domain::Text => dict.text_to_morse(raw),
                        Domain::Morse => dict.morse_to_text(raw),
                    };
                    mapped.map(Token::symbol)
                }
            })
            .collect();
        words.error = words.translation.iter().any(Option::is_none);
        root_error |= words.error;
    }
    out.error = root_error;
    out
}

/// Parse `text` under the text grammar and translate it.
pub fn load_text(text: &str, dict: &Dictionary) -> Result<Message, MorseError> {
    Ok(translate(&parse::parse_text(text)?, dict))
}

/// Parse `morse` under the morse grammar and translate it.
pub fn load_morse(morse: &str, dict: &Dictionary) -> Result<Message, MorseError> {
    Ok(translate(&parse::parse_morse(morse)?, dict))
}

/// Auto-detect the domain with the dictionary's morse-match heuristic,
/// then parse and translate.
pub fn load(input: &str, dict: &Dictionary) -> Result<Message, MorseError> {
    Ok(translate(&parse::parse(input, dict)?, dict))
}
