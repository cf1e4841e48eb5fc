use thiserror::Error;

/// Errors produced by parsing, configuration and timing generation.
///
/// Dictionary lookup failures are deliberately *not* errors: they are
/// recorded as per-token flags on the parse tree (see
/// [`WordsNode::error`](crate::message::WordsNode)) so that the rest of a
/// message stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MorseError {
    /// The input does not match the message grammar (unterminated
    /// directive, unknown directive letter, malformed number, or a
    /// character outside the domain's alphabet). No tree is produced.
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// No dictionary registered under this name.
    #[error("unknown dictionary '{0}'")]
    UnknownDictionary(String),

    /// The dictionary exists but does not define this option overlay.
    #[error("unknown option '{option}' for dictionary '{dictionary}'")]
    UnknownOption { dictionary: String, option: String },

    /// The tree still contains untranslated tokens; timing generation
    /// requires a fully translated (or cleaned) message.
    #[error("message contains untranslatable tokens")]
    Untranslatable,
}

impl MorseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        MorseError::Syntax {
            position,
            message: message.into(),
        }
    }
}
