//! Recursive-descent parser for the two message grammars.
//!
//! ```text
//! message    ::= text | morse
//! text       ::= (textWords | directive)+
//! morse      ::= (morseWords | directive)+
//! textWords  ::= textCharacter+            (any char except '[' ']' '|')
//! morseWords ::= (morseCharacter | morseSpace+)+
//! directive  ::= volume | pitch | timing | pause
//! volume     ::= "[" [vV] number? "]"
//! pitch      ::= "[" [pPfF] number? "]"
//! timing     ::= "[" [tT] "]" | "[" [tT] "=" "]"
//!              | "[" [tT] number "/" number "]"
//!              | "[" [tT] number ("," number){4,5} "]"
//! pause      ::= "[" " "+ "]" | "[" number "ms"? "]"
//! number     ::= [1-9][0-9]*
//! ```
//!
//! Parsing is total: either a full tree is produced or a
//! [`MorseError::Syntax`] - directive-syntax problems never surface
//! through the tree's error flags, which are reserved for dictionary
//! lookups in the translation pass.

use crate::dictionary::Dictionary;
use crate::error::MorseError;
use crate::message::{Directive, Domain, Message, Node, Token, WordsNode};

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Cursor {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), MorseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(MorseError::syntax(
                self.pos,
                format!("expected '{expected}'"),
            ))
        }
    }

    /// number ::= [1-9][0-9]*
    fn number(&mut self) -> Result<u32, MorseError> {
        let start = self.pos;
        match self.peek() {
            Some(c @ '1'..='9') => {
                self.pos += 1;
                let mut value = c.to_digit(10).unwrap_or(0) as u64;
                while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                    self.pos += 1;
                    value = value * 10 + d as u64;
                    if value > u32::MAX as u64 {
                        return Err(MorseError::syntax(start, "number out of range"));
                    }
                }
                Ok(value as u32)
            }
            _ => Err(MorseError::syntax(start, "expected a number")),
        }
    }
}

/// Choose the grammar with the dictionary's morse-match heuristic, then
/// parse the whole input under it.
pub fn parse(input: &str, dict: &Dictionary) -> Result<Message, MorseError> {
    if dict.looks_like_morse(input) {
        parse_morse(input)
    } else {
        parse_text(input)
    }
}

/// Parse under the text grammar.
pub fn parse_text(input: &str) -> Result<Message, MorseError> {
    let mut cursor = Cursor::new(input);
    let mut nodes = Vec::new();
    let mut run: Vec<Token> = Vec::new();

    while let Some(ch) = cursor.peek() {
        match ch {
            '[' => {
                close_run(&mut run, &mut nodes);
                nodes.push(Node::Directive(directive(&mut cursor)?));
            }
            ']' => return Err(MorseError::syntax(cursor.pos, "unmatched ']'")),
            '|' => return Err(MorseError::syntax(cursor.pos, "'|' is not a text character")),
            '<' => {
                run.push(prosign_or_literal(&mut cursor));
            }
            c if c.is_whitespace() => {
                cursor.bump();
                // Whitespace runs collapse to a single word space.
                if run.last().is_some_and(|t| !t.is_space()) {
                    run.push(Token::WordSpace);
                }
            }
            c => {
                cursor.bump();
                run.push(Token::symbol(c.to_string()));
            }
        }
    }
    // Trailing whitespace separates nothing.
    if run.last() == Some(&Token::WordSpace) {
        run.pop();
    }
    close_run(&mut run, &mut nodes);
    Ok(Message::new(Domain::Text, nodes))
}

/// Parse under the morse grammar. Any character outside the morse
/// alphabet is a syntax error, which [`parse`] uses to route mixed
/// input to the text grammar up front.
pub fn parse_morse(input: &str) -> Result<Message, MorseError> {
    let mut cursor = Cursor::new(input);
    let mut nodes = Vec::new();
    let mut run: Vec<Token> = Vec::new();
    let mut mark_run = String::new();
    let mut pending_space = false;

    while let Some(ch) = cursor.peek() {
        match ch {
            '.' | '-' | '_' => {
                cursor.bump();
                if std::mem::take(&mut pending_space) && !mark_run.is_empty() {
                    run.push(Token::symbol(std::mem::take(&mut mark_run)));
                    run.push(Token::CharSpace);
                }
                mark_run.push(if ch == '_' { '-' } else { ch });
            }
            '/' | '|' => {
                cursor.bump();
                pending_space = false;
                close_mark(&mut mark_run, &mut run);
                run.push(Token::WordSpace);
            }
            '[' => {
                pending_space = false;
                close_mark(&mut mark_run, &mut run);
                close_run(&mut run, &mut nodes);
                nodes.push(Node::Directive(directive(&mut cursor)?));
            }
            ']' => return Err(MorseError::syntax(cursor.pos, "unmatched ']'")),
            c if c.is_whitespace() => {
                cursor.bump();
                pending_space = true;
            }
            _ => {
                return Err(MorseError::syntax(
                    cursor.pos,
                    format!("'{ch}' is not a morse character"),
                ))
            }
        }
    }
    close_mark(&mut mark_run, &mut run);
    close_run(&mut run, &mut nodes);
    Ok(Message::new(Domain::Morse, nodes))
}

fn close_mark(mark_run: &mut String, run: &mut Vec<Token>) {
    if !mark_run.is_empty() {
        run.push(Token::symbol(std::mem::take(mark_run)));
    }
}

fn close_run(run: &mut Vec<Token>, nodes: &mut Vec<Node>) {
    if !run.is_empty() {
        nodes.push(Node::Words(WordsNode::new(std::mem::take(run))));
    }
}

/// `<AB>` / `<ABC>` prosign token; a `<` with no matching `>` of
/// letters is an ordinary text character.
fn prosign_or_literal(cursor: &mut Cursor) -> Token {
    let start = cursor.pos;
    cursor.bump(); // '<'
    let mut letters = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_alphabetic() && letters.len() < 4 {
            letters.push(c.to_ascii_uppercase());
            cursor.bump();
        } else {
            break;
        }
    }
    if cursor.eat('>') && !letters.is_empty() {
        Token::symbol(format!("<{letters}>"))
    } else {
        cursor.pos = start + 1;
        Token::symbol("<".to_string())
    }
}

/// directive ::= volume | pitch | timing | pause - cursor sits on '['.
fn directive(cursor: &mut Cursor) -> Result<Directive, MorseError> {
    let start = cursor.pos;
    cursor.bump(); // '['
    let d = match cursor.peek() {
        Some('v') | Some('V') => {
            cursor.bump();
            if cursor.peek() == Some(']') {
                Directive::VolumeReset
            } else {
                Directive::VolumeValue(cursor.number()?)
            }
        }
        Some('p') | Some('P') | Some('f') | Some('F') => {
            cursor.bump();
            if cursor.peek() == Some(']') {
                Directive::PitchReset
            } else {
                Directive::PitchValue(cursor.number()?)
            }
        }
        Some('t') | Some('T') => {
            cursor.bump();
            timing_body(cursor)?
        }
        Some(' ') => {
            let mut count = 0u32;
            while cursor.eat(' ') {
                count += 1;
            }
            Directive::PauseSpace(count)
        }
        Some('1'..='9') => {
            let ms = cursor.number()?;
            // Optional 'ms' suffix.
            if cursor.eat('m') {
                cursor.expect('s')?;
            }
            Directive::PauseValue(ms)
        }
        Some(c) => {
            return Err(MorseError::syntax(
                cursor.pos,
                format!("unknown directive '{c}'"),
            ))
        }
        None => return Err(MorseError::syntax(start, "unterminated directive")),
    };
    cursor
        .expect(']')
        .map_err(|_| MorseError::syntax(start, "unterminated directive"))?;
    Ok(d)
}

fn timing_body(cursor: &mut Cursor) -> Result<Directive, MorseError> {
    match cursor.peek() {
        Some(']') => Ok(Directive::TimingReset),
        Some('=') => {
            cursor.bump();
            Ok(Directive::TimingEqual)
        }
        _ => {
            let first = cursor.number()?;
            match cursor.peek() {
                Some('/') => {
                    cursor.bump();
                    let fwpm = cursor.number()?;
                    Ok(Directive::TimingValue { wpm: first, fwpm })
                }
                Some(',') => {
                    let mut values = vec![first];
                    while cursor.eat(',') {
                        values.push(cursor.number()?);
                    }
                    if values.len() < 5 || values.len() > 6 {
                        return Err(MorseError::syntax(
                            cursor.pos,
                            format!("timing list needs 5 or 6 values, got {}", values.len()),
                        ));
                    }
                    Ok(Directive::TimingList(values))
                }
                _ => Err(MorseError::syntax(
                    cursor.pos,
                    "expected '/' or ',' after timing number",
                )),
            }
        }
    }
}
