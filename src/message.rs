use serde::{Deserialize, Serialize};

/// Which grammar the message was parsed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Text,
    Morse,
}

/// One entry of a words run. Space sentinels are structural: they are
/// never looked up in a dictionary and translate to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A display character, prosign token or morse element string.
    Symbol(String),
    /// Inter-character separator.
    CharSpace,
    /// Inter-word separator.
    WordSpace,
}

impl Token {
    pub fn symbol(s: impl Into<String>) -> Token {
        Token::Symbol(s.into())
    }

    pub fn is_space(&self) -> bool {
        !matches!(self, Token::Symbol(_))
    }
}

/// A run of plain symbols between directives.
///
/// `children` holds the raw tokens in insertion order. After
/// translation, `translation` is a parallel vector of the same length
/// with `None` at positions that failed dictionary lookup; `error` is
/// true iff any position is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordsNode {
    pub children: Vec<Token>,
    pub translation: Vec<Option<Token>>,
    pub error: bool,
}

impl WordsNode {
    pub(crate) fn new(children: Vec<Token>) -> Self {
        WordsNode {
            children,
            translation: Vec::new(),
            error: false,
        }
    }
}

/// An inline bracketed control sequence. Reset and explicit-value forms
/// are distinct variants so consumers can pattern-match by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    VolumeReset,
    VolumeValue(u32),
    PitchReset,
    PitchValue(u32),
    /// `[t]` - restore the speed the caller entered the timing pass with.
    TimingReset,
    /// `[t=]` - collapse the Farnsworth gap (`fwpm = wpm`).
    TimingEqual,
    /// `[t20/10]` - wpm/fwpm pair.
    TimingValue { wpm: u32, fwpm: u32 },
    /// `[t60,180,60,180,420]` - explicit element lengths in ms, in the
    /// order dit, dah, intra-character space, inter-character space,
    /// inter-word space, with an optional sixth pause-space unit.
    TimingList(Vec<u32>),
    /// `[   ]` - pause measured as a count of literal spaces.
    PauseSpace(u32),
    /// `[500]` / `[500ms]` - explicit millisecond pause.
    PauseValue(u32),
}

impl Directive {
    fn display(&self) -> String {
        match self {
            Directive::VolumeReset => "[v]".to_string(),
            Directive::VolumeValue(v) => format!("[v{v}]"),
            Directive::PitchReset => "[p]".to_string(),
            Directive::PitchValue(v) => format!("[p{v}]"),
            Directive::TimingReset => "[t]".to_string(),
            Directive::TimingEqual => "[t=]".to_string(),
            Directive::TimingValue { wpm, fwpm } => format!("[t{wpm}/{fwpm}]"),
            Directive::TimingList(values) => {
                let parts: Vec<String> = values.iter().map(u32::to_string).collect();
                format!("[t{}]", parts.join(","))
            }
            Directive::PauseSpace(n) => format!("[{}]", " ".repeat(*n as usize)),
            Directive::PauseValue(ms) => format!("[{ms}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Words(WordsNode),
    Directive(Directive),
}

/// Root of a parsed message. Value-like: translation and cleaning
/// produce new trees rather than mutating shared structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub domain: Domain,
    pub nodes: Vec<Node>,
    /// Logical OR of all descendant lookup errors.
    pub error: bool,
}

impl Message {
    pub(crate) fn new(domain: Domain, nodes: Vec<Node>) -> Self {
        Message {
            domain,
            nodes,
            error: false,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Render the message back to canonical text form. Untranslatable
    /// morse tokens render as `#`.
    pub fn display_text(&self) -> String {
        self.render_text(None)
    }

    /// Like [`display_text`](Self::display_text) but wraps every token
    /// that failed lookup in the caller's markers, e.g. `{bad}`.
    pub fn display_text_errors(&self, prefix: &str, suffix: &str) -> String {
        self.render_text(Some((prefix, suffix)))
    }

    fn render_text(&self, markers: Option<(&str, &str)>) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Directive(d) => out.push_str(&d.display()),
                Node::Words(words) => {
                    for i in 0..words.children.len() {
                        match &words.children[i] {
                            Token::CharSpace => {}
                            Token::WordSpace => out.push(' '),
                            Token::Symbol(raw) => {
                                let failed = matches!(words.translation.get(i), Some(None));
                                if failed {
                                    match markers {
                                        Some((pre, post)) => {
                                            out.push_str(pre);
                                            out.push_str(raw);
                                            out.push_str(post);
                                        }
                                        None => match self.domain {
                                            Domain::Morse => out.push('#'),
                                            Domain::Text => out.push_str(raw),
                                        },
                                    }
                                    continue;
                                }
                                match self.domain {
                                    Domain::Text => out.push_str(raw),
                                    Domain::Morse => match words.translation.get(i) {
                                        Some(Some(Token::Symbol(t))) => out.push_str(t),
                                        // Untranslated tree: show the raw elements.
                                        _ => out.push_str(raw),
                                    },
                                }
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Render the morse side: element strings joined by single spaces,
    /// word spaces as `/`. Untranslatable text tokens render as `#`.
    pub fn display_morse(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Directive(d) => parts.push(d.display()),
                Node::Words(words) => {
                    for i in 0..words.children.len() {
                        match &words.children[i] {
                            Token::CharSpace => {}
                            Token::WordSpace => parts.push("/".to_string()),
                            Token::Symbol(raw) => {
                                let part = match self.domain {
                                    Domain::Morse => raw.clone(),
                                    Domain::Text => match words.translation.get(i) {
                                        Some(Some(Token::Symbol(t))) => t.clone(),
                                        Some(None) => "#".to_string(),
                                        // Untranslated tree: nothing sane
                                        // to show for a text symbol.
                                        _ => "#".to_string(),
                                    },
                                };
                                parts.push(part);
                            }
                        }
                    }
                }
            }
        }
        parts.join(" ")
    }

    /// Best-effort copy: drops every position whose translation failed,
    /// collapses char-space sentinels that become adjacent as a result,
    /// and clears the error flags.
    pub fn clean(&self) -> Message {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            match node {
                Node::Directive(d) => nodes.push(Node::Directive(d.clone())),
                Node::Words(words) => {
                    let mut children: Vec<Token> = Vec::with_capacity(words.children.len());
                    let mut translation = Vec::with_capacity(words.children.len());
                    for i in 0..words.children.len() {
                        if matches!(words.translation.get(i), Some(None)) {
                            continue;
                        }
                        let token = &words.children[i];
                        if *token == Token::CharSpace
                            && children.last() == Some(&Token::CharSpace)
                        {
                            continue;
                        }
                        children.push(token.clone());
                        if let Some(t) = words.translation.get(i) {
                            translation.push(t.clone());
                        }
                    }
                    nodes.push(Node::Words(WordsNode {
                        children,
                        translation,
                        error: false,
                    }));
                }
            }
        }
        Message {
            domain: self.domain,
            nodes,
            error: false,
        }
    }
}

/// Normalize text input: whitespace runs become single spaces and the
/// ends are trimmed. Directive spans are copied verbatim so pause-space
/// widths survive.
pub fn tidy_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_directive = false;
    let mut pending_space = false;
    for ch in input.chars() {
        if in_directive {
            out.push(ch);
            if ch == ']' {
                in_directive = false;
            }
            continue;
        }
        if ch == '[' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            in_directive = true;
            out.push(ch);
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// Normalize morse input: `_` becomes `-`, `|` becomes `/`, whitespace
/// collapses to single spaces and every `/` is set off by one space on
/// each side. Directive spans are copied verbatim.
pub fn tidy_morse(input: &str) -> String {
    let mut mapped = String::with_capacity(input.len());
    let mut in_directive = false;
    for ch in input.chars() {
        if in_directive {
            mapped.push(ch);
            if ch == ']' {
                in_directive = false;
            }
            continue;
        }
        match ch {
            '[' => {
                in_directive = true;
                mapped.push(ch);
            }
            '_' => mapped.push('-'),
            '|' | '/' => mapped.push_str(" / "),
            c if c.is_whitespace() => mapped.push(' '),
            c => mapped.push(c),
        }
    }
    tidy_text(&mapped)
}
