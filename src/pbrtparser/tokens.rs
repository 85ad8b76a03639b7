use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Source position of a token, for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub file : Arc<PathBuf>,
    pub line : usize,
    pub col  : usize
}

impl Loc {
    pub fn new(file: Arc<PathBuf>, line: usize, col: usize) -> Self {
        Self { file, line, col }
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.file.display(), self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Quoted text, quotes stripped, no escape processing.
    String,
    /// Keywords and numbers.
    Literal,
    /// One of `[`, `,` and `]`.
    Special
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub loc  : Loc,
    pub kind : TokenKind,
    pub text : String
}

impl Token {
    pub fn new(loc: Loc, kind: TokenKind, text: String) -> Self {
        Self { loc, kind, text }
    }

    pub fn is_string(&self) -> bool {
        self.kind == TokenKind::String
    }

    pub fn is_literal(&self, text: &str) -> bool {
        self.kind == TokenKind::Literal && self.text == text
    }

    pub fn is_special(&self, text: &str) -> bool {
        self.kind == TokenKind::Special && self.text == text
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _                 => write!(f, "{}", self.text)
        }
    }
}
