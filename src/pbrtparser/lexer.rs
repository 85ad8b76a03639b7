use crate::core::error::{PbrtError, Result};
use crate::pbrtparser::tokens::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[inline]
fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\n' || c == b'\t' || c == b'\r'
}

#[inline]
fn is_special(c: u8) -> bool {
    c == b'[' || c == b',' || c == b']'
}

/// Turns one scene file into tokens, one byte at a time with a single
/// byte of push-back. The underlying reader is dropped at end of input.
pub struct Lexer {
    file        : Arc<PathBuf>,
    reader      : Option<Box<dyn BufRead>>,
    peeked      : Option<u8>,
    line        : usize,
    col         : usize,
    last_pos    : (usize, usize)
}

impl Lexer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| PbrtError::Open {
            path: path.to_owned(),
            source
        })?;

        Ok(Self::from_reader(path, BufReader::new(f)))
    }

    pub fn from_reader<P: AsRef<Path>, R: BufRead + 'static>(name: P, reader: R) -> Self {
        Self {
            file: Arc::new(name.as_ref().to_owned()),
            reader: Some(Box::new(reader)),
            peeked: None,
            line: 1,
            col: 1,
            last_pos: (1, 1)
        }
    }

    pub fn from_text<P: AsRef<Path>>(name: P, text: &str) -> Self {
        Self::from_reader(name, Cursor::new(text.as_bytes().to_vec()))
    }

    pub fn file(&self) -> &Path {
        self.file.as_path()
    }

    fn loc(&self, (line, col): (usize, usize)) -> Loc {
        Loc::new(self.file.clone(), line, col)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None    => return Ok(None)
        };

        let c = reader.fill_buf()?.first().copied();

        match c {
            Some(_) => reader.consume(1),
            None    => self.reader = None
        }

        Ok(c)
    }

    fn get_char(&mut self) -> Result<Option<u8>> {
        let c = match self.peeked.take() {
            Some(c) => Some(c),
            None    => self.read_byte()?
        };

        if let Some(c) = c {
            self.last_pos = (self.line, self.col);

            if c == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }

        Ok(c)
    }

    fn unget_char(&mut self, c: u8) -> Result<()> {
        if self.peeked.is_some() {
            return Err(PbrtError::DoubleUnget(self.loc((self.line, self.col))));
        }

        self.peeked = Some(c);
        let (line, col) = self.last_pos;
        self.line = line;
        self.col = col;

        Ok(())
    }

    /// The next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        let c = loop {
            match self.get_char()? {
                None => return Ok(None),
                Some(c) if is_whitespace(c) => continue,
                Some(b'#') => loop {
                    match self.get_char()? {
                        None        => return Ok(None),
                        Some(b'\n') => break,
                        Some(_)     => {}
                    }
                },
                Some(c) => break c
            }
        };

        let loc = self.loc(self.last_pos);

        if c == b'"' {
            let mut text = Vec::new();

            loop {
                match self.get_char()? {
                    None        => return Err(PbrtError::UnterminatedString(loc)),
                    Some(b'"')  => break,
                    Some(c)     => text.push(c)
                }
            }

            return Ok(Some(Token::new(loc, TokenKind::String, String::from_utf8_lossy(&text).into_owned())));
        }

        if is_special(c) {
            return Ok(Some(Token::new(loc, TokenKind::Special, (c as char).to_string())));
        }

        let mut text = vec![c];

        while let Some(c) = self.get_char()? {
            if is_whitespace(c) || is_special(c) || c == b'#' || c == b'"' {
                self.unget_char(c)?;
                break;
            }

            text.push(c);
        }

        Ok(Some(Token::new(loc, TokenKind::Literal, String::from_utf8_lossy(&text).into_owned())))
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Token> {
        Lexer::from_text("test.pbrt", text).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn token_kinds() {
        let tokens = lex("Shape \"sphere\" \"float radius\" [2.5]");
        let kinds: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();

        assert_eq!(kinds, vec![
            (TokenKind::Literal, "Shape"),
            (TokenKind::String, "sphere"),
            (TokenKind::String, "float radius"),
            (TokenKind::Special, "["),
            (TokenKind::Literal, "2.5"),
            (TokenKind::Special, "]")
        ]);
    }

    #[test]
    fn comments_and_locations() {
        let tokens = lex("# header\nWorldBegin # trailing\n  WorldEnd");

        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].loc.line, tokens[0].loc.col), (2, 1));
        assert_eq!((tokens[1].loc.line, tokens[1].loc.col), (3, 3));
        assert_eq!(tokens[1].loc.to_string(), "test.pbrt:3.3");
    }

    #[test]
    fn literal_stops_at_quote_and_bracket() {
        let tokens = lex("1,2]\"x\"");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();

        assert_eq!(texts, vec!["1", ",", "2", "]", "x"]);
    }

    #[test]
    fn strings_keep_escapes_verbatim() {
        let tokens = lex(r#""a\nb""#);

        assert_eq!(tokens[0].text, r"a\nb");
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::from_text("test.pbrt", "Texture \"oops");

        assert!(lexer.next_token().unwrap().is_some());
        assert!(matches!(lexer.next_token(), Err(PbrtError::UnterminatedString(_))));
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut lexer = Lexer::from_text("test.pbrt", "Identity");

        assert!(lexer.next_token().unwrap().is_some());
        assert!(lexer.next_token().unwrap().is_none());
        assert!(lexer.next_token().unwrap().is_none());
    }

    #[test]
    fn double_unget_is_an_error() {
        let mut lexer = Lexer::from_text("test.pbrt", "ab");
        let a = lexer.get_char().unwrap().unwrap();
        let b = lexer.get_char().unwrap().unwrap();

        assert!(lexer.unget_char(b).is_ok());
        assert!(matches!(lexer.unget_char(a), Err(PbrtError::DoubleUnget(_))));
    }
}
