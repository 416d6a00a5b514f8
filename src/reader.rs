//! Block reader for the ADL text format.
//!
//! ADL files are a sequence of brace-delimited blocks holding `key=value`
//! fields, nested blocks, point lists and bare list items:
//!
//! ```text
//! "text update" {
//!     object {
//!         x=10
//!         y=40
//!     }
//!     monitor {
//!         chan="$(P)VALUE"
//!     }
//! }
//! ```
//!
//! The reader does not build any tree. It produces a flat stream of
//! [`Event`]s which the tree builder consumes.

use std::iter::Peekable;
use std::str::Chars;

use smol_str::SmolStr;

use crate::Adl2GestaltError;

/// A value as written in the source, before any typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Quoted(String),
    Bare(String),
}

impl RawValue {
    pub fn as_str(&self) -> &str {
        match self {
            RawValue::Quoted(s) | RawValue::Bare(s) => s,
        }
    }
}

/// A structural event produced by the [`BlockReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `name {`
    Enter { name: SmolStr, line: usize },
    /// `key=value`
    Field {
        key: SmolStr,
        value: RawValue,
        line: usize,
    },
    /// `(x,y)` inside a point list.
    Point { x: i64, y: i64, line: usize },
    /// A bare list entry such as a palette row `ffffff,`.
    Item { value: RawValue, line: usize },
    /// `}`
    Exit { line: usize },
}

impl Event {
    pub fn line(&self) -> usize {
        match self {
            Event::Enter { line, .. }
            | Event::Field { line, .. }
            | Event::Point { line, .. }
            | Event::Item { line, .. }
            | Event::Exit { line } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Equals,
    LParen,
    RParen,
    Comma,
    Str(String),
    Word(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn describe(kind: Option<&TokenKind>) -> String {
    match kind {
        None => "end of input".to_string(),
        Some(TokenKind::Open) => "'{'".to_string(),
        Some(TokenKind::Close) => "'}'".to_string(),
        Some(TokenKind::Equals) => "'='".to_string(),
        Some(TokenKind::LParen) => "'('".to_string(),
        Some(TokenKind::RParen) => "')'".to_string(),
        Some(TokenKind::Comma) => "','".to_string(),
        Some(TokenKind::Str(s)) => format!("string \"{}\"", s),
        Some(TokenKind::Word(w)) => format!("'{}'", w),
    }
}

fn is_punctuation(c: char) -> bool {
    matches!(c, '{' | '}' | '=' | '(' | ')' | ',' | '"')
}

struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                self.line += 1;
                self.chars.next();
            } else if c.is_whitespace() {
                self.chars.next();
            } else if c == '#' {
                // Comment to end of line; the newline itself is counted above.
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.chars.next();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Adl2GestaltError> {
        self.skip_trivia();
        let line = self.line;
        let Some(c) = self.chars.next() else {
            return Ok(None);
        };
        let kind = match c {
            '{' => TokenKind::Open,
            '}' => TokenKind::Close,
            '=' => TokenKind::Equals,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '"' => TokenKind::Str(self.string(line)?),
            _ => {
                let mut word = String::from(c);
                while let Some(&n) = self.chars.peek() {
                    if n.is_whitespace() || is_punctuation(n) {
                        break;
                    }
                    word.push(n);
                    self.chars.next();
                }
                TokenKind::Word(word)
            }
        };
        Ok(Some(Token { kind, line }))
    }

    /// MEDM strings have no escapes and never span lines.
    fn string(&mut self, start_line: usize) -> Result<String, Adl2GestaltError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(s),
                Some('\n') | None => {
                    return Err(Adl2GestaltError::syntax(
                        start_line,
                        "closing '\"'",
                        "end of line",
                    ))
                }
                Some(c) => s.push(c),
            }
        }
    }
}

/// Streams [`Event`]s out of ADL text.
///
/// Stops after the first error.
pub struct BlockReader<'a> {
    scanner: Scanner<'a>,
    peeked: Option<Token>,
    open_blocks: Vec<usize>,
    finished: bool,
}

impl<'a> BlockReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            peeked: None,
            open_blocks: Vec::new(),
            finished: false,
        }
    }

    fn bump(&mut self) -> Result<Option<Token>, Adl2GestaltError> {
        if let Some(token) = self.peeked.take() {
            return Ok(Some(token));
        }
        self.scanner.next_token()
    }

    fn peek_kind(&mut self) -> Result<Option<&TokenKind>, Adl2GestaltError> {
        if self.peeked.is_none() {
            self.peeked = self.scanner.next_token()?;
        }
        Ok(self.peeked.as_ref().map(|t| &t.kind))
    }

    fn read_event(&mut self) -> Result<Option<Event>, Adl2GestaltError> {
        loop {
            let Some(token) = self.bump()? else {
                if let Some(open_line) = self.open_blocks.last() {
                    return Err(Adl2GestaltError::syntax(
                        *open_line,
                        "'}' closing this block",
                        "end of input",
                    ));
                }
                return Ok(None);
            };
            let line = token.line;
            let value = match token.kind {
                TokenKind::Close => {
                    if self.open_blocks.pop().is_none() {
                        return Err(Adl2GestaltError::syntax(
                            line,
                            "a block or field",
                            "unmatched '}'",
                        ));
                    }
                    return Ok(Some(Event::Exit { line }));
                }
                TokenKind::LParen => return self.point(line).map(Some),
                // Separators between list items carry no meaning of their own.
                TokenKind::Comma => continue,
                TokenKind::Str(s) => RawValue::Quoted(s),
                TokenKind::Word(w) => RawValue::Bare(w),
                other => {
                    return Err(Adl2GestaltError::syntax(
                        line,
                        "a block name, field or list item",
                        describe(Some(&other)),
                    ))
                }
            };

            let next = self.peek_kind()?.cloned();
            match next {
                Some(TokenKind::Open) => {
                    self.bump()?;
                    self.open_blocks.push(line);
                    return Ok(Some(Event::Enter {
                        name: SmolStr::new(value.as_str()),
                        line,
                    }));
                }
                Some(TokenKind::Equals) => {
                    self.bump()?;
                    let field_value = match self.bump()? {
                        Some(Token {
                            kind: TokenKind::Str(s),
                            ..
                        }) => RawValue::Quoted(s),
                        Some(Token {
                            kind: TokenKind::Word(w),
                            ..
                        }) => RawValue::Bare(w),
                        other => {
                            return Err(Adl2GestaltError::syntax(
                                line,
                                format!("a value after '{}='", value.as_str()),
                                describe(other.as_ref().map(|t| &t.kind)),
                            ))
                        }
                    };
                    return Ok(Some(Event::Field {
                        key: SmolStr::new(value.as_str()),
                        value: field_value,
                        line,
                    }));
                }
                Some(TokenKind::Comma) => {
                    self.bump()?;
                    return Ok(Some(Event::Item { value, line }));
                }
                _ => return Ok(Some(Event::Item { value, line })),
            }
        }
    }

    fn coordinate(&mut self, line: usize) -> Result<i64, Adl2GestaltError> {
        let token = self.bump()?;
        if let Some(Token {
            kind: TokenKind::Word(w),
            ..
        }) = &token
        {
            if let Ok(n) = w.parse::<i64>() {
                return Ok(n);
            }
        }
        Err(Adl2GestaltError::syntax(
            line,
            "an integer coordinate",
            describe(token.as_ref().map(|t| &t.kind)),
        ))
    }

    fn expect(&mut self, line: usize, wanted: TokenKind) -> Result<(), Adl2GestaltError> {
        let token = self.bump()?;
        match token {
            Some(t) if t.kind == wanted => Ok(()),
            other => Err(Adl2GestaltError::syntax(
                line,
                describe(Some(&wanted)),
                describe(other.as_ref().map(|t| &t.kind)),
            )),
        }
    }

    fn point(&mut self, line: usize) -> Result<Event, Adl2GestaltError> {
        let x = self.coordinate(line)?;
        self.expect(line, TokenKind::Comma)?;
        let y = self.coordinate(line)?;
        self.expect(line, TokenKind::RParen)?;
        Ok(Event::Point { x, y, line })
    }
}

impl Iterator for BlockReader<'_> {
    type Item = Result<Event, Adl2GestaltError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn events(text: &str) -> Vec<Event> {
        BlockReader::new(text).collect::<Result<_, _>>().unwrap()
    }

    fn error(text: &str) -> Adl2GestaltError {
        BlockReader::new(text)
            .find_map(|e| e.err())
            .expect("reader should fail")
    }

    #[test]
    fn test_nested_blocks_and_fields() {
        let got = events(
            r#"
"text update" {
    object {
        x=10
    }
    align="horiz. left"
}
"#,
        );
        assert_eq!(
            got,
            vec![
                Event::Enter {
                    name: "text update".into(),
                    line: 2
                },
                Event::Enter {
                    name: "object".into(),
                    line: 3
                },
                Event::Field {
                    key: "x".into(),
                    value: RawValue::Bare("10".into()),
                    line: 4
                },
                Event::Exit { line: 5 },
                Event::Field {
                    key: "align".into(),
                    value: RawValue::Quoted("horiz. left".into()),
                    line: 6
                },
                Event::Exit { line: 7 },
            ]
        );
    }

    #[test]
    fn test_points_and_items() {
        let got = events("points {\n(10,20)\n( -3 , 4 )\n}\ncolors {\nffffff,\n000000,\n}");
        assert_eq!(got[1], Event::Point { x: 10, y: 20, line: 2 });
        assert_eq!(got[2], Event::Point { x: -3, y: 4, line: 3 });
        assert_eq!(
            got[5],
            Event::Item {
                value: RawValue::Bare("ffffff".into()),
                line: 6
            }
        );
        assert_eq!(
            got[6],
            Event::Item {
                value: RawValue::Bare("000000".into()),
                line: 7
            }
        );
        assert_eq!(got.len(), 8);
    }

    #[test]
    fn test_quoted_keys_and_indexed_names() {
        let got =
            events("composite {\n\"composite name\"=\"\"\ndisplay[0] {\nname=\"a.adl\"\n}\n}");
        assert_eq!(
            got[1],
            Event::Field {
                key: "composite name".into(),
                value: RawValue::Quoted(String::new()),
                line: 2
            }
        );
        assert_eq!(
            got[2],
            Event::Enter {
                name: "display[0]".into(),
                line: 3
            }
        );
    }

    #[test]
    fn test_comments_are_discarded() {
        let got = events("# header\nfile { # trailing\n  name=\"x#y\"\n}\n");
        assert_eq!(got.len(), 3);
        assert_eq!(
            got[1],
            Event::Field {
                key: "name".into(),
                value: RawValue::Quoted("x#y".into()),
                line: 3
            }
        );
    }

    #[test]
    fn test_unterminated_block_reports_opening_line() {
        match error("display {\n  object {\n    x=1\n  }\n") {
            Adl2GestaltError::Syntax { line, found, .. } => {
                assert_eq!(line, 1);
                assert_eq!(found, "end of input");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        match error("text {\n  textix=\"oops\n}\n") {
            Adl2GestaltError::Syntax { line, expected, .. } => {
                assert_eq!(line, 2);
                assert_eq!(expected, "closing '\"'");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_unmatched_close() {
        match error("a {\n}\n}\n") {
            Adl2GestaltError::Syntax { line, found, .. } => {
                assert_eq!(line, 3);
                assert_eq!(found, "unmatched '}'");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_missing_value() {
        assert!(matches!(
            error("object {\n x=\n}"),
            Adl2GestaltError::Syntax { line: 2, .. }
        ));
    }

    #[test]
    fn test_malformed_point() {
        assert!(matches!(
            error("points {\n(1;2)\n}"),
            Adl2GestaltError::Syntax { line: 2, .. }
        ));
    }
}
