//! Character cursor for the Zircon parser
//!
//! Owns the source text as code points and a scan position. The parser works
//! directly on characters (there is no token stream), so everything it needs
//! from the source goes through the tests and skips defined here.

use std::fmt;

/// A fixed set of characters
pub type CharSet = &'static [char];

/// Horizontal whitespace
pub const SPACES: CharSet = &[' ', '\t'];

/// Line breaks
pub const NEWLINES: CharSet = &['\r', '\n'];

/// Decimal digits
pub const DIGITS: CharSet = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Punctuation that ends a symbol. `!`, `$` and `?` are absent on purpose:
/// they are legal inside names.
pub const MARKS: CharSet = &[
    '"', '#', '%', '&', '\'', '(', ')', '=', '-', '~', '^', '|', '\\', '`', '@', '{', '[', '+', '*',
    ':', '}', ']', '<', ',', '>', '.', '/',
];

/// Statement separator besides newlines
pub const SEMICOLON: CharSet = &[';'];

/// Position in the source, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Offset in characters from the start of the source
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source text plus scan position. Invariant: `position <= text.len()`.
#[derive(Debug, Clone)]
pub struct Cursor {
    text: Vec<char>,
    position: usize,
    /// Offsets at which each line starts
    line_starts: Vec<usize>,
}

impl Cursor {
    /// Create a cursor at the start of `source`
    pub fn new(source: &str) -> Self {
        let text: Vec<char> = source.chars().collect();
        let line_starts = std::iter::once(0)
            .chain(
                text.iter()
                    .enumerate()
                    .filter(|(_, &c)| c == '\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            text,
            position: 0,
            line_starts,
        }
    }

    /// Current scan position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Snapshot the position for a later [`Cursor::reset`]
    pub fn mark(&self) -> usize {
        self.position
    }

    /// Roll back to a position taken with [`Cursor::mark`]
    pub fn reset(&mut self, mark: usize) {
        self.position = mark.min(self.text.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    /// The current character, `None` at end of input
    pub fn peek(&self) -> Option<char> {
        self.text.get(self.position).copied()
    }

    /// The current character if it belongs to `allowed`
    pub fn peek_in(&self, allowed: CharSet) -> Option<char> {
        self.peek().filter(|c| allowed.contains(c))
    }

    /// The character `offset` places ahead of the current one
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.text.get(self.position + offset).copied()
    }

    /// Consume one character
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    /// Move forward `count` characters, clamped to the end of input
    pub fn bump(&mut self, count: usize) {
        self.position = (self.position + count).min(self.text.len());
    }

    /// Step back one character
    pub fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    /// Skip horizontal whitespace, returning the number of characters skipped
    pub fn skip(&mut self) -> usize {
        self.skip_any(&[SPACES])
    }

    /// Skip while the current character belongs to any of `sets`
    pub fn skip_any(&mut self, sets: &[CharSet]) -> usize {
        let start = self.position;
        while let Some(c) = self.peek() {
            if !sets.iter().any(|set| set.contains(&c)) {
                break;
            }
            self.position += 1;
        }
        self.position - start
    }

    /// True when `literal` appears verbatim at the current position
    pub fn looking_at(&self, literal: &str) -> bool {
        let mut offset = 0;
        for expected in literal.chars() {
            if self.peek_at(offset) != Some(expected) {
                return false;
            }
            offset += 1;
        }
        true
    }

    /// True when the current position ends a symbol: end of input, a mark,
    /// whitespace, a newline or `;`.
    pub fn at_boundary(&self) -> bool {
        match self.peek() {
            None => true,
            Some(c) => {
                MARKS.contains(&c) || SPACES.contains(&c) || NEWLINES.contains(&c) || c == ';'
            }
        }
    }

    /// Text between two positions
    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.text.len());
        let start = start.min(end);
        self.text[start..end].iter().collect()
    }

    /// Remaining text from the current position up to the next line break
    pub fn rest_of_line(&self) -> String {
        self.text[self.position..]
            .iter()
            .take_while(|c| !NEWLINES.contains(c))
            .collect()
    }

    /// Line and column of the current position
    pub fn location(&self) -> Location {
        let line = self
            .line_starts
            .partition_point(|&start| start <= self.position);
        let line_start = self.line_starts[line - 1];
        Location {
            offset: self.position,
            line,
            column: self.position - line_start + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_with_allowed_set() {
        let cursor = Cursor::new("7x");
        assert_eq!(cursor.peek(), Some('7'));
        assert_eq!(cursor.peek_in(DIGITS), Some('7'));
        assert_eq!(cursor.peek_in(SPACES), None);
    }

    #[test]
    fn test_peek_at_end() {
        let mut cursor = Cursor::new("a");
        cursor.advance();
        assert_eq!(cursor.peek(), None);
        assert_eq!(cursor.peek_in(MARKS), None);
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_skip_counts() {
        let mut cursor = Cursor::new(" \t \nrest");
        assert_eq!(cursor.skip(), 3);
        assert_eq!(cursor.skip(), 0);
        assert_eq!(cursor.skip_any(&[SPACES, NEWLINES]), 1);
        assert_eq!(cursor.peek(), Some('r'));
    }

    #[test]
    fn test_mark_and_reset() {
        let mut cursor = Cursor::new("hello world");
        let mark = cursor.mark();
        cursor.bump(6);
        assert_eq!(cursor.peek(), Some('w'));
        cursor.reset(mark);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_location_tracks_lines() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.bump(4);
        let loc = cursor.location();
        assert_eq!((loc.line, loc.column), (2, 2));
        assert_eq!(cursor.rest_of_line(), "d");
    }

    #[test]
    fn test_boundary() {
        let mut cursor = Cursor::new("in index");
        cursor.bump(2);
        assert!(cursor.at_boundary());
        cursor.bump(3);
        assert!(!cursor.at_boundary());
    }

    #[test]
    fn test_looking_at_multibyte() {
        let mut cursor = Cursor::new("'日本' ok");
        cursor.advance();
        assert!(cursor.looking_at("日本"));
        assert_eq!(cursor.slice(1, 3), "日本");
    }
}
