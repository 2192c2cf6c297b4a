//! Parser for Zircon language
//!
//! Recursive descent straight over the character stream. Alternatives are
//! tried with [`Parser::attempt`], which rolls the cursor back when a branch
//! fails; binary operators are folded by precedence climbing. The parser is
//! an iterator that yields one tree per top-level program unit, parsed on
//! demand.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{BinaryOp, CallStyle, FunctionDef, Node, PrefixOp};
use crate::cursor::{Cursor, DIGITS, NEWLINES, SEMICOLON, SPACES};
use crate::error::{ErrorKind, Result, ZirconError};
use crate::number;

const SEPARATORS: &[&[char]] = &[NEWLINES, SEMICOLON];
const UNDERSCORE: &[char] = &['_'];

/// Deepest nesting of brackets, blocks, functions and operator chains a
/// program unit may use
pub const MAX_NESTING: usize = 128;

/// The parser state
pub struct Parser {
    cursor: Cursor,
    depth: usize,
    /// Number of enclosing `attempt`s
    speculating: usize,
}

impl Parser {
    /// Create a parser over `source`
    pub fn new(source: &str) -> Self {
        Self {
            cursor: Cursor::new(source),
            depth: 0,
            speculating: 0,
        }
    }

    /// Parse every program unit, stopping at the first failure
    pub fn parse(source: &str) -> Result<Vec<Node>> {
        Parser::new(source).collect()
    }

    // ==================== Helpers ====================

    /// Errors raised under `attempt` are dropped on rollback, so they carry
    /// no location or source excerpt.
    fn error(&self, kind: ErrorKind) -> ZirconError {
        if self.speculating > 0 {
            return ZirconError::new(kind);
        }
        ZirconError::at(kind, &self.cursor)
    }

    fn expected(&self, what: &str) -> ZirconError {
        self.error(ErrorKind::Expected(what.to_string()))
    }

    /// Skip spaces, then match the first candidate found verbatim. A
    /// candidate ending in a word character must also end at a symbol
    /// boundary, so `in` never matches the start of `index`.
    fn eat<'a>(&mut self, candidates: &[&'a str]) -> Option<&'a str> {
        self.cursor.skip();
        for &candidate in candidates {
            if !self.cursor.looking_at(candidate) {
                continue;
            }
            let start = self.cursor.mark();
            self.cursor.bump(candidate.chars().count());
            let wordy = candidate
                .chars()
                .last()
                .is_some_and(|c| !crate::cursor::MARKS.contains(&c));
            if !wordy || self.cursor.at_boundary() {
                return Some(candidate);
            }
            self.cursor.reset(start);
        }
        None
    }

    fn expect(&mut self, literal: &str) -> Result<()> {
        match self.eat(&[literal]) {
            Some(_) => Ok(()),
            None => Err(self.expected(literal)),
        }
    }

    /// Run a production speculatively; on failure restore the cursor and
    /// report no match.
    fn attempt<T>(&mut self, what: &str, parse: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let start = self.cursor.mark();
        self.speculating += 1;
        let result = parse(self);
        self.speculating -= 1;
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                trace!(
                    production = what,
                    reason = %err.kind,
                    "rollback {} -> {}",
                    self.cursor.position(),
                    start
                );
                self.cursor.reset(start);
                None
            }
        }
    }

    /// Go one level deeper, failing past [`MAX_NESTING`]
    fn deepen(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(ErrorKind::TooDeep(MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run a production one level deeper; the depth is restored afterwards
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let base = self.depth;
        let result = self.deepen().and_then(|()| parse(self));
        self.depth = base;
        result
    }

    fn at_separator(&self) -> bool {
        self.cursor.peek_in(NEWLINES).is_some() || self.cursor.peek_in(SEMICOLON).is_some()
    }

    fn skip_separators(&mut self) {
        self.cursor.skip_any(&[SPACES, NEWLINES, SEMICOLON]);
    }

    /// Skip the rest of a unit that failed to parse
    fn recover(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if SEPARATORS.iter().any(|set| set.contains(&c)) {
                break;
            }
            self.cursor.advance();
        }
    }

    // ==================== Statements ====================

    /// statement ( newlines | ';' | END )
    pub fn program(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "program");
        let node = self.statement()?;
        self.cursor.skip();
        if !self.cursor.is_at_end() && !self.at_separator() {
            return Err(self.error(ErrorKind::ExpectedSeparator));
        }
        self.skip_separators();
        Ok(node)
    }

    /// [ 'return' ] ( if | for | let | assignment | simple )
    fn statement(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "statement");
        let is_return = self.eat(&["return"]).is_some();

        let node = if self.eat(&["if"]).is_some() {
            self.if_rest()?
        } else if self.eat(&["for"]).is_some() {
            self.for_rest()?
        } else if self.eat(&["let"]).is_some() {
            let name = self.symbol_name()?;
            self.expect("=")?;
            Node::Let {
                name,
                value: Box::new(self.simple()?),
            }
        } else if let Some(name) = self.attempt("assignment", Self::assignment_head) {
            Node::Assign {
                name,
                value: Box::new(self.simple()?),
            }
        } else {
            self.simple()?
        };

        Ok(if is_return {
            Node::Return(Box::new(node))
        } else {
            node
        })
    }

    /// expression block { 'ef' expression block } [ 'else' block ]
    fn if_rest(&mut self) -> Result<Node> {
        let mut parts = vec![self.expression()?, self.block()?];
        while self.eat(&["ef"]).is_some() {
            parts.push(self.expression()?);
            parts.push(self.block()?);
        }
        if self.eat(&["else"]).is_some() {
            parts.push(self.block()?);
        }
        Ok(Node::If(parts))
    }

    /// [ symbol 'in' ] expression block
    fn for_rest(&mut self) -> Result<Node> {
        let var = self.attempt("for-in", |p| {
            let var = p.symbol_name()?;
            p.expect("in")?;
            Ok(var)
        });
        let subject = self.expression()?;
        Ok(Node::For {
            var,
            subject: Box::new(subject),
            body: Box::new(self.block()?),
        })
    }

    /// symbol ':='
    fn assignment_head(&mut self) -> Result<String> {
        let name = self.symbol_name()?;
        self.expect(":=")?;
        Ok(name)
    }

    /// expression [ tuple ]
    ///
    /// A bare argument list after an expression turns it into a
    /// command-style call: `echo 'hi'` reads as `echo('hi')`.
    fn simple(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "simple");
        let head = self.expression()?;
        Ok(match self.attempt("arguments", Self::tuple) {
            Some(args) => Node::call(head, args, CallStyle::Command),
            None => head,
        })
    }

    /// expression { ',' expression }
    fn tuple(&mut self) -> Result<Vec<Node>> {
        let mut items = vec![self.expression()?];
        while self.eat(&[","]).is_some() {
            self.cursor.skip_any(&[SPACES, NEWLINES]);
            items.push(self.expression()?);
        }
        Ok(items)
    }

    /// '{' [ statement { newlines statement } ] '}'
    fn block(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "block");
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> Result<Node> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.eat(&["}"]).is_some() {
                break;
            }
            stmts.push(self.statement()?);
            self.cursor.skip();
            if !self.at_separator() {
                self.expect("}")?;
                break;
            }
        }
        Ok(Node::Block(stmts))
    }

    // ==================== Expressions ====================

    /// prefix { operator prefix }
    fn expression(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "expression");
        let base = self.depth;
        let result = self.fold();
        self.depth = base;
        result
    }

    /// Each fold nests the tree one level deeper on the left, so it counts
    /// toward the limit until the whole expression is done.
    fn fold(&mut self) -> Result<Node> {
        let mut left = self.prefix()?;
        while let Some(op) = self.operator() {
            self.deepen()?;
            left = self.shift(left, op)?;
        }
        Ok(left)
    }

    /// Fold `left op prefix`, first absorbing any operators that bind
    /// tighter than `op` into the right operand.
    fn shift(&mut self, left: Node, op: BinaryOp) -> Result<Node> {
        let mut right = self.prefix()?;
        let value = op.precedence();
        loop {
            let mark = self.cursor.mark();
            let Some(next) = self.operator() else {
                break;
            };
            let binds = if value < 0 {
                value <= next.precedence()
            } else {
                value < next.precedence()
            };
            if !binds {
                self.cursor.reset(mark);
                break;
            }
            right = self.nested(move |p| p.shift(right, next))?;
        }
        Ok(Node::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn operator(&mut self) -> Option<BinaryOp> {
        let symbols = BinaryOp::ALL.map(BinaryOp::symbol);
        self.eat(&symbols).and_then(BinaryOp::from_symbol)
    }

    /// [ '+' | '-' | 'not' | 'exists' | 'empty' ] primitive
    fn prefix(&mut self) -> Result<Node> {
        let symbols = PrefixOp::ALL.map(PrefixOp::symbol);
        match self.eat(&symbols).and_then(PrefixOp::from_symbol) {
            Some(op) => Ok(Node::Prefix {
                op,
                operand: Box::new(self.primitive()?),
            }),
            None => self.primitive(),
        }
    }

    /// ( bool | function | string | group | number | symbol ) { postfix }
    fn primitive(&mut self) -> Result<Node> {
        trace!(position = self.cursor.position(), "primitive");
        self.nested(Self::operand)
    }

    fn operand(&mut self) -> Result<Node> {
        // an opening quote, paren or digit commits to that literal
        let mut node = if let Some(b) = self.eat(&["true", "false"]) {
            Node::bool(b == "true")
        } else if self.eat(&["do"]).is_some() {
            self.function_rest()?
        } else if matches!(self.cursor.peek(), Some('\'' | '"')) {
            self.string()?
        } else if self.cursor.peek() == Some('(') {
            self.group()?
        } else if self.cursor.peek_in(DIGITS).is_some() {
            self.number()?
        } else if let Some(node) = self.attempt("symbol", Self::symbol) {
            node
        } else {
            return Err(self.expected("primitive"));
        };

        while let Some((args, style)) = self.attempt("postfix", Self::postfix) {
            self.deepen()?;
            node = Node::call(node, args, style);
        }
        Ok(node)
    }

    /// '.' symbol | '(' arguments ')', written directly after the operand
    fn postfix(&mut self) -> Result<(Vec<Node>, CallStyle)> {
        match self.cursor.peek() {
            Some('.') => {
                self.cursor.advance();
                let member = self.symbol()?;
                Ok((vec![member], CallStyle::Dot))
            }
            Some('(') => {
                self.cursor.advance();
                let (args, _) = self.list()?;
                Ok((args, CallStyle::Paren))
            }
            _ => Err(self.expected("'.' or '('")),
        }
    }

    /// Items up to the closing paren, separated by commas or newlines.
    /// Also reports whether any comma was seen.
    fn list(&mut self) -> Result<(Vec<Node>, bool)> {
        let mut items = Vec::new();
        let mut comma = false;
        loop {
            self.cursor.skip_any(&[SPACES, NEWLINES]);
            if self.eat(&[")"]).is_some() {
                return Ok((items, comma));
            }
            items.push(self.expression()?);
            if self.eat(&[","]).is_some() {
                comma = true;
                continue;
            }
            if self.at_separator() {
                self.skip_separators();
                continue;
            }
            self.expect(")")?;
            return Ok((items, comma));
        }
    }

    /// '(' [ expression { ( ',' | newlines ) expression } [ ',' ] ] ')'
    fn group(&mut self) -> Result<Node> {
        self.expect("(")?;
        let (mut items, comma) = self.list()?;
        if items.len() == 1 && !comma {
            return Ok(items.remove(0));
        }
        Ok(Node::Tuple(items))
    }

    /// 'do' [ symbol { ',' symbol } [ ',' ] ] ( ':' statement | block )
    fn function_rest(&mut self) -> Result<Node> {
        let mut params = Vec::new();
        while let Some(name) = self.attempt("parameter", Self::symbol_name) {
            params.push(name);
            if self.eat(&[","]).is_none() {
                break;
            }
        }
        let body = if self.eat(&[":"]).is_some() {
            self.statement()?
        } else {
            self.block()?
        };
        Ok(Node::Function(Rc::new(FunctionDef { params, body })))
    }

    // ==================== Literals ====================

    /// "'" { any | "''" } "'" | '"' { any | '\"' } '"'
    fn string(&mut self) -> Result<Node> {
        self.cursor.skip();
        match self.cursor.peek() {
            Some('\'') => {
                self.cursor.advance();
                let mut text = String::new();
                loop {
                    match self.cursor.advance() {
                        None => return Err(self.error(ErrorKind::UnterminatedString('\''))),
                        Some('\'') => {
                            if self.cursor.peek() != Some('\'') {
                                return Ok(Node::string(text));
                            }
                            self.cursor.advance();
                            text.push('\'');
                        }
                        Some(c) => text.push(c),
                    }
                }
            }
            Some('"') => {
                self.cursor.advance();
                let mut text = String::new();
                let mut escaped = false;
                loop {
                    let Some(c) = self.cursor.advance() else {
                        return Err(self.error(ErrorKind::UnterminatedString('"')));
                    };
                    if escaped {
                        match c {
                            'n' => text.push('\n'),
                            't' => text.push('\t'),
                            'r' => text.push('\r'),
                            '"' | '\\' => text.push(c),
                            other => {
                                text.push('\\');
                                text.push(other);
                            }
                        }
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        return Ok(Node::string(text));
                    } else {
                        text.push(c);
                    }
                }
            }
            _ => Err(self.expected("string")),
        }
    }

    /// digits { '_' | digits } [ '.' digits { '_' | digits } ]
    ///
    /// A trailing `.` without digits is left alone so `3.double` is a
    /// method-style call on `3`.
    fn number(&mut self) -> Result<Node> {
        self.cursor.skip();
        if self.cursor.peek_in(DIGITS).is_none() {
            return Err(self.expected("digit"));
        }
        let start = self.cursor.mark();
        self.cursor.skip_any(&[DIGITS, UNDERSCORE]);
        if self.cursor.peek() == Some('.') {
            self.cursor.advance();
            if self.cursor.skip_any(&[DIGITS, UNDERSCORE]) == 0 {
                self.cursor.retreat();
            }
        }
        let text = self.cursor.slice(start, self.cursor.position());
        number::parse(&text)
            .map(Node::number)
            .map_err(|kind| self.error(kind))
    }

    fn symbol(&mut self) -> Result<Node> {
        self.symbol_name().map(Node::Symbol)
    }

    /// Maximal run of characters that are not marks, whitespace, newlines
    /// or `;`, not starting with a digit.
    fn symbol_name(&mut self) -> Result<String> {
        self.cursor.skip();
        if self.cursor.peek_in(DIGITS).is_some() || self.cursor.at_boundary() {
            return Err(self.expected("symbol"));
        }
        let start = self.cursor.mark();
        self.cursor.advance();
        while !self.cursor.at_boundary() {
            self.cursor.advance();
        }
        Ok(self.cursor.slice(start, self.cursor.position()))
    }
}

impl Iterator for Parser {
    type Item = Result<Node>;

    /// Parse the next program unit. After a failure the rest of the unit is
    /// skipped, so a caller that keeps iterating resumes at the next one.
    fn next(&mut self) -> Option<Self::Item> {
        self.skip_separators();
        if self.cursor.is_at_end() {
            return None;
        }
        match self.program() {
            Ok(node) => {
                debug!(unit = %node, "parsed");
                Some(Ok(node))
            }
            Err(err) => {
                debug!(error = %err, "parse failed");
                self.recover();
                Some(Err(err))
            }
        }
    }
}
