//! Abstract Syntax Tree definitions for Zircon
//!
//! A closed set of node kinds. Every node renders back to source-like text;
//! literal nodes render their canonical form, which parses to the same node.

use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;

use crate::number;
use crate::value::NativeFn;

/// Literal values written in the source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(BigDecimal),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", number::format(n)),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Plus,   // +
    Minus,  // -
    Not,    // not
    Exists, // exists
    Empty,  // empty
}

impl PrefixOp {
    pub const ALL: [PrefixOp; 5] = [
        PrefixOp::Plus,
        PrefixOp::Minus,
        PrefixOp::Not,
        PrefixOp::Exists,
        PrefixOp::Empty,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
            PrefixOp::Not => "not",
            PrefixOp::Exists => "exists",
            PrefixOp::Empty => "empty",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pair,   // :
    And,    // and
    Or,     // or
    Le,     // <=
    Ne,     // <>
    Lt,     // <
    Eq,     // =
    Ge,     // >=
    Gt,     // >
    Is,     // is
    In,     // in
    Concat, // &
    Add,    // +
    Sub,    // -
    Mul,    // *
    Div,    // /
    Rem,    // %
    Quot,   // \
    Pow,    // ^
}

impl BinaryOp {
    /// Matching order for the parser. Longer symbols precede their prefixes.
    pub const ALL: [BinaryOp; 19] = [
        BinaryOp::Pair,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Le,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Eq,
        BinaryOp::Ge,
        BinaryOp::Gt,
        BinaryOp::Is,
        BinaryOp::In,
        BinaryOp::Concat,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Quot,
        BinaryOp::Pow,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Pair => ":",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Le => "<=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Eq => "=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Is => "is",
            BinaryOp::In => "in",
            BinaryOp::Concat => "&",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Quot => "\\",
            BinaryOp::Pow => "^",
        }
    }

    /// Binding power. Positive values associate left, negative values right;
    /// larger magnitudes bind tighter.
    pub fn precedence(self) -> i32 {
        match self {
            BinaryOp::Pair => -1,
            BinaryOp::And | BinaryOp::Or => 2,
            BinaryOp::Le
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Eq
            | BinaryOp::Ge
            | BinaryOp::Gt => 3,
            BinaryOp::Is | BinaryOp::In => 4,
            BinaryOp::Concat | BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem | BinaryOp::Quot => 6,
            BinaryOp::Pow => 7,
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How a call was written; evaluation is the same for all three
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `f(a, b)`
    Paren,
    /// `f a, b`
    Command,
    /// `x.f`
    Dot,
}

/// Parameters and body of a `do` function literal
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: Node,
}

/// Expression and statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `true`, `1_000.5`, `'text'`
    Literal(Literal),

    /// A name, resolved at evaluation time
    Symbol(String),

    /// `-x`, `not done`
    Prefix { op: PrefixOp, operand: Box<Node> },

    /// `a + b`
    Binary {
        left: Box<Node>,
        op: BinaryOp,
        right: Box<Node>,
    },

    /// Parenthesized, command-style or dot call
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        style: CallStyle,
    },

    /// Flat `[cond, action, cond, action, ..., else?]`
    If(Vec<Node>),

    /// `return x`
    Return(Box<Node>),

    /// `do x, y: x + y`
    Function(Rc<FunctionDef>),

    /// Host capability embedded in a tree
    Native(NativeFn),

    /// Grouping with no operator: `(a, b)` or bare argument lists
    Tuple(Vec<Node>),

    /// `{ stmt; stmt }`
    Block(Vec<Node>),

    /// `let x = value`
    Let { name: String, value: Box<Node> },

    /// `x := value`
    Assign { name: String, value: Box<Node> },

    /// `for x in items { }` or `for cond { }`
    For {
        var: Option<String>,
        subject: Box<Node>,
        body: Box<Node>,
    },
}

impl Node {
    pub fn bool(value: bool) -> Self {
        Node::Literal(Literal::Bool(value))
    }

    pub fn number(value: BigDecimal) -> Self {
        Node::Literal(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Node::Literal(Literal::String(value.into()))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Node::Symbol(name.into())
    }

    pub fn call(callee: Node, args: Vec<Node>, style: CallStyle) -> Self {
        Node::Call {
            callee: Box::new(callee),
            args,
            style,
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, nodes: &[Node], sep: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(lit) => write!(f, "{}", lit),
            Node::Symbol(name) => f.write_str(name),
            Node::Prefix { op, operand } => match op {
                PrefixOp::Plus | PrefixOp::Minus => write!(f, "{}{}", op.symbol(), operand),
                _ => write!(f, "{} {}", op.symbol(), operand),
            },
            Node::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Node::Call {
                callee,
                args,
                style,
            } => match style {
                CallStyle::Paren => {
                    write!(f, "{}(", callee)?;
                    join(f, args, ", ")?;
                    f.write_str(")")
                }
                CallStyle::Command => {
                    write!(f, "{} ", callee)?;
                    join(f, args, ", ")
                }
                CallStyle::Dot => {
                    write!(f, "{}", callee)?;
                    for arg in args {
                        write!(f, ".{}", arg)?;
                    }
                    Ok(())
                }
            },
            Node::If(parts) => {
                for (i, chunk) in parts.chunks(2).enumerate() {
                    match chunk {
                        [cond, action] => {
                            let keyword = if i == 0 { "if" } else { " ef" };
                            write!(f, "{} {} {}", keyword, cond, action)?;
                        }
                        [otherwise] => write!(f, " else {}", otherwise)?,
                        _ => {}
                    }
                }
                Ok(())
            }
            Node::Return(inner) => write!(f, "return {}", inner),
            Node::Function(def) => {
                f.write_str("do")?;
                if !def.params.is_empty() {
                    write!(f, " {}", def.params.join(", "))?;
                }
                match &def.body {
                    Node::Block(_) => write!(f, " {}", def.body),
                    body => write!(f, ": {}", body),
                }
            }
            Node::Native(native) => write!(f, "<native {}>", native.name),
            Node::Tuple(items) => join(f, items, ", "),
            Node::Block(stmts) => {
                if stmts.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                join(f, stmts, "; ")?;
                f.write_str(" }")
            }
            Node::Let { name, value } => write!(f, "let {} = {}", name, value),
            Node::Assign { name, value } => write!(f, "{} := {}", name, value),
            Node::For { var, subject, body } => match var {
                Some(var) => write!(f, "for {} in {} {}", var, subject, body),
                None => write!(f, "for {} {}", subject, body),
            },
        }
    }
}
