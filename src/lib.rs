//! Zircon - an embeddable scripting language
//!
//! Zircon parses straight from characters, evaluates each top-level unit as
//! soon as it is parsed, and does arithmetic in exact decimals. Hosts expose
//! capabilities to scripts by binding [`NativeFn`]s into the root [`World`].

pub mod cursor;
pub mod parser;
pub mod ast;
pub mod value;
pub mod number;
pub mod environment;
pub mod interpreter;
pub mod builtins;
pub mod host;
pub mod error;

pub use builtins::Sink;
pub use environment::World;
pub use error::{ErrorKind, Result, ZirconError};
pub use host::{run, Session, SessionOptions};
pub use interpreter::{calc, Interpreter};
pub use parser::Parser;
pub use value::{NativeFn, Value};

/// Version of the Zircon language
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
