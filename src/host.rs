//! Host bridge and run entry point
//!
//! A [`Session`] owns one root world and one output sink. Each top-level
//! unit is parsed, evaluated against the root world and traced to the
//! diagnostic stream as `#> value` before the next unit is parsed.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::{info, warn};

use crate::builtins::{self, Sink};
use crate::environment::World;
use crate::error::Result;
use crate::interpreter::{Interpreter, MAX_CALL_DEPTH};
use crate::parser::Parser;
use crate::value::{NativeFn, Value};

/// Name the root world is bound under
pub const SELF_NAME: &str = "$";

/// Prefix of each per-unit diagnostic line
pub const TRACE_PREFIX: &str = "#> ";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Write `#> value` after each unit
    pub trace: bool,
    /// Limit on nested closure calls
    pub max_depth: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            trace: true,
            max_depth: MAX_CALL_DEPTH,
        }
    }
}

/// A root world plus the streams scripts talk to
pub struct Session {
    world: World,
    interpreter: Interpreter,
    diagnostics: Option<Sink>,
}

impl Session {
    /// Create a session whose `echo`/`print` write to `sink`
    pub fn new(sink: Sink) -> Self {
        Self::with_options(sink, SessionOptions::default())
    }

    pub fn with_options(sink: Sink, options: SessionOptions) -> Self {
        let world = World::new();
        world.bind_self(SELF_NAME);
        for native in builtins::host_bridge(&sink)
            .into_iter()
            .chain(builtins::prelude())
        {
            world.define(&native.name.clone(), Value::Native(native));
        }

        let diagnostics = if options.trace {
            let stderr: Sink = Rc::new(RefCell::new(io::stderr()));
            Some(stderr)
        } else {
            None
        };

        Self {
            world,
            interpreter: Interpreter::with_max_depth(options.max_depth),
            diagnostics,
        }
    }

    /// Send the per-unit trace somewhere other than stderr
    pub fn with_diagnostics(mut self, sink: Sink) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// The root world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Let the host add or override bindings before evaluation
    pub fn seed(&self, seed: impl FnOnce(&World)) -> &Self {
        seed(&self.world);
        self
    }

    /// Bind a host capability under its own name
    pub fn register(&self, native: NativeFn) -> &Self {
        self.world.put(&native.name.clone(), Value::Native(native));
        self
    }

    /// Parse and evaluate `source` unit by unit against the root world,
    /// stopping at the first failure. Returns the last unit's value.
    pub fn run(&mut self, source: &str) -> Result<Value> {
        info!(source, "run");
        let mut last = Value::Nil;
        for unit in Parser::new(source) {
            let node = unit?;
            last = self.interpreter.calc(&node, &self.world)?;
            self.trace(&last);
        }
        Ok(last)
    }

    fn trace(&self, value: &Value) {
        let Some(diagnostics) = &self.diagnostics else {
            return;
        };
        let mut out = diagnostics.borrow_mut();
        if let Err(err) = writeln!(out, "{}{}", TRACE_PREFIX, value) {
            warn!(error = %err, "diagnostic stream unavailable");
        }
    }
}

/// Closures stored in the world they capture form `Rc` cycles, so the
/// session empties its frames on the way out.
impl Drop for Session {
    fn drop(&mut self) {
        self.interpreter.release();
        self.world.clear();
    }
}

/// One-shot entry point: build a fresh session on `sink`, apply the seed
/// callback after the defaults, then evaluate `source`.
pub fn run(source: &str, seed: Option<&dyn Fn(&World)>, sink: Sink) -> Result<Value> {
    let mut session = Session::new(sink);
    if let Some(seed) = seed {
        session.seed(seed);
    }
    session.run(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> (Rc<RefCell<Vec<u8>>>, Sink) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let sink: Sink = buffer.clone();
        (buffer, sink)
    }

    fn text(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buffer.borrow().clone()).unwrap()
    }

    #[test]
    fn test_trace_lines() {
        let (out, sink) = buffer();
        let (diag, diag_sink) = buffer();
        let mut session = Session::new(sink).with_diagnostics(diag_sink);
        session.run("1 + 1\necho 'x'").unwrap();
        assert_eq!(text(&out), "x\n");
        assert_eq!(text(&diag), "#> 2\n#> nil\n");
    }

    #[test]
    fn test_trace_disabled() {
        let (_, sink) = buffer();
        let options = SessionOptions {
            trace: false,
            ..SessionOptions::default()
        };
        let mut session = Session::with_options(sink, options);
        assert_eq!(session.run("3").unwrap(), Value::from(3));
    }

    #[test]
    fn test_seed_runs_after_defaults() {
        let (out, sink) = buffer();
        let seed: &dyn Fn(&World) = &|world: &World| {
            world.put("echo", Value::from("shadowed"));
            world.put("greeting", Value::from("hello"));
        };
        let result = run("greeting", Some(seed), sink).unwrap();
        assert_eq!(result, Value::from("hello"));
        assert_eq!(text(&out), "");
    }

    #[test]
    fn test_drop_empties_root_world() {
        let (_, sink) = buffer();
        let mut session = Session::new(sink).with_diagnostics(buffer().1);
        session.run("f := do: 1").unwrap();
        let root = session.world().clone();
        drop(session);
        assert!(root.names().iter().all(|name| name == SELF_NAME));
        assert!(!root.is_shared());
    }

    #[test]
    fn test_session_world_persists() {
        let (_, sink) = buffer();
        let mut session = Session::new(sink).with_diagnostics(buffer().1);
        session.run("x := 41").unwrap();
        assert_eq!(session.run("x + 1").unwrap(), Value::from(42));
    }
}
