//! Variable environment for Zircon
//!
//! A `World` is one scope frame: a local slot map plus an optional link to
//! the enclosing frame. Frames are shared (`Rc<RefCell<_>>`) so a closure can
//! keep its defining frame alive after the call that created it returns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::value::Value;

#[derive(Default)]
struct Frame {
    values: HashMap<String, Value>,
    parent: Option<World>,
    /// Name under which this frame resolves to itself (the global `$`).
    /// Resolved on lookup instead of stored, so the root never owns itself.
    self_name: Option<String>,
}

/// Handle to a scope frame
#[derive(Clone, Default)]
pub struct World(Rc<RefCell<Frame>>);

impl World {
    /// Create a root world with no outer scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child scope of `parent`
    pub fn with_parent(parent: &World) -> Self {
        World(Rc::new(RefCell::new(Frame {
            parent: Some(parent.clone()),
            ..Frame::default()
        })))
    }

    /// The enclosing scope, if any
    pub fn parent(&self) -> Option<World> {
        self.0.borrow().parent.clone()
    }

    /// Make `name` resolve to this world itself
    pub fn bind_self(&self, name: &str) {
        self.0.borrow_mut().self_name = Some(name.to_string());
    }

    fn lookup_local(&self, name: &str) -> Option<Value> {
        let frame = self.0.borrow();
        if let Some(value) = frame.values.get(name) {
            return Some(value.clone());
        }
        if frame.self_name.as_deref() == Some(name) {
            return Some(Value::Scope(self.clone()));
        }
        None
    }

    /// Look a name up here, then in each enclosing scope
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self.clone());
        while let Some(world) = scope {
            if let Some(value) = world.lookup_local(name) {
                return Some(value);
            }
            scope = world.parent();
        }
        None
    }

    /// True when `name` is bound in this frame (not its ancestors)
    pub fn has(&self, name: &str) -> bool {
        let frame = self.0.borrow();
        frame.values.contains_key(name) || frame.self_name.as_deref() == Some(name)
    }

    /// True when `name` is bound here or in any enclosing scope
    pub fn contains(&self, name: &str) -> bool {
        self.owner_of(name).is_some()
    }

    fn owner_of(&self, name: &str) -> Option<World> {
        let mut scope = Some(self.clone());
        while let Some(world) = scope {
            if world.has(name) {
                return Some(world);
            }
            scope = world.parent();
        }
        None
    }

    /// Assign with scope search: overwrite the nearest existing binding,
    /// otherwise declare `name` in this frame.
    pub fn put(&self, name: &str, value: Value) -> &Self {
        let target = self.owner_of(name).unwrap_or_else(|| self.clone());
        target
            .0
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
        self
    }

    /// Declare `name` in this frame, shadowing any outer binding
    pub fn define(&self, name: &str, value: Value) -> &Self {
        self.0.borrow_mut().values.insert(name.to_string(), value);
        self
    }

    /// Names bound in this frame, sorted
    pub fn names(&self) -> Vec<String> {
        let frame = self.0.borrow();
        let mut names: Vec<String> = frame.values.keys().cloned().collect();
        if let Some(name) = &frame.self_name {
            if !frame.values.contains_key(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    /// Drop every binding in this frame. Values are dropped after the
    /// frame is released, so a value may hold this world while it goes.
    pub fn clear(&self) {
        let values = std::mem::take(&mut self.0.borrow_mut().values);
        drop(values);
    }

    /// True when both handles refer to the same frame
    pub fn ptr_eq(&self, other: &World) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True when another handle to this frame exists
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.0) > 1
    }

    pub fn downgrade(&self) -> WeakWorld {
        WeakWorld(Rc::downgrade(&self.0))
    }
}

/// Non-owning handle to a scope frame
#[derive(Clone)]
pub struct WeakWorld(Weak<RefCell<Frame>>);

impl WeakWorld {
    pub fn upgrade(&self) -> Option<World> {
        self.0.upgrade().map(World)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<world: {}>", self.names().join(", "))
    }
}
