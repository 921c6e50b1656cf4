use crate::runtime::value::{MapRef, Value};
use std::fmt;
use std::rc::Rc;

/// Index of a scope in the [`Environment`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A closure's hold on the scope it was created in.
///
/// While any capture of a scope is alive, the scope and every scope enclosing
/// it survive [`Environment::release`].
#[derive(Clone, Debug)]
pub struct Capture {
    id: ScopeId,
    _anchor: Rc<()>,
}

impl Capture {
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    depth: usize,
    variables: MapRef,
    anchor: Rc<()>,
    /// Held so the parent outlives this scope.
    _parent_anchor: Option<Rc<()>>,
}

impl Scope {
    fn is_captured(&self) -> bool {
        Rc::strong_count(&self.anchor) > 1
    }
}

/// Arena of chained variable scopes.
///
/// Scopes pushed for calls and loops are released in stack order with
/// [`Environment::mark`] and [`Environment::release`]. A released scope that
/// is still captured, directly or through a nested scope, is parked and freed
/// by a later sweep once the last capture is dropped. Freed slots are reused.
#[derive(Debug)]
pub struct Environment {
    slots: Vec<Option<Scope>>,
    free: Vec<usize>,
    stack: Vec<ScopeId>,
    parked: Vec<ScopeId>,
    sweep_at: usize,
}

const MIN_SWEEP: usize = 64;

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let mut env = Self {
            slots: Vec::new(),
            free: Vec::new(),
            stack: Vec::new(),
            parked: Vec::new(),
            sweep_at: MIN_SWEEP,
        };
        env.allocate(None);
        env
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Number of live scopes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes a scope that lives until the matching [`Environment::release`].
    pub fn push_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = self.allocate(parent);
        self.stack.push(id);
        id
    }

    /// Pushes a parentless scope that is never released, such as the one an
    /// import is evaluated in.
    pub fn push_root_scope(&mut self) -> ScopeId {
        self.allocate(None)
    }

    pub fn capture(&self, id: ScopeId) -> Capture {
        let anchor = match self.scope(id) {
            Some(scope) => scope.anchor.clone(),
            None => Rc::new(()),
        };
        Capture {
            id,
            _anchor: anchor,
        }
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).and_then(|scope| scope.parent)
    }

    pub fn depth(&self, id: ScopeId) -> usize {
        self.scope(id).map_or(0, |scope| scope.depth)
    }

    /// Outermost scope of the chain starting at `id`.
    pub fn root(&self, id: ScopeId) -> ScopeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Live bindings of a scope.
    pub fn variables(&self, id: ScopeId) -> MapRef {
        match self.scope(id) {
            Some(scope) => scope.variables.clone(),
            None => Value::empty_map(),
        }
    }

    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(id);
        while let Some(scope) = current.and_then(|id| self.scope(id)) {
            if let Some(value) = scope.variables.borrow().get(name) {
                return Some(value.clone());
            }
            current = scope.parent;
        }
        None
    }

    pub fn get(&self, id: ScopeId, name: &str) -> Value {
        self.lookup(id, name).unwrap_or(Value::Undefined)
    }

    /// Overwrites the innermost binding of `name`, or creates it in `id`.
    pub fn set(&self, id: ScopeId, name: &str, value: Value) {
        let mut current = Some(id);
        while let Some(scope) = current.and_then(|id| self.scope(id)) {
            let mut variables = scope.variables.borrow_mut();
            if let Some(slot) = variables.get_mut(name) {
                *slot = value;
                return;
            }
            drop(variables);
            current = scope.parent;
        }
        self.define(id, name, value);
    }

    pub fn define(&self, id: ScopeId, name: &str, value: Value) {
        if let Some(scope) = self.scope(id) {
            scope.variables.borrow_mut().insert(name.to_string(), value);
        }
    }

    pub fn mark(&self) -> usize {
        self.stack.len()
    }

    /// Drops the scopes pushed since `mark`; captured ones are parked.
    pub fn release(&mut self, mark: usize) {
        while self.stack.len() > mark {
            let Some(id) = self.stack.pop() else {
                break;
            };
            if self.scope(id).is_some_and(Scope::is_captured) {
                self.parked.push(id);
            } else {
                self.free_slot(id);
            }
        }
        if self.parked.len() >= self.sweep_at {
            self.sweep();
            self.sweep_at = MIN_SWEEP.max(self.parked.len() * 2);
        }
    }

    /// Frees parked scopes whose captures are all gone. Freeing a scope drops
    /// its hold on the parent, so this repeats until nothing changes.
    pub fn sweep(&mut self) {
        loop {
            let parked = std::mem::take(&mut self.parked);
            let before = parked.len();
            for id in parked {
                if self.scope(id).is_some_and(Scope::is_captured) {
                    self.parked.push(id);
                } else {
                    self.free_slot(id);
                }
            }
            if self.parked.len() == before {
                break;
            }
        }
    }

    fn allocate(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let parent_scope = parent.and_then(|p| self.scope(p));
        let scope = Scope {
            parent,
            depth: parent_scope.map_or(0, |p| p.depth + 1),
            variables: Value::empty_map(),
            anchor: Rc::new(()),
            _parent_anchor: parent_scope.map(|p| p.anchor.clone()),
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(scope);
                ScopeId(index)
            }
            None => {
                self.slots.push(Some(scope));
                ScopeId(self.slots.len() - 1)
            }
        }
    }

    fn free_slot(&mut self, id: ScopeId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }
}
