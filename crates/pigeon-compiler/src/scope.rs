//! Lexical scopes, shared by analysis and evaluation.
//!
//! Scopes live in an arena addressed by [`ScopeId`]; each one points at its
//! parent for lookup. The analyzer fills in declarations, the evaluator the
//! per-scope value slots. Scopes are allocated depth-first, so everything
//! nested inside a scope occupies the id range returned by
//! [`ScopeTree::subtree`].

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use pigeon_types::ast::NodeId;
use pigeon_types::{Type, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Symbols
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: Type,
    pub name: String,
    /// Declared with `const`, or a loop counter.
    pub read_only: bool,
}

/// Signature of a host function: arguments in, optional result out.
pub type NativeCallable = dyn Fn(&[Value]) -> Result<Option<Value>, String> + Send + Sync;

/// A host-provided function body.
#[derive(Clone)]
pub struct NativeFn(Arc<NativeCallable>);

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Result<Option<Value>, String> {
        (self.0)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFn(..)")
    }
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// Declared in the script: the index of its top-level item and the id
    /// of its body block.
    Script { item: usize, body: NodeId },
    Native(NativeFn),
}

#[derive(Debug, Clone)]
pub struct Function {
    pub return_type: Type,
    pub name: String,
    pub parameters: Vec<Variable>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("'{0}' is already declared in this scope")]
    Redeclaration(String),
    #[error("'{0}' has no value in any enclosing scope")]
    Unbound(String),
}

// ══════════════════════════════════════════════════════════════════════════════
// ScopeTree
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
struct Scope {
    parent: Option<ScopeId>,
    /// One past the last scope nested inside this one, set on close.
    end: u32,
    variables: HashMap<String, Variable>,
    values: HashMap<String, Value>,
}

/// The values of a scope range taken out by [`ScopeTree::suspend`].
#[derive(Debug)]
pub struct Activation {
    start: usize,
    values: Vec<HashMap<String, Value>>,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    /// Functions are global-only and never overloaded.
    functions: HashMap<String, Function>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                end: 1,
                ..Scope::default()
            }],
            functions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    // ── Structure ─────────────────────────────────────────────────────────────

    /// Opens a scope nested in `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            end: id.0 + 1,
            ..Scope::default()
        });
        id
    }

    /// Marks every scope opened since `id` as nested in it.
    pub fn close_scope(&mut self, id: ScopeId) {
        let end = self.scopes.len() as u32;
        if let Some(scope) = self.scopes.get_mut(id.index()) {
            scope.end = end;
        }
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes.get(id.index()).and_then(|s| s.parent)
    }

    /// Ids of `id` and every scope nested in it.
    pub fn subtree(&self, id: ScopeId) -> Range<usize> {
        match self.scopes.get(id.index()) {
            Some(scope) => id.index()..scope.end as usize,
            None => 0..0,
        }
    }

    /// `id` followed by each enclosing scope up to the global one.
    fn chain(&self, id: ScopeId) -> impl Iterator<Item = (ScopeId, &Scope)> + '_ {
        std::iter::successors(Some(id), |&id| self.parent(id))
            .filter_map(|id| self.scopes.get(id.index()).map(|scope| (id, scope)))
    }

    // ── Declarations ──────────────────────────────────────────────────────────

    /// Declares a variable in exactly `scope`; shadowing an outer one is fine.
    pub fn declare_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: Type,
        read_only: bool,
    ) -> Result<(), ScopeError> {
        let Some(target) = self.scopes.get_mut(scope.index()) else {
            return Err(ScopeError::Unbound(name.to_string()));
        };
        if target.variables.contains_key(name) {
            return Err(ScopeError::Redeclaration(name.to_string()));
        }
        target.variables.insert(
            name.to_string(),
            Variable {
                ty,
                name: name.to_string(),
                read_only,
            },
        );
        Ok(())
    }

    /// The nearest declaration of `name` visible from `scope`.
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<&Variable> {
        self.resolve_variable(scope, name).map(|(_, variable)| variable)
    }

    /// Like [`lookup_variable`](Self::lookup_variable), also naming the
    /// scope that holds the declaration.
    pub fn resolve_variable(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Variable)> {
        self.chain(scope)
            .find_map(|(id, s)| s.variables.get(name).map(|variable| (id, variable)))
    }

    pub fn declare_function(&mut self, function: Function) -> Result<(), ScopeError> {
        if self.functions.contains_key(&function.name) {
            return Err(ScopeError::Redeclaration(function.name));
        }
        self.functions.insert(function.name.clone(), function);
        Ok(())
    }

    pub fn lookup_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    // ── Values ────────────────────────────────────────────────────────────────

    /// Binds `name` in exactly `scope`.
    pub fn define(&mut self, scope: ScopeId, name: &str, value: Value) {
        if let Some(target) = self.scopes.get_mut(scope.index()) {
            target.values.insert(name.to_string(), value);
        }
    }

    /// The nearest bound value of `name` visible from `scope`.
    pub fn evaluate(&self, scope: ScopeId, name: &str) -> Option<&Value> {
        self.chain(scope).find_map(|(_, s)| s.values.get(name))
    }

    /// Overwrites the nearest bound value of `name` visible from `scope`.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<(), ScopeError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let Some(s) = self.scopes.get_mut(id.index()) else {
                break;
            };
            if let Some(slot) = s.values.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            current = s.parent;
        }
        Err(ScopeError::Unbound(name.to_string()))
    }

    /// Clears the values of `scope` ahead of a fresh execution of its block.
    pub fn restart(&mut self, scope: ScopeId) {
        if let Some(s) = self.scopes.get_mut(scope.index()) {
            s.values.clear();
        }
    }

    /// Takes the values of every scope in `range`, leaving them empty.
    pub fn suspend(&mut self, range: Range<usize>) -> Activation {
        let start = range.start;
        let values = self.scopes[range]
            .iter_mut()
            .map(|s| std::mem::take(&mut s.values))
            .collect();
        Activation { start, values }
    }

    /// Puts back values taken by [`suspend`](Self::suspend).
    pub fn resume(&mut self, activation: Activation) {
        for (scope, values) in self.scopes[activation.start..]
            .iter_mut()
            .zip(activation.values)
        {
            scope.values = values;
        }
    }

    /// Clears every value, keeping declarations.
    pub fn reset_values(&mut self) {
        for scope in &mut self.scopes {
            scope.values.clear();
        }
    }
}
