//! The output of compilation.

use std::collections::HashMap;

use pigeon_types::ast::{NodeId, Program};
use pigeon_types::{Diagnostics, Type, Value};

use crate::scope::{ScopeId, ScopeTree};

/// Per-node facts recorded by the analyzer.
#[derive(Debug, Clone, Default)]
pub struct SemanticModel {
    /// Resolved type of every checked expression.
    types: HashMap<NodeId, Type>,
    /// Scope of every block, and the scope a name was resolved from for
    /// identifiers, assignments and declarations.
    scopes: HashMap<NodeId, ScopeId>,
}

impl SemanticModel {
    pub fn type_of(&self, id: NodeId) -> Option<Type> {
        self.types.get(&id).copied()
    }

    pub fn scope_of(&self, id: NodeId) -> Option<ScopeId> {
        self.scopes.get(&id).copied()
    }

    pub fn annotated_expressions(&self) -> usize {
        self.types.len()
    }

    pub(crate) fn record_type(&mut self, id: NodeId, ty: Type) {
        self.types.insert(id, ty);
    }

    pub(crate) fn record_scope(&mut self, id: NodeId, scope: ScopeId) {
        self.scopes.insert(id, scope);
    }
}

/// An analyzed program: its tree, annotations and scopes.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    ast: Program,
    model: SemanticModel,
    scopes: ScopeTree,
}

impl CompiledProgram {
    pub(crate) fn new(ast: Program, model: SemanticModel, scopes: ScopeTree) -> Self {
        Self { ast, model, scopes }
    }

    pub fn ast(&self) -> &Program {
        &self.ast
    }

    pub fn model(&self) -> &SemanticModel {
        &self.model
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Borrows the tree and annotations alongside mutable scopes, for running.
    pub fn split_mut(&mut self) -> (&Program, &SemanticModel, &mut ScopeTree) {
        (&self.ast, &self.model, &mut self.scopes)
    }

    /// The value a global variable held when the last run ended.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.scopes.evaluate(ScopeId::GLOBAL, name)
    }
}

/// Diagnostics from every stage plus, when analysis ran, the program.
#[derive(Debug)]
pub struct Compilation {
    pub diagnostics: Diagnostics,
    program: Option<CompiledProgram>,
}

impl Compilation {
    pub(crate) fn new(diagnostics: Diagnostics, program: Option<CompiledProgram>) -> Self {
        Self {
            diagnostics,
            program,
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// The analyzed program, annotated even when it has semantic errors.
    /// `None` when lexing or parsing failed.
    pub fn program(&self) -> Option<&CompiledProgram> {
        self.program.as_ref()
    }

    /// The program, only if compilation produced no diagnostics.
    pub fn into_runnable(self) -> Result<CompiledProgram, Diagnostics> {
        match self.program {
            Some(program) if !self.diagnostics.has_errors() => Ok(program),
            _ => Err(self.diagnostics),
        }
    }
}
