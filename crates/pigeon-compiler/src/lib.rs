//! Pigeon compiler: orchestrates the front-end pipeline.
//!
//! ```text
//! Pigeon Source → Lexer → Parser → Semantic Analyzer → CompiledProgram
//! ```
//!
//! The resulting [`CompiledProgram`] carries the tree, its type and scope
//! annotations, and the scope tree the evaluator runs against.

pub mod checker;
pub mod natives;
pub mod operators;
mod program;
pub mod scope;
pub mod stack;

pub use checker::SemanticAnalyzer;
pub use natives::Natives;
pub use program::{Compilation, CompiledProgram, SemanticModel};
pub use scope::{Function, FunctionBody, NativeFn, ScopeError, ScopeId, ScopeTree, Variable};

use pigeon_types::ast::Program;
use pigeon_types::{Diagnostics, SourceFile};

/// Analyzes an already parsed program.
pub fn compile(program: Program, source: &SourceFile, natives: &Natives) -> Compilation {
    let mut diagnostics = Diagnostics::empty();
    let (scopes, model) = SemanticAnalyzer::new(&mut diagnostics, source, natives).analyze(&program);
    tracing::debug!(
        file = %source.name,
        errors = diagnostics.total_errors,
        scopes = scopes.len(),
        annotated = model.annotated_expressions(),
        "semantic analysis finished"
    );
    Compilation::new(diagnostics, Some(CompiledProgram::new(program, model, scopes)))
}

/// Lexes, parses and analyzes `source`.
///
/// Analysis only runs on a program free of syntax errors.
pub fn compile_source(source: &SourceFile, natives: &Natives) -> Compilation {
    let parsed = pigeon_parser::parse_source(source);
    match parsed.program {
        Some(program) => compile(program, source, natives),
        None => {
            tracing::debug!(
                file = %source.name,
                errors = parsed.errors.total_errors,
                "parsing failed"
            );
            Compilation::new(parsed.errors, None)
        }
    }
}

/// Checks a source string without natives, returning only its diagnostics.
pub fn type_check(source: &str, name: &str) -> Diagnostics {
    let file = SourceFile::new(name, source);
    compile_source(&file, &Natives::new()).diagnostics
}
