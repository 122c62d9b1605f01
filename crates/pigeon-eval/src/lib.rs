//! Pigeon tree-walking evaluator.
//!
//! Executes analyzed programs directly from the annotated tree. Only a
//! program that compiled without diagnostics can be run.
//!
//! ```text
//! Interpreter::register_native → Interpreter::compile → Interpreter::run
//! ```

mod error;
mod evaluator;
mod flow;

pub use error::{EvalError, EvalResult};

use pigeon_compiler::{compile_source, Compilation, CompiledProgram, Natives};
use pigeon_types::{Diagnostics, SourceFile, Type, Value};
use serde::{Deserialize, Serialize};

use crate::evaluator::Evaluator;

/// Runtime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Script calls that may be active at once before
    /// [`EvalError::StackOverflow`].
    pub max_call_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
        }
    }
}

/// Runs a compiled program from the top, clearing values left by any
/// earlier run.
///
/// Globals stay readable through [`CompiledProgram::global`] afterwards.
pub fn run(program: &mut CompiledProgram, options: &EvalOptions) -> EvalResult<()> {
    let (ast, model, scopes) = program.split_mut();
    scopes.reset_values();
    tracing::debug!(
        items = ast.items.len(),
        max_call_depth = options.max_call_depth,
        "running program"
    );
    let result = Evaluator::new(ast, model, scopes, options).run();
    if let Err(err) = &result {
        tracing::debug!(error = %err, "run failed");
    }
    result
}

/// Failure of [`Interpreter::execute`].
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("compilation failed:\n{0}")]
    Compile(Diagnostics),
    #[error(transparent)]
    Runtime(#[from] EvalError),
}

/// A host's handle on the language: its natives and runtime limits.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    natives: Natives,
    options: EvalOptions,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EvalOptions) -> Self {
        Self {
            natives: Natives::new(),
            options,
        }
    }

    /// Makes `f` callable from scripts compiled afterwards.
    pub fn register_native<F>(
        &mut self,
        name: &str,
        parameters: &[Type],
        return_type: Type,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        self.natives.register(name, parameters, return_type, f);
        self
    }

    pub fn natives(&self) -> &Natives {
        &self.natives
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn compile(&self, source: &SourceFile) -> Compilation {
        compile_source(source, &self.natives)
    }

    pub fn run(&self, program: &mut CompiledProgram) -> EvalResult<()> {
        run(program, &self.options)
    }

    /// Compiles and runs `source`, returning the program for inspection.
    pub fn execute(&self, source: &SourceFile) -> Result<CompiledProgram, InterpretError> {
        let mut program = self
            .compile(source)
            .into_runnable()
            .map_err(InterpretError::Compile)?;
        self.run(&mut program)?;
        Ok(program)
    }
}
