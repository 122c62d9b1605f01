//! Host-provided functions.

use std::collections::BTreeMap;

use pigeon_types::{Type, Value};

use crate::scope::{Function, FunctionBody, NativeFn, Variable};

/// Functions a host makes callable from scripts.
///
/// Registered before compilation; the analyzer declares them globally
/// ahead of any script function.
#[derive(Debug, Clone, Default)]
pub struct Natives {
    functions: BTreeMap<String, Function>,
}

impl Natives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, replacing and returning any earlier registration.
    pub fn register<F>(
        &mut self,
        name: &str,
        parameters: &[Type],
        return_type: Type,
        f: F,
    ) -> Option<Function>
    where
        F: Fn(&[Value]) -> Result<Option<Value>, String> + Send + Sync + 'static,
    {
        let parameters = parameters
            .iter()
            .enumerate()
            .map(|(i, &ty)| Variable {
                ty,
                name: format!("arg{i}"),
                read_only: false,
            })
            .collect();
        let function = Function {
            return_type,
            name: name.to_string(),
            parameters,
            body: FunctionBody::Native(NativeFn::new(f)),
        };
        let previous = self.functions.insert(name.to_string(), function);
        if previous.is_some() {
            tracing::warn!(name, "native function registered twice; keeping the latest");
        }
        previous
    }

    /// Registered functions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
