// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::protocol::Value;

/// A single registered method: decoded arguments in, encoded results out. Arity/type checking
/// is the closure's own responsibility, since Rust has no runtime reflection to check it for us
/// (spec.md §9's "typed redesign" — a table of closures replacing reflective dispatch).
pub type MethodFn = dyn Fn(Vec<Value>) -> Result<Vec<Value>, DispatchError> + Send + Sync;

/// Invokes a named method on a registered object with decoded arguments. Implementors must be
/// safe to call concurrently from multiple connection threads.
pub trait Service: Send + Sync {
    fn handle(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError>;
}

/// A `Service` built from a name -> closure table, populated once at construction and read-only
/// afterwards. This is the typed stand-in for the reflective "call method by name" dispatch the
/// original used.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<&'static str, Box<MethodFn>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    pub fn method<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, DispatchError> + Send + Sync + 'static,
    {
        self.methods.insert(name, Box::new(f));
        self
    }
}

impl Service for MethodTable {
    fn handle(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, DispatchError> {
        let Some(f) = self.methods.get(method) else {
            return Err(DispatchError::UnknownMethod(method.to_string()));
        };

        f(args)
    }
}

/// Checks that `args` has exactly `expected` elements, for method closures to call before
/// pattern-matching their positional arguments.
pub fn expect_arity(args: &[Value], expected: usize) -> Result<(), DispatchError> {
    if args.len() != expected {
        return Err(DispatchError::ArityMismatch {
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

/// `class_name -> object` map populated at bootstrap and never mutated afterwards, so looking a
/// handler up on the hot path needs no synchronization beyond the `Arc` clone.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Service>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, class: impl Into<String>, service: Arc<dyn Service>) {
        self.handlers.insert(class.into(), service);
    }

    pub fn get(&self, class: &str) -> Option<Arc<dyn Service>> {
        self.handlers.get(class).cloned()
    }
}
