//! Dynamic call arguments.
//!
//! Operations are dispatched at runtime, so their payloads are dynamic:
//! positional [`Value`]s, named arguments, and an optional continuation (a
//! callback the operation may yield values to). `CallArgs` also implements
//! the precedence rule for reusable delegations: arguments supplied at call
//! time replace, wholesale, the defaults stored earlier with `with`.

use std::fmt;
use std::sync::Arc;

pub use serde_json::Value;

/// Named-argument map, keyed by argument name.
pub type NamedArgs = serde_json::Map<String, Value>;

/// Callback-style argument forwarded to an operation (the block analog).
pub type Continuation = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Arguments for one operation invocation.
#[derive(Clone, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: NamedArgs,
    continuation: Option<Continuation>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of positional arguments.
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            positional: args,
            ..Self::default()
        }
    }

    /// Append one positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set one named argument.
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Attach a continuation.
    pub fn with_continuation<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.continuation = Some(Arc::new(f));
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn named_value(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    pub fn positional_args(&self) -> &[Value] {
        &self.positional
    }

    pub fn named_args(&self) -> &NamedArgs {
        &self.named
    }

    pub fn continuation(&self) -> Option<&Continuation> {
        self.continuation.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty() && self.continuation.is_none()
    }

    /// Merge call-time arguments over stored defaults. A non-empty
    /// positional list wins as a whole (no element-wise merge); same for
    /// named arguments; a call-time continuation wins over a stored one.
    pub fn merge_over(self, defaults: &CallArgs) -> CallArgs {
        CallArgs {
            positional: if self.positional.is_empty() {
                defaults.positional.clone()
            } else {
                self.positional
            },
            named: if self.named.is_empty() {
                defaults.named.clone()
            } else {
                self.named
            },
            continuation: self
                .continuation
                .or_else(|| defaults.continuation.clone()),
        }
    }
}

impl fmt::Debug for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallArgs")
            .field("positional", &self.positional)
            .field("named", &self.named)
            .field("continuation", &self.continuation.is_some())
            .finish()
    }
}
