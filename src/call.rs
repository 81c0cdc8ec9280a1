//! The dispatch handle passed to every operation body.
//!
//! Role implementations receive a [`RoleCall`] instead of patching a
//! universal base type: it exposes the subject (the client the operation
//! was rebound to), the invocation arguments, chained dispatch to the next
//! delegate below, and the current context's `tell`/`role` surface.

use std::sync::Arc;

use crate::args::{CallArgs, Value};
use crate::binder;
use crate::client::Client;
use crate::context::{self, Context};
use crate::error::{CastingError, Result};
use crate::role::Role;

pub struct RoleCall<'a> {
    client: Arc<Client>,
    operation: &'a str,
    args: &'a CallArgs,
    /// Delegate-stack entry this call was dispatched through, when it was.
    origin: Option<u64>,
    /// Role whose implementation is executing, when one is.
    role: Option<Arc<Role>>,
}

impl<'a> RoleCall<'a> {
    pub(crate) fn new(
        client: &Arc<Client>,
        operation: &'a str,
        args: &'a CallArgs,
        origin: Option<u64>,
        role: Option<Arc<Role>>,
    ) -> Self {
        Self {
            client: Arc::clone(client),
            operation,
            args,
            origin,
            role,
        }
    }

    /// The client this operation executes against. Role code reads and
    /// writes the subject's own state through this handle.
    pub fn subject(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn args(&self) -> &[Value] {
        self.args.positional_args()
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn named(&self, key: &str) -> Option<&Value> {
        self.args.named_value(key)
    }

    pub fn call_args(&self) -> &CallArgs {
        self.args
    }

    /// Invoke the continuation, when one was supplied.
    pub fn yield_to(&self, values: &[Value]) -> Option<Value> {
        self.args.continuation().map(|cont| cont.as_ref()(values))
    }

    // --- chained dispatch ---

    /// Invoke the same operation on the next attendant below the one
    /// currently handling this call, forwarding the current arguments.
    pub fn next_delegate(&self) -> Result<Value> {
        self.next_delegate_with(self.args.clone())
    }

    /// Chained dispatch with explicit arguments.
    pub fn next_delegate_with(&self, args: CallArgs) -> Result<Value> {
        let stack = self.client.stack();
        // Identity of the handling entry: recorded at dispatch time, or
        // recovered from the newest attachment of the executing role for
        // calls that did not come through the stack.
        let origin = self.origin.or_else(|| {
            self.role
                .as_ref()
                .and_then(|role| stack.position_of_role(role))
        });
        let entry = match origin {
            Some(id) => stack.find_public_below(id, self.operation),
            None => stack.find_public(self.operation),
        };
        let Some(entry) = entry else {
            return Err(CastingError::NoNextDelegate {
                operation: self.operation.to_string(),
                role: self
                    .role
                    .as_ref()
                    .map(|role| role.name().to_string())
                    .unwrap_or_else(|| self.client.name().to_string()),
            });
        };
        let bound = binder::bind(&entry.attendant, self.operation)?;
        bound.invoke_from(&self.client, &args, Some(entry.id))
    }

    // --- context access ---

    /// Ask the current context to dispatch `operation` on the participant
    /// playing `role_name`. Only participants of the current context (and
    /// the context itself) may tell.
    pub fn tell(&self, role_name: &str, operation: &str, args: CallArgs) -> Result<Value> {
        let ctx = context::current_context().ok_or(CastingError::NoActiveContext)?;
        ctx.tell_from(Some(&self.client), role_name, operation, args)
    }

    /// The participant currently playing `role_name`, read from the
    /// current context. Pure read, no side effect.
    pub fn role(&self, role_name: &str) -> Option<Arc<Client>> {
        context::current_context().and_then(|ctx| ctx.role(role_name))
    }

    pub fn current_context(&self) -> Option<Arc<Context>> {
        context::current_context()
    }
}
