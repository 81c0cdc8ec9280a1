//! The delegation primitive: resolve a named operation on an attendant
//! into a callable bound to an explicit receiver.
//!
//! Only behavior defined in shareable role units moves between receivers.
//! An operation defined directly on a concrete client type dispatches
//! normally on that client but refuses rebinding (`TypeMismatch`); an
//! operation an object merely acquired through its own delegate stack is
//! resolved back to the role that actually defines it and rebound from
//! there. That indirection is what lets same-shaped objects share role
//! behavior without sharing identity.

use std::sync::Arc;

use tracing::trace;

use crate::args::{CallArgs, Value};
use crate::call::RoleCall;
use crate::client::{Attendant, Client};
use crate::error::{CastingError, Result};
use crate::role::{Operation, Role};

/// A resolved operation ready to execute against any client subject.
#[derive(Clone)]
pub struct BoundOperation {
    role: Option<Arc<Role>>,
    operation: Operation,
}

impl std::fmt::Debug for BoundOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundOperation")
            .field("role", &self.role.as_ref().map(|r| r.name()))
            .field("operation", &self.operation.name())
            .finish()
    }
}

/// Resolve `operation` on `attendant`.
pub fn bind(attendant: &Attendant, operation: &str) -> Result<BoundOperation> {
    match attendant {
        Attendant::Role(role) => role
            .lookup(operation)
            .map(|op| BoundOperation {
                role: Some(Arc::clone(role)),
                operation: op,
            })
            .ok_or_else(|| CastingError::operation_not_defined(operation, role.name())),
        Attendant::Object(client) => bind_object(client, operation),
    }
}

fn bind_object(client: &Arc<Client>, operation: &str) -> Result<BoundOperation> {
    if let Some(native) = client.native(operation) {
        return match &native.origin {
            Some(role) => {
                trace!(operation, role = %role.name(), "rebinding shared role behavior");
                Ok(BoundOperation {
                    role: Some(Arc::clone(role)),
                    operation: native.op.clone(),
                })
            }
            None => Err(CastingError::TypeMismatch {
                operation: operation.to_string(),
                type_name: client.name().to_string(),
            }),
        };
    }
    if let Some(entry) = client.stack().find_public(operation) {
        // Acquired through delegation itself: follow the stack back to the
        // defining role.
        return bind(&entry.attendant, operation);
    }
    Err(CastingError::operation_not_defined(operation, client.name()))
}

impl BoundOperation {
    /// Execute with `client` as the implicit subject.
    pub fn invoke(&self, client: &Arc<Client>, args: &CallArgs) -> Result<Value> {
        self.invoke_from(client, args, None)
    }

    /// Execute, recording the delegate-stack entry the dispatch came
    /// through so chained dispatch can resume below it.
    pub(crate) fn invoke_from(
        &self,
        client: &Arc<Client>,
        args: &CallArgs,
        origin: Option<u64>,
    ) -> Result<Value> {
        let call = RoleCall::new(
            client,
            self.operation.name(),
            args,
            origin,
            self.role.clone(),
        );
        self.operation.run(call)
    }

    pub fn operation_name(&self) -> &str {
        self.operation.name()
    }

    pub fn role(&self) -> Option<&Arc<Role>> {
        self.role.as_ref()
    }
}
