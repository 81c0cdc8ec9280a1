//! Roles: named, stateless bundles of operation implementations.
//!
//! This module handles:
//! - Role definition through [`RoleBuilder`]
//! - Operation visibility tiers (public/protected/private)
//! - Role inclusion (a role may include other roles, which behaves like
//!   inherited operations during lookup and introspection)
//! - Optional `on_cast`/`on_uncast` lifecycle hooks
//! - The permissive `Null` and `Blank` roles

mod null;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::args::Value;
use crate::call::RoleCall;
use crate::client::Client;
use crate::error::Result;

/// Visibility tier of an operation on its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Body of a role operation. Receives the full dispatch handle so the body
/// can reach the subject's state, its arguments, the next delegate, and the
/// current context.
pub type OpBody = dyn Fn(RoleCall<'_>) -> Result<Value> + Send + Sync;

/// Lifecycle hook invoked with the client being cast or uncast.
pub type CastHook = dyn Fn(&Client) + Send + Sync;

/// One named operation carried by a role.
#[derive(Clone)]
pub struct Operation {
    name: String,
    visibility: Visibility,
    body: Arc<OpBody>,
}

impl Operation {
    pub(crate) fn new(name: impl Into<String>, visibility: Visibility, body: Arc<OpBody>) -> Self {
        Self {
            name: name.into(),
            visibility,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub(crate) fn run(&self, call: RoleCall<'_>) -> Result<Value> {
        (self.body.as_ref())(call)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum RoleKind {
    Regular,
    /// Claims every operation; bound operations return `Value::Null`.
    Null,
    /// Claims every operation; bound operations return `""`.
    Blank,
}

/// An immutable role definition. Build with [`Role::builder`]; attach to
/// clients with [`Client::cast`](crate::client::Client::cast) or bind
/// through a context.
pub struct Role {
    name: String,
    kind: RoleKind,
    operations: BTreeMap<String, Operation>,
    includes: Vec<Arc<Role>>,
    on_cast: Option<Arc<CastHook>>,
    on_uncast: Option<Arc<CastHook>>,
}

impl Role {
    pub fn builder(name: impl Into<String>) -> RoleBuilder {
        RoleBuilder::new(name)
    }

    /// A role with no operations at all. Used as the fallback when a
    /// context has no definition for an assigned role name.
    pub fn empty(name: impl Into<String>) -> Arc<Role> {
        Self::builder(name).build()
    }

    /// The permissive role answering every operation with `null`.
    pub fn null() -> Arc<Role> {
        null::null_role()
    }

    /// The permissive role answering every operation with an empty string.
    pub fn blank() -> Arc<Role> {
        null::blank_role()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find an operation regardless of visibility: own definitions first,
    /// then included roles depth-first in inclusion order.
    pub(crate) fn lookup(&self, operation: &str) -> Option<Operation> {
        match self.kind {
            RoleKind::Null => Some(null::null_operation(operation)),
            RoleKind::Blank => Some(null::blank_operation(operation)),
            RoleKind::Regular => {
                if let Some(op) = self.operations.get(operation) {
                    return Some(op.clone());
                }
                self.includes
                    .iter()
                    .find_map(|included| included.lookup(operation))
            }
        }
    }

    /// Whether anonymous dispatch may reach `operation` on this role.
    /// Explicit binding resolves any visibility; dispatch sees public only.
    pub(crate) fn defines_public(&self, operation: &str) -> bool {
        self.lookup(operation)
            .is_some_and(|op| op.visibility() == Visibility::Public)
    }

    /// Whether this role carries `operation` at any visibility.
    pub fn defines(&self, operation: &str) -> bool {
        self.lookup(operation).is_some()
    }

    /// Operation names at `visibility`, optionally walking included roles.
    pub(crate) fn operation_names(
        &self,
        visibility: Visibility,
        include_inherited: bool,
    ) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .operations
            .values()
            .filter(|op| op.visibility() == visibility)
            .map(|op| op.name().to_string())
            .collect();
        if include_inherited {
            for included in &self.includes {
                names.extend(included.operation_names(visibility, true));
            }
        }
        names
    }

    /// Every operation this role carries, own definitions shadowing
    /// included ones. Permissive roles report none (their operations are
    /// synthesized per lookup).
    pub(crate) fn flattened_operations(&self) -> BTreeMap<String, Operation> {
        let mut ops = BTreeMap::new();
        if self.kind != RoleKind::Regular {
            return ops;
        }
        for (name, op) in &self.operations {
            ops.insert(name.clone(), op.clone());
        }
        for included in &self.includes {
            for (name, op) in included.flattened_operations() {
                ops.entry(name).or_insert(op);
            }
        }
        ops
    }

    pub(crate) fn on_cast(&self) -> Option<&Arc<CastHook>> {
        self.on_cast.as_ref()
    }

    pub(crate) fn on_uncast(&self) -> Option<&Arc<CastHook>> {
        self.on_uncast.as_ref()
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.name)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .field("includes", &self.includes.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Role`] definitions.
pub struct RoleBuilder {
    name: String,
    kind: RoleKind,
    operations: BTreeMap<String, Operation>,
    includes: Vec<Arc<Role>>,
    on_cast: Option<Arc<CastHook>>,
    on_uncast: Option<Arc<CastHook>>,
}

impl RoleBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RoleKind::Regular,
            operations: BTreeMap::new(),
            includes: Vec::new(),
            on_cast: None,
            on_uncast: None,
        }
    }

    pub(crate) fn kind(mut self, kind: RoleKind) -> Self {
        self.kind = kind;
        self
    }

    /// Define a public operation.
    pub fn operation<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(RoleCall<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.operation_with(name, Visibility::Public, body)
    }

    /// Define an operation at an explicit visibility tier.
    pub fn operation_with<F>(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        body: F,
    ) -> Self
    where
        F: Fn(RoleCall<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let op = Operation::new(name.clone(), visibility, Arc::new(body));
        self.operations.insert(name, op);
        self
    }

    /// Compose another role underneath this one. Own operations shadow
    /// included ones; includes are searched in the order given.
    pub fn include(mut self, role: Arc<Role>) -> Self {
        self.includes.push(role);
        self
    }

    /// Hook invoked with the client right after this role is cast onto it.
    pub fn on_cast<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Client) + Send + Sync + 'static,
    {
        self.on_cast = Some(Arc::new(hook));
        self
    }

    /// Hook invoked with the client right after this role is uncast.
    pub fn on_uncast<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Client) + Send + Sync + 'static,
    {
        self.on_uncast = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Arc<Role> {
        Arc::new(Role {
            name: self.name,
            kind: self.kind,
            operations: self.operations,
            includes: self.includes,
            on_cast: self.on_cast,
            on_uncast: self.on_uncast,
        })
    }
}
