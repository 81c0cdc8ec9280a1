//! Clients: entities that receive delegated operation calls.
//!
//! This module handles:
//! - Client construction ([`ClientBuilder`]): native operations, initial
//!   state, role inclusion
//! - The delegate stack surface: `cast`, `uncast`, scoped hooks
//! - The missing-operation dispatcher (`perform`) and the matching
//!   capability introspection (`responds_to`, `delegated_operations`)
//! - Frozen clients

mod stack;

pub use stack::Attendant;
pub(crate) use stack::DelegateStack;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::args::{CallArgs, Value};
use crate::binder;
use crate::call::RoleCall;
use crate::delegation::Delegation;
use crate::error::{CastingError, Result};
use crate::role::{Role, Visibility};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique client identity. Self-delegation checks and context
/// membership compare ids, never names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

/// An operation defined on the client itself rather than acquired through
/// its delegate stack. `origin` is the shared role unit the operation came
/// from, when it came from one; operations with no origin belong to the
/// concrete type and are never rebindable to another receiver.
pub(crate) struct NativeOp {
    pub origin: Option<Arc<Role>>,
    pub op: crate::role::Operation,
}

/// A client: identity, display name, dynamic JSON state, native
/// operations, and an ordered delegate stack.
pub struct Client {
    id: ClientId,
    name: String,
    state: RwLock<serde_json::Map<String, Value>>,
    natives: BTreeMap<String, NativeOp>,
    stack: DelegateStack,
    frozen: AtomicBool,
    self_ref: Weak<Client>,
}

impl Client {
    /// A plain client with no native operations and empty state.
    pub fn new(name: impl Into<String>) -> Arc<Client> {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(name)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning handle to this client. The weak reference always upgrades
    /// while a borrow of the client exists.
    pub(crate) fn handle(&self) -> Arc<Client> {
        self.self_ref.upgrade().expect("client allocation is alive")
    }

    // --- state ---

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.refuse_if_frozen()?;
        self.state.write().insert(key.into(), value.into());
        Ok(())
    }

    /// Read-modify-write on one state entry. Returns the stored value.
    pub fn update<F>(&self, key: &str, f: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        self.refuse_if_frozen()?;
        let mut state = self.state.write();
        let next = f(state.get(key));
        state.insert(key.to_string(), next.clone());
        Ok(next)
    }

    /// Freeze the client: further `cast`/`uncast` and state writes are
    /// refused. Delegates attached before freezing keep dispatching.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    fn refuse_if_frozen(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(CastingError::FrozenClient {
                client: self.name.clone(),
            });
        }
        Ok(())
    }

    // --- delegate stack ---

    /// Attach an attendant on top of the delegate stack. The client itself
    /// is rejected; a role's `on_cast` hook runs right after the push.
    pub fn cast(&self, attendant: impl Into<Attendant>) -> Result<&Self> {
        self.refuse_if_frozen()?;
        let attendant = attendant.into();
        if let Attendant::Object(other) = &attendant {
            if other.id() == self.id {
                return Err(CastingError::invalid_attendant(
                    &self.name,
                    "a client cannot delegate to itself",
                ));
            }
        }
        let label = attendant.label();
        let hook = attendant
            .role()
            .and_then(|role| role.on_cast().cloned());
        self.stack.push(attendant);
        debug!(client = %self.name, attendant = %label, "cast");
        if let Some(hook) = hook.as_deref() {
            hook(self);
        }
        Ok(self)
    }

    /// Attach several attendants; the last listed ends up checked first.
    pub fn cast_all<I, A>(&self, attendants: I) -> Result<&Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<Attendant>,
    {
        for attendant in attendants {
            self.cast(attendant)?;
        }
        Ok(self)
    }

    /// Detach the `count` most recent attendants, running `on_uncast`
    /// hooks per popped role. Popping past an empty stack is a no-op.
    pub fn uncast(&self, count: usize) -> Result<&Self> {
        self.refuse_if_frozen()?;
        for _ in 0..count {
            let Some(entry) = self.stack.pop() else {
                break;
            };
            debug!(client = %self.name, attendant = %entry.attendant.label(), "uncast");
            let hook = entry
                .attendant
                .role()
                .and_then(|role| role.on_uncast().cloned());
            if let Some(hook) = hook.as_deref() {
                hook(self);
            }
        }
        Ok(self)
    }

    pub fn uncast_one(&self) -> Result<&Self> {
        self.uncast(1)
    }

    pub fn delegate_count(&self) -> usize {
        self.stack.len()
    }

    // --- dispatch ---

    /// The missing-operation dispatcher. Native operations win, exactly as
    /// a host-native call would; otherwise the delegate stack is scanned
    /// newest-first and the first attendant publicly defining the
    /// operation executes with this client as subject. No resolution at
    /// all is the plain unknown-operation error.
    pub fn perform(&self, operation: &str, args: CallArgs) -> Result<Value> {
        let this = self.handle();
        if let Some(native) = self.natives.get(operation) {
            trace!(client = %self.name, operation, "dispatching native operation");
            let call = RoleCall::new(&this, operation, &args, None, native.origin.clone());
            return native.op.run(call);
        }
        match self.stack.find_public(operation) {
            Some(entry) => {
                trace!(
                    client = %self.name,
                    operation,
                    attendant = %entry.attendant.label(),
                    "dispatching through delegate stack"
                );
                let bound = binder::bind(&entry.attendant, operation)?;
                bound.invoke_from(&this, &args, Some(entry.id))
            }
            None => Err(CastingError::unknown_operation(operation, &self.name)),
        }
    }

    /// Whether `perform(operation, ..)` would currently resolve. Consults
    /// the same path as dispatch, so it tracks every `cast`/`uncast`.
    pub fn responds_to(&self, operation: &str) -> bool {
        self.natives.contains_key(operation) || self.stack.find_public(operation).is_some()
    }

    // --- explicit delegation ---

    /// Start a reusable delegation for `operation` with this client as the
    /// receiver.
    pub fn delegation(&self, operation: &str) -> Delegation {
        Delegation::new(operation, self.handle())
    }

    /// One-shot delegation: `delegation(op).to(attendant)?.call_with(args)`.
    pub fn delegate(
        &self,
        operation: &str,
        attendant: impl Into<Attendant>,
        args: CallArgs,
    ) -> Result<Value> {
        self.delegation(operation).to(attendant)?.call_with(args)
    }

    // --- introspection ---

    /// Union of operation names across the delegate stack: public and
    /// protected tiers, plus private when `include_private`. Included
    /// ("inherited") role operations always count.
    pub fn delegated_operations(&self, include_private: bool) -> BTreeSet<String> {
        let mut names = self.delegated_public_operations(true);
        names.extend(self.delegated_tier(Visibility::Protected, true));
        if include_private {
            names.extend(self.delegated_tier(Visibility::Private, true));
        }
        names
    }

    pub fn delegated_public_operations(&self, include_inherited: bool) -> BTreeSet<String> {
        self.delegated_tier(Visibility::Public, include_inherited)
    }

    pub fn delegated_protected_operations(&self, include_inherited: bool) -> BTreeSet<String> {
        self.delegated_tier(Visibility::Protected, include_inherited)
    }

    pub fn delegated_private_operations(&self, include_inherited: bool) -> BTreeSet<String> {
        self.delegated_tier(Visibility::Private, include_inherited)
    }

    fn delegated_tier(&self, visibility: Visibility, include_inherited: bool) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for entry in self.stack.snapshot() {
            match &entry.attendant {
                Attendant::Role(role) => {
                    names.extend(role.operation_names(visibility, include_inherited));
                }
                Attendant::Object(client) => {
                    if visibility == Visibility::Public {
                        names.extend(client.natives.keys().cloned());
                    }
                    names.extend(client.delegated_tier(visibility, include_inherited));
                }
            }
        }
        names
    }

    // --- binder access ---

    pub(crate) fn native(&self, operation: &str) -> Option<&NativeOp> {
        self.natives.get(operation)
    }

    pub(crate) fn stack(&self) -> &DelegateStack {
        &self.stack
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .field("delegates", &self.stack.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    name: String,
    state: serde_json::Map<String, Value>,
    natives: BTreeMap<String, NativeOp>,
}

impl ClientBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: serde_json::Map::new(),
            natives: BTreeMap::new(),
        }
    }

    /// Seed one state entry.
    pub fn state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    /// Define an operation directly on the concrete type. Type-defined
    /// operations dispatch normally but can never be rebound to another
    /// receiver (see the binder's TypeMismatch rule).
    pub fn native<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(RoleCall<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let op = crate::role::Operation::new(name.clone(), Visibility::Public, Arc::new(body));
        self.natives.insert(name, NativeOp { origin: None, op });
        self
    }

    /// Mix a role's operations in as native operations that remember their
    /// defining role, so other clients may borrow them back through the
    /// binder.
    pub fn include_role(mut self, role: &Arc<Role>) -> Self {
        for (name, op) in role.flattened_operations() {
            self.natives.entry(name).or_insert(NativeOp {
                origin: Some(Arc::clone(role)),
                op,
            });
        }
        self
    }

    pub fn build(self) -> Arc<Client> {
        Arc::new_cyclic(|self_ref| Client {
            id: ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            state: RwLock::new(self.state),
            natives: self.natives,
            stack: DelegateStack::default(),
            frozen: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }
}
