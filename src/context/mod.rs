//! Contexts: scoped registries binding named roles to participants.
//!
//! This module handles:
//! - Context construction with nested role definitions and named
//!   participants
//! - Role assignment by naming convention (snake_case role name to
//!   CamelCase definition, empty-role fallback)
//! - `tell`: dispatching a named operation on the participant playing a
//!   role, through the binder, with the participant as subject
//! - Thread-scoped activation with guaranteed LIFO restoration

mod current;

pub use current::{current_context, ContextGuard};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::args::{CallArgs, Value};
use crate::binder;
use crate::client::{Attendant, Client};
use crate::error::{CastingError, Result};
use crate::role::Role;

/// One role binding recorded for a participant.
#[derive(Clone)]
pub struct Assignment {
    pub participant: Arc<Client>,
    pub role_name: String,
    pub role: Arc<Role>,
}

/// A use-case-scoped registry of participants and their role bindings.
/// Exists only while its use case executes; nothing is persisted.
pub struct Context {
    name: String,
    definitions: BTreeMap<String, Arc<Role>>,
    participants: RwLock<Vec<(String, Arc<Client>)>>,
    assignments: RwLock<Vec<Assignment>>,
    /// Client-shaped handle letting this context participate in an outer
    /// context's dispatch, and identifying it as a `tell` caller.
    selfc: Arc<Client>,
    self_ref: Weak<Context>,
}

impl Context {
    pub fn builder(name: impl Into<String>) -> ContextBuilder {
        ContextBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> Arc<Context> {
        self.self_ref.upgrade().expect("context allocation is alive")
    }

    /// This context as a dispatchable client, for nesting it as a
    /// participant of another context.
    pub fn as_client(&self) -> &Arc<Client> {
        &self.selfc
    }

    /// Make this context the thread's current one until the guard drops.
    /// An already-current context is shadowed, not destroyed, and is
    /// restored unconditionally.
    pub fn activate(&self) -> ContextGuard {
        current::activate(self.handle())
    }

    /// Activate, run the use case, restore the previous context.
    pub fn with_active<R>(&self, f: impl FnOnce(&Context) -> R) -> R {
        let _guard = self.activate();
        f(self)
    }

    /// Record a further role binding for `participant`. The role
    /// definition is found by camelizing `role_name`; absent definitions
    /// fall back to an empty role, so later "implements?" checks simply
    /// report false.
    pub fn assign(&self, participant: &Arc<Client>, role_name: &str) {
        let role = self.role_for(role_name);
        debug!(
            context = %self.name,
            participant = %participant.name(),
            role = %role.name(),
            "assigning role"
        );
        let mut participants = self.participants.write();
        match participants.iter_mut().find(|(name, _)| name == role_name) {
            Some(slot) => slot.1 = Arc::clone(participant),
            None => participants.push((role_name.to_string(), Arc::clone(participant))),
        }
        drop(participants);
        self.assignments.write().push(Assignment {
            participant: Arc::clone(participant),
            role_name: role_name.to_string(),
            role,
        });
    }

    /// The participant currently playing `role_name`. Pure read.
    pub fn role(&self, role_name: &str) -> Option<Arc<Client>> {
        self.participants
            .read()
            .iter()
            .find(|(name, _)| name == role_name)
            .map(|(_, participant)| Arc::clone(participant))
    }

    /// Whether `client` is a registered participant, by identity.
    pub fn contains(&self, client: &Arc<Client>) -> bool {
        self.participants
            .read()
            .iter()
            .any(|(_, participant)| participant.id() == client.id())
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.assignments.read().clone()
    }

    /// Tell the participant playing `role_name` to perform `operation`.
    /// Valid only while this context is reachable as (or through) the
    /// thread's current context.
    pub fn tell(&self, role_name: &str, operation: &str, args: CallArgs) -> Result<Value> {
        let current = current_context().ok_or(CastingError::NoActiveContext)?;
        if !Arc::ptr_eq(&current, &self.handle()) && !current.contains(&self.selfc) {
            return Err(CastingError::ForeignCaller {
                caller: self.selfc.name().to_string(),
            });
        }
        current.dispatch(role_name, operation, args)
    }

    /// `tell` on behalf of a calling subject: the caller must be this
    /// context's own handle or one of its participants.
    pub(crate) fn tell_from(
        &self,
        caller: Option<&Arc<Client>>,
        role_name: &str,
        operation: &str,
        args: CallArgs,
    ) -> Result<Value> {
        if let Some(caller) = caller {
            if caller.id() != self.selfc.id() && !self.contains(caller) {
                return Err(CastingError::ForeignCaller {
                    caller: caller.name().to_string(),
                });
            }
        }
        self.dispatch(role_name, operation, args)
    }

    fn dispatch(&self, role_name: &str, operation: &str, args: CallArgs) -> Result<Value> {
        let participant =
            self.role(role_name)
                .ok_or_else(|| CastingError::UnknownRoleOperation {
                    operation: operation.to_string(),
                    participant: role_name.to_string(),
                })?;
        // Most recent binding for this participant wins.
        let role = self
            .assignments
            .read()
            .iter()
            .rev()
            .find(|assignment| {
                assignment.participant.id() == participant.id()
                    && assignment.role.defines_public(operation)
            })
            .map(|assignment| Arc::clone(&assignment.role))
            .ok_or_else(|| CastingError::UnknownRoleOperation {
                operation: operation.to_string(),
                participant: participant.name().to_string(),
            })?;
        debug!(
            context = %self.name,
            role = %role.name(),
            participant = %participant.name(),
            operation,
            "tell"
        );
        let bound = binder::bind(&Attendant::Role(role), operation)?;
        bound.invoke(&participant, &args)
    }

    fn role_for(&self, role_name: &str) -> Arc<Role> {
        let definition_name = camelize(role_name);
        self.definitions
            .get(&definition_name)
            .cloned()
            .unwrap_or_else(|| Role::empty(definition_name))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field(
                "participants",
                &self
                    .participants
                    .read()
                    .iter()
                    .map(|(name, _)| name.clone())
                    .collect::<Vec<_>>(),
            )
            .field("assignments", &self.assignments.read().len())
            .finish()
    }
}

/// `special_person` -> `SpecialPerson`.
fn camelize(role_name: &str) -> String {
    role_name
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Builder for [`Context`]: nested role definitions plus named
/// participants. Every declared participant receives its conventional role
/// at build time, in declaration order.
pub struct ContextBuilder {
    name: String,
    definitions: BTreeMap<String, Arc<Role>>,
    participants: Vec<(String, Arc<Client>)>,
}

impl ContextBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definitions: BTreeMap::new(),
            participants: Vec::new(),
        }
    }

    /// Define a nested role, looked up by the camelized participant name.
    pub fn define(mut self, definition_name: impl Into<String>, role: Arc<Role>) -> Self {
        self.definitions.insert(definition_name.into(), role);
        self
    }

    /// Declare a participant playing `role_name`.
    pub fn participant(mut self, role_name: impl Into<String>, client: &Arc<Client>) -> Self {
        self.participants.push((role_name.into(), Arc::clone(client)));
        self
    }

    pub fn build(self) -> Arc<Context> {
        let selfc = Client::new(format!("context:{}", self.name));
        let context = Arc::new_cyclic(|self_ref| Context {
            name: self.name,
            definitions: self.definitions,
            participants: RwLock::new(Vec::new()),
            assignments: RwLock::new(Vec::new()),
            selfc,
            self_ref: self_ref.clone(),
        });
        for (role_name, client) in &self.participants {
            context.assign(client, role_name);
        }
        context
    }
}
