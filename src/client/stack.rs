//! Per-client ordered delegate stack.
//!
//! Entries are kept oldest-first in the backing vector; resolution always
//! scans newest-first. Each entry carries a process-unique id so chained
//! dispatch can locate "the entry this call came through" by identity even
//! when the same role is attached more than once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::Client;
use crate::role::Role;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// A role or a borrowed object lending behavior to a client.
#[derive(Clone)]
pub enum Attendant {
    Role(Arc<Role>),
    Object(Arc<Client>),
}

impl Attendant {
    /// Display label used in errors and logs.
    pub fn label(&self) -> String {
        match self {
            Attendant::Role(role) => role.name().to_string(),
            Attendant::Object(client) => client.name().to_string(),
        }
    }

    /// Whether anonymous dispatch may reach `operation` through this
    /// attendant.
    pub(crate) fn defines_public(&self, operation: &str) -> bool {
        match self {
            Attendant::Role(role) => role.defines_public(operation),
            Attendant::Object(client) => client.responds_to(operation),
        }
    }

    pub(crate) fn role(&self) -> Option<&Arc<Role>> {
        match self {
            Attendant::Role(role) => Some(role),
            Attendant::Object(_) => None,
        }
    }
}

impl From<Arc<Role>> for Attendant {
    fn from(role: Arc<Role>) -> Self {
        Attendant::Role(role)
    }
}

impl From<&Arc<Role>> for Attendant {
    fn from(role: &Arc<Role>) -> Self {
        Attendant::Role(Arc::clone(role))
    }
}

impl From<Arc<Client>> for Attendant {
    fn from(client: Arc<Client>) -> Self {
        Attendant::Object(client)
    }
}

impl From<&Arc<Client>> for Attendant {
    fn from(client: &Arc<Client>) -> Self {
        Attendant::Object(Arc::clone(client))
    }
}

impl fmt::Debug for Attendant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attendant::Role(role) => write!(f, "Role({})", role.name()),
            Attendant::Object(client) => write!(f, "Object({})", client.name()),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StackEntry {
    pub id: u64,
    pub attendant: Attendant,
}

#[derive(Default)]
pub(crate) struct DelegateStack {
    entries: RwLock<Vec<StackEntry>>,
}

impl DelegateStack {
    pub fn push(&self, attendant: Attendant) -> u64 {
        let id = NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(StackEntry { id, attendant });
        id
    }

    pub fn pop(&self) -> Option<StackEntry> {
        self.entries.write().pop()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Newest entry whose attendant publicly defines `operation`.
    pub fn find_public(&self, operation: &str) -> Option<StackEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|entry| entry.attendant.defines_public(operation))
            .cloned()
    }

    /// Newest entry strictly below `origin_id` whose attendant publicly
    /// defines `operation`.
    pub fn find_public_below(&self, origin_id: u64, operation: &str) -> Option<StackEntry> {
        let entries = self.entries.read();
        let position = entries.iter().position(|entry| entry.id == origin_id)?;
        entries[..position]
            .iter()
            .rev()
            .find(|entry| entry.attendant.defines_public(operation))
            .cloned()
    }

    /// Newest role entry matching `role` by identity.
    pub fn position_of_role(&self, role: &Arc<Role>) -> Option<u64> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|entry| {
                entry
                    .attendant
                    .role()
                    .is_some_and(|attached| Arc::ptr_eq(attached, role))
            })
            .map(|entry| entry.id)
    }

    pub fn snapshot(&self) -> Vec<StackEntry> {
        self.entries.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role(name: &str, op: &str) -> Arc<Role> {
        let reply = json!(name.to_lowercase());
        Role::builder(name)
            .operation(op, move |_call| Ok(reply.clone()))
            .build()
    }

    #[test]
    fn test_resolution_is_newest_first() {
        let stack = DelegateStack::default();
        stack.push(role("One", "similar").into());
        stack.push(role("Two", "similar").into());

        let entry = stack.find_public("similar").unwrap();
        assert_eq!(entry.attendant.label(), "Two");
    }

    #[test]
    fn test_find_below_skips_the_origin_and_newer_entries() {
        let stack = DelegateStack::default();
        let bottom = stack.push(role("One", "similar").into());
        let middle = stack.push(role("Two", "similar").into());
        let top = stack.push(role("Three", "similar").into());

        let entry = stack.find_public_below(top, "similar").unwrap();
        assert_eq!(entry.id, middle);

        let entry = stack.find_public_below(middle, "similar").unwrap();
        assert_eq!(entry.id, bottom);

        assert!(stack.find_public_below(bottom, "similar").is_none());
    }

    #[test]
    fn test_position_of_role_matches_by_identity() {
        let shared = role("One", "similar");
        let stack = DelegateStack::default();
        let first = stack.push(Attendant::from(&shared));
        let second = stack.push(Attendant::from(&shared));

        // Two entries of the same role: the newest one wins.
        assert_eq!(stack.position_of_role(&shared), Some(second));
        assert_ne!(stack.position_of_role(&shared), Some(first));
    }

    #[test]
    fn test_pop_on_empty_stack_is_none() {
        let stack = DelegateStack::default();
        assert!(stack.pop().is_none());
    }
}
