//! Permissive default roles.
//!
//! `Null` answers any operation with `null`; `Blank` answers with an empty
//! string. Both claim to define every operation name, so casting one onto a
//! client makes the client respond to everything.

use std::sync::Arc;

use serde_json::json;

use super::{Operation, Role, RoleKind, Visibility};
use crate::args::Value;

pub(super) fn null_role() -> Arc<Role> {
    Role::builder("Null").kind(RoleKind::Null).build()
}

pub(super) fn blank_role() -> Arc<Role> {
    Role::builder("Blank").kind(RoleKind::Blank).build()
}

pub(super) fn null_operation(name: &str) -> Operation {
    Operation::new(name, Visibility::Public, Arc::new(|_call| Ok(Value::Null)))
}

pub(super) fn blank_operation(name: &str) -> Operation {
    Operation::new(name, Visibility::Public, Arc::new(|_call| Ok(json!(""))))
}
