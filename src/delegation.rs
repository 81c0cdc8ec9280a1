//! The three-stage delegation builder: operation + client, `to` attendant,
//! `with` arguments, then `call`.
//!
//! `to` binds eagerly through the binder so a misspelled operation or an
//! unshareable attendant fails at configuration time, not at call time.
//! The builder is reusable: separate `call`s share the stored
//! configuration and nothing else.

use std::sync::Arc;

use crate::args::{CallArgs, Value};
use crate::binder::{self, BoundOperation};
use crate::client::{Attendant, Client};
use crate::error::{CastingError, Result};

pub struct Delegation {
    operation: String,
    client: Arc<Client>,
    bound: Option<BoundOperation>,
    defaults: CallArgs,
}

impl std::fmt::Debug for Delegation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegation")
            .field("operation", &self.operation)
            .field("client", &self.client.name())
            .field("bound", &self.bound)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Delegation {
    pub fn new(operation: impl Into<String>, client: Arc<Client>) -> Self {
        Self {
            operation: operation.into(),
            client,
            bound: None,
            defaults: CallArgs::new(),
        }
    }

    /// Resolve and store the attendant. Fails fast when the operation is
    /// missing on the attendant, when the attendant is the client itself,
    /// or when the operation is type-defined rather than role behavior.
    pub fn to(mut self, attendant: impl Into<Attendant>) -> Result<Self> {
        let attendant = attendant.into();
        if let Attendant::Object(other) = &attendant {
            if other.id() == self.client.id() {
                return Err(CastingError::invalid_attendant(
                    self.client.name(),
                    "a client cannot delegate to itself",
                ));
            }
        }
        self.bound = Some(binder::bind(&attendant, &self.operation)?);
        Ok(self)
    }

    /// Store default positional arguments for later `call`s.
    pub fn with(mut self, args: CallArgs) -> Self {
        self.defaults = args;
        self
    }

    /// Invoke with the stored defaults.
    pub fn call(&self) -> Result<Value> {
        self.call_with(CallArgs::new())
    }

    /// Invoke; non-empty call-time arguments override the stored defaults.
    pub fn call_with(&self, args: CallArgs) -> Result<Value> {
        let bound = self.bound.as_ref().ok_or(CastingError::MissingAttendant)?;
        let merged = args.merge_over(&self.defaults);
        bound.invoke(&self.client, &merged)
    }
}
