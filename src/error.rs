use thiserror::Error;

/// Errors raised by the delegation engine.
///
/// All variants are raised synchronously at the point of failure and
/// propagate to the caller; nothing is retried internally. Each carries the
/// attempted operation and the responsible attendant/participant where one
/// exists, so a failure always answers "who was supposed to handle this".
#[derive(Debug, Error)]
pub enum CastingError {
    /// A delegation was executed before an attendant was set with `to`.
    #[error("you must set your attendant object using `to`")]
    MissingAttendant,

    /// The requested operation does not exist anywhere on the proposed
    /// attendant, or the attendant is the client itself.
    #[error("invalid attendant `{attendant}`: {reason}")]
    InvalidAttendant { attendant: String, reason: String },

    /// The operation is defined directly on a concrete type rather than in
    /// shareable role behavior, so it cannot be rebound to another receiver.
    #[error("operation `{operation}` is defined directly on `{type_name}` and cannot be rebound to another receiver")]
    TypeMismatch {
        operation: String,
        type_name: String,
    },

    /// Chained dispatch found no older attendant implementing the operation.
    #[error("no next delegate implements `{operation}` below `{role}`")]
    NoNextDelegate { operation: String, role: String },

    /// A context `tell` found no assigned role implementing the operation
    /// for the participant.
    #[error("unknown operation `{operation}` for participant `{participant}`")]
    UnknownRoleOperation {
        operation: String,
        participant: String,
    },

    /// Baseline failure: neither the client nor any attached delegate
    /// implements the operation. Delegation never masks this behind a
    /// different error type.
    #[error("unknown operation `{operation}` for `{client}`")]
    UnknownOperation { operation: String, client: String },

    /// The client is frozen and refuses changes to its dispatch state.
    #[error("client `{client}` is frozen")]
    FrozenClient { client: String },

    /// `tell` or `role` was invoked with no context active on this thread.
    #[error("no context is active on this thread")]
    NoActiveContext,

    /// `tell` was invoked by a subject that is neither the current context
    /// nor one of its registered participants.
    #[error("`{caller}` is neither the current context nor one of its participants")]
    ForeignCaller { caller: String },
}

impl CastingError {
    pub(crate) fn invalid_attendant(
        attendant: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAttendant {
            attendant: attendant.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn operation_not_defined(operation: &str, attendant: impl Into<String>) -> Self {
        Self::invalid_attendant(attendant, format!("operation `{operation}` is not defined"))
    }

    pub(crate) fn unknown_operation(operation: &str, client: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.to_string(),
            client: client.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CastingError>;
