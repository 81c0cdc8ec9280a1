//! Runtime role composition and delegation.
//!
//! `rolecast` lets a client object temporarily or permanently acquire
//! behavior defined in reusable roles, dispatch calls to those roles with
//! itself as the implicit subject, and shed them again, without static
//! inheritance. Contexts bind named roles to participants for the duration
//! of one use case (DCI style), and chained dispatch lets a role extend the
//! implementation below it on the attach order instead of replacing it.
//!
//! ```
//! use rolecast::{CallArgs, Client, Role};
//! use serde_json::json;
//!
//! let greeter = Role::builder("Greeter")
//!     .operation("greet", |_call| Ok(json!("hello")))
//!     .build();
//!
//! let jim = Client::new("jim");
//! assert!(!jim.responds_to("greet"));
//!
//! jim.cast(greeter).unwrap();
//! assert_eq!(jim.perform("greet", CallArgs::new()).unwrap(), json!("hello"));
//!
//! jim.uncast_one().unwrap();
//! assert!(!jim.responds_to("greet"));
//! ```

pub mod args;
pub mod binder;
pub mod call;
pub mod client;
pub mod context;
pub mod delegation;
pub mod error;
pub mod role;
pub mod scope;

pub use args::{CallArgs, Continuation, NamedArgs, Value};
pub use binder::{bind, BoundOperation};
pub use call::RoleCall;
pub use client::{Attendant, Client, ClientBuilder, ClientId};
pub use context::{current_context, Assignment, Context, ContextBuilder, ContextGuard};
pub use delegation::Delegation;
pub use error::{CastingError, Result};
pub use role::{Role, RoleBuilder, Visibility};
pub use scope::{cast_each, delegating};
