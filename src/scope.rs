//! Scoped delegation: attach attendants for the duration of a block and
//! detach them afterward, unconditionally.

use std::sync::Arc;

use tracing::warn;

use crate::client::{Attendant, Client};
use crate::error::Result;
use crate::role::Role;

/// Cast each `(client, attendant)` pair, run `f`, then uncast in reverse
/// order. Restoration happens on every exit path: if `f` panics the drop
/// guard still uncasts, and if any cast fails the casts already performed
/// are unwound before the error returns.
pub fn delegating<R>(
    pairs: impl IntoIterator<Item = (Arc<Client>, Attendant)>,
    f: impl FnOnce() -> R,
) -> Result<R> {
    let mut guard = CastGuard::default();
    for (client, attendant) in pairs {
        client.cast(attendant)?;
        guard.track(client);
    }
    Ok(f())
}

#[derive(Default)]
struct CastGuard {
    cast: Vec<Arc<Client>>,
}

impl CastGuard {
    fn track(&mut self, client: Arc<Client>) {
        self.cast.push(client);
    }
}

impl Drop for CastGuard {
    fn drop(&mut self) {
        for client in self.cast.iter().rev() {
            if let Err(err) = client.uncast_one() {
                warn!(client = %client.name(), %err, "failed to uncast on scope exit");
            }
        }
    }
}

/// Cast every client yielded by `clients` with the given roles, most
/// recently listed checked first, passing each through.
pub fn cast_each(
    clients: impl IntoIterator<Item = Arc<Client>>,
    roles: Vec<Arc<Role>>,
) -> impl Iterator<Item = Result<Arc<Client>>> {
    clients.into_iter().map(move |client| {
        client.cast_all(roles.iter().map(Attendant::from))?;
        Ok(client)
    })
}
