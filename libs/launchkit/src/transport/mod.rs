//! Message transports to the supervisor.
//!
//! The wire protocol belongs to the host's IPC facility; the core only needs
//! one synchronous call: send a well-known request key, receive either
//! nothing or a structured response.

mod launchd;
mod listen_fds;
mod memory;

pub use listen_fds::{LISTEN_FDS_START, ListenFdsTransport};
pub use memory::MemoryTransport;

#[cfg(target_os = "macos")]
pub use launchd::LaunchdTransport;

use crate::error::TransportError;
use crate::value::LaunchValue;
use std::sync::Arc;

/// One request/response exchange with the supervisor.
///
/// Implementations must be synchronous and safe to repeat, and must return
/// `Ok(None)` rather than an error when there is nothing to report (for
/// example, when the process is not running under a supervisor).
pub trait SupervisorTransport: Send + Sync {
    /// # Errors
    /// Returns a [`TransportError`] when the exchange itself fails.
    fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError>;
}

impl<T: SupervisorTransport + ?Sized> SupervisorTransport for Box<T> {
    fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError> {
        (**self).message(key)
    }
}

impl<T: SupervisorTransport + ?Sized> SupervisorTransport for Arc<T> {
    fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError> {
        (**self).message(key)
    }
}

/// Transport for the current platform.
///
/// On macOS this asks launchd for the named socket groups; elsewhere it reads
/// the `LISTEN_FDS` environment handoff, which carries its own names.
#[must_use]
pub fn platform_transport<S: AsRef<str>>(names: &[S]) -> Box<dyn SupervisorTransport> {
    #[cfg(target_os = "macos")]
    {
        Box::new(LaunchdTransport::new(
            names.iter().map(|n| n.as_ref().to_owned()),
        ))
    }

    #[cfg(not(target_os = "macos"))]
    {
        tracing::debug!(
            requested = names.len(),
            "Using LISTEN_FDS handoff; socket names come from LISTEN_FDNAMES"
        );
        Box::new(ListenFdsTransport::from_env())
    }
}
