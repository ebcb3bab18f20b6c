//! Checkin client: one exchange with the supervisor, one cached snapshot.

use crate::descriptor::{FromRawDescriptor, RawDescriptor};
use crate::error::LaunchError;
use crate::keys::request;
use crate::resolver;
use crate::snapshot::{CheckinSnapshot, SocketGroups};
use crate::transport::SupervisorTransport;
use crate::value::LaunchValue;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Holds the supervisor transport and the most recent checkin snapshot.
///
/// Checkin is expected once, early in startup, from a single thread.
/// Readers may call [`snapshot`](Self::snapshot) or
/// [`sockets`](Self::sockets) from anywhere; a snapshot handed out stays
/// valid after a later checkin replaces the cached one.
pub struct CheckinClient<T> {
    transport: T,
    snapshot: ArcSwapOption<CheckinSnapshot>,
}

impl<T: SupervisorTransport> CheckinClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            snapshot: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send an arbitrary request key and return the raw response.
    ///
    /// # Errors
    /// Transport failures are returned as [`LaunchError::Transport`].
    pub fn message(&self, key: &str) -> Result<Option<LaunchValue>, LaunchError> {
        Ok(self.transport.message(key)?)
    }

    /// Ask the supervisor for this job's configuration and cache it.
    ///
    /// Returns `Ok(None)` when the supervisor has nothing to report, which
    /// is what a process started outside a supervisor sees. An empty
    /// response leaves any previously cached snapshot in place.
    ///
    /// # Errors
    /// - [`LaunchError::Transport`] when the exchange fails
    /// - [`LaunchError::MalformedResponse`] when the response has the wrong shape
    pub fn checkin(&self) -> Result<Option<Arc<CheckinSnapshot>>, LaunchError> {
        tracing::debug!(key = request::CHECKIN, "Requesting checkin");
        let Some(response) = self.transport.message(request::CHECKIN)? else {
            tracing::info!("Supervisor returned no checkin configuration");
            return Ok(None);
        };

        let snapshot = Arc::new(CheckinSnapshot::from_response(response)?);
        let replaced = self.snapshot.swap(Some(Arc::clone(&snapshot)));

        tracing::info!(
            label = snapshot.label().unwrap_or("<none>"),
            groups = snapshot.sockets().map_or(0, SocketGroups::len),
            replaced = replaced.is_some(),
            "Checked in with supervisor"
        );

        Ok(Some(snapshot))
    }

    /// The most recently cached snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CheckinSnapshot>> {
        self.snapshot.load_full()
    }

    /// Adopt every descriptor of socket group `name` as `H`.
    ///
    /// # Errors
    /// See [`resolver::resolve`].
    pub fn sockets<H: FromRawDescriptor>(&self, name: &str) -> Result<Vec<H>, LaunchError> {
        resolver::resolve(self.snapshot().as_deref(), name)
    }

    /// Wrap every descriptor of socket group `name` with `factory`.
    ///
    /// # Errors
    /// See [`resolver::resolve_with`].
    pub fn sockets_with<H, E, F>(&self, name: &str, factory: F) -> Result<Vec<H>, E>
    where
        F: FnMut(RawDescriptor) -> Result<H, E>,
        E: From<LaunchError>,
    {
        resolver::resolve_with(self.snapshot().as_deref(), name, factory)
    }
}
