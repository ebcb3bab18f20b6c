#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Supervisor checkin and inherited socket recovery.
//!
//! A supervisor (launchd, or any `LISTEN_FDS`-compatible manager) binds the
//! listening sockets of a service before the service starts and hands the
//! open descriptors over at spawn time. This crate implements the service
//! side of that handoff:
//!
//! 1. [`CheckinClient::checkin`] asks the supervisor for the job's runtime
//!    configuration and caches the validated [`CheckinSnapshot`].
//! 2. [`CheckinClient::sockets`] looks a logical socket-group name up in the
//!    snapshot and wraps every descriptor in a caller-chosen handle type.
//!
//! ```rust,no_run
//! use launchkit::{CheckinClient, platform_transport};
//! use std::net::TcpListener;
//!
//! # fn main() -> Result<(), launchkit::LaunchError> {
//! let client = CheckinClient::new(platform_transport(&["EchoSocket"]));
//! if client.checkin()?.is_some() {
//!     let servers: Vec<TcpListener> = client.sockets("EchoSocket")?;
//!     for server in &servers {
//!         println!("{:?}", server.local_addr());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Service contract
//!
//! A supervised service must not daemonize (no `daemon(3)`, no fork-and-exit
//! of the parent). It should not change its user or group, working directory
//! or root, call `setsid`, close stray descriptors, redirect stdio, or set
//! resource limits during startup. It must never ignore `SIGTERM`: install a
//! handler that performs the service's own shutdown instead.

pub mod client;
pub mod descriptor;
pub mod error;
pub mod keys;
pub mod plist;
pub mod resolver;
pub mod snapshot;
pub mod transport;
pub mod value;

pub use client::CheckinClient;
pub use descriptor::{FromRawDescriptor, RawDescriptor};
pub use error::{LaunchError, TransportError};
pub use plist::{JobPlist, SockFamily, SockType, SocketSpec};
pub use resolver::{resolve, resolve_with};
pub use snapshot::{CheckinSnapshot, SocketGroups};
pub use transport::{
    ListenFdsTransport, MemoryTransport, SupervisorTransport, platform_transport,
};
pub use value::LaunchValue;

#[cfg(target_os = "macos")]
pub use transport::LaunchdTransport;
