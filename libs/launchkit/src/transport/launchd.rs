#![allow(unsafe_code)]
#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use crate::error::TransportError;
use std::ffi::c_int;
use std::io;

#[cfg(target_os = "macos")]
pub use self::macos::LaunchdTransport;

/// Outcome of one `launch_activate_socket` call.
#[derive(Debug, PartialEq, Eq)]
enum Activation {
    Activated,
    /// launchd knows the job but has no sockets under the name.
    Missing,
    /// The process is not managed by launchd.
    Unmanaged,
}

fn activation(rc: c_int) -> Result<Activation, TransportError> {
    match rc {
        0 => Ok(Activation::Activated),
        libc::ENOENT => Ok(Activation::Missing),
        libc::ESRCH => Ok(Activation::Unmanaged),
        code => Err(TransportError::Errno {
            op: "launch_activate_socket",
            source: io::Error::from_raw_os_error(code),
        }),
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use super::{Activation, activation};
    use crate::error::TransportError;
    use crate::keys::{job, request};
    use crate::transport::SupervisorTransport;
    use crate::value::LaunchValue;
    use std::collections::BTreeMap;
    use std::ffi::{CString, c_char, c_int};
    use std::io;

    unsafe extern "C" {
        fn launch_activate_socket(
            name: *const c_char,
            fds: *mut *mut c_int,
            cnt: *mut usize,
        ) -> c_int;
    }

    /// Checkin against launchd through `launch_activate_socket(3)`.
    ///
    /// launchd only hands out sockets by name, so the transport is built with
    /// the socket-group names the service declares in its plist. Names launchd
    /// does not know are left out of the response; a process that launchd does
    /// not manage gets the empty response.
    #[derive(Debug, Clone)]
    pub struct LaunchdTransport {
        names: Vec<String>,
    }

    impl LaunchdTransport {
        #[must_use]
        pub fn new<I, S>(names: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                names: names.into_iter().map(Into::into).collect(),
            }
        }

        /// Descriptors launchd holds under `name`, or the reason there are none.
        fn activate(name: &str) -> Result<(Activation, Vec<c_int>), TransportError> {
            let c_name = CString::new(name).map_err(|e| {
                TransportError::Io(io::Error::new(io::ErrorKind::InvalidInput, e))
            })?;
            let mut fds: *mut c_int = std::ptr::null_mut();
            let mut cnt: usize = 0;

            // SAFETY: `c_name` outlives the call and both out-pointers are valid.
            let rc =
                unsafe { launch_activate_socket(c_name.as_ptr(), &raw mut fds, &raw mut cnt) };
            let outcome = activation(rc)?;
            if outcome != Activation::Activated || fds.is_null() {
                return Ok((outcome, Vec::new()));
            }

            // SAFETY: on success launchd returns a malloc'd array of `cnt`
            // descriptors that the caller owns and must free.
            let owned = unsafe { std::slice::from_raw_parts(fds, cnt) }.to_vec();
            unsafe { libc::free(fds.cast()) };
            Ok((outcome, owned))
        }
    }

    impl SupervisorTransport for LaunchdTransport {
        fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError> {
            if key != request::CHECKIN {
                return Err(TransportError::Unsupported {
                    key: key.to_owned(),
                });
            }

            let mut groups = BTreeMap::new();
            for name in &self.names {
                match Self::activate(name)? {
                    (Activation::Activated, fds) => {
                        tracing::debug!(group = %name, count = fds.len(), "launchd activated sockets");
                        groups.insert(name.clone(), LaunchValue::fds(fds));
                    }
                    (Activation::Missing, _) => {
                        tracing::debug!(group = %name, "launchd has no sockets under this name");
                    }
                    (Activation::Unmanaged, _) => {
                        tracing::debug!("process is not managed by launchd");
                        return Ok(None);
                    }
                }
            }

            Ok(Some(LaunchValue::dictionary([(
                job::SOCKETS,
                LaunchValue::Dictionary(groups),
            )])))
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn zero_means_activated() {
        assert_eq!(activation(0).unwrap(), Activation::Activated);
    }

    #[test]
    fn unknown_name_is_missing() {
        assert_eq!(activation(libc::ENOENT).unwrap(), Activation::Missing);
    }

    #[test]
    fn unmanaged_process_is_reported() {
        assert_eq!(activation(libc::ESRCH).unwrap(), Activation::Unmanaged);
    }

    #[test]
    fn other_codes_are_errno_errors() {
        let err = activation(libc::EPERM).unwrap_err();

        match err {
            TransportError::Errno { op, source } => {
                assert_eq!(op, "launch_activate_socket");
                assert_eq!(source.raw_os_error(), Some(libc::EPERM));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
