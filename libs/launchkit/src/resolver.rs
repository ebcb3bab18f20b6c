//! Name-indexed recovery of inherited sockets.

use crate::descriptor::{FromRawDescriptor, RawDescriptor};
use crate::error::LaunchError;
use crate::snapshot::CheckinSnapshot;

/// Wrap every descriptor of socket group `name` with `factory`.
///
/// Handles come back in the order the supervisor listed the descriptors.
/// The first factory failure is returned unchanged; descriptors after it
/// stay unwrapped.
///
/// # Errors
/// - [`LaunchError::NotCheckedIn`] when `snapshot` is `None`
/// - [`LaunchError::SocketGroupNotFound`] when the group is absent or empty
/// - whatever `factory` returns
pub fn resolve_with<H, E, F>(
    snapshot: Option<&CheckinSnapshot>,
    name: &str,
    mut factory: F,
) -> Result<Vec<H>, E>
where
    F: FnMut(RawDescriptor) -> Result<H, E>,
    E: From<LaunchError>,
{
    let Some(snapshot) = snapshot else {
        tracing::warn!(group = %name, "Socket group requested before checkin");
        return Err(LaunchError::NotCheckedIn {
            name: name.to_owned(),
        }
        .into());
    };

    let descriptors = snapshot
        .sockets()
        .and_then(|groups| groups.get(name))
        .filter(|fds| !fds.is_empty())
        .ok_or_else(|| LaunchError::SocketGroupNotFound {
            name: name.to_owned(),
        })?;

    tracing::debug!(group = %name, count = descriptors.len(), "Resolving socket group");

    descriptors.iter().map(|&fd| factory(fd)).collect()
}

/// Wrap every descriptor of socket group `name` as `H`.
///
/// # Errors
/// As [`resolve_with`]; adoption failures surface as [`LaunchError::Io`].
pub fn resolve<H: FromRawDescriptor>(
    snapshot: Option<&CheckinSnapshot>,
    name: &str,
) -> Result<Vec<H>, LaunchError> {
    resolve_with(snapshot, name, |fd| {
        H::from_raw_descriptor(fd).map_err(LaunchError::from)
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::keys::job;
    use crate::value::LaunchValue;
    use std::io;

    fn snapshot(groups: LaunchValue) -> CheckinSnapshot {
        CheckinSnapshot::from_response(LaunchValue::dictionary([(job::SOCKETS, groups)])).unwrap()
    }

    #[test]
    fn returns_descriptors_in_supervisor_order() {
        let snap = snapshot(LaunchValue::dictionary([("MySockets", LaunchValue::fds([0, 1]))]));

        let handles: Vec<RawDescriptor> =
            resolve_with(Some(&snap), "MySockets", Ok::<_, LaunchError>).unwrap();

        let fds: Vec<i32> = handles.into_iter().map(RawDescriptor::get).collect();
        assert_eq!(fds, vec![0, 1]);
    }

    #[test]
    fn absent_group_is_not_found() {
        let snap = snapshot(LaunchValue::dictionary::<&str, _>([]));

        let err = resolve_with(Some(&snap), "NoSockets", Ok::<_, LaunchError>).unwrap_err();

        assert!(matches!(err, LaunchError::SocketGroupNotFound { ref name } if name == "NoSockets"));
        assert_eq!(err.to_string(), r#"no sockets found for "NoSockets""#);
    }

    #[test]
    fn empty_group_is_not_found() {
        let snap = snapshot(LaunchValue::dictionary([("Empty", LaunchValue::fds([]))]));

        let err = resolve_with(Some(&snap), "Empty", Ok::<_, LaunchError>).unwrap_err();

        assert!(matches!(err, LaunchError::SocketGroupNotFound { .. }));
    }

    #[test]
    fn missing_socket_table_is_not_found() {
        let snap =
            CheckinSnapshot::from_response(LaunchValue::dictionary([(job::LABEL, LaunchValue::from("x"))]))
                .unwrap();

        let err = resolve_with(Some(&snap), "Web", Ok::<_, LaunchError>).unwrap_err();

        assert!(matches!(err, LaunchError::SocketGroupNotFound { .. }));
    }

    #[test]
    fn missing_snapshot_is_a_precondition_failure() {
        let err = resolve_with(None, "Web", Ok::<_, LaunchError>).unwrap_err();

        assert!(matches!(err, LaunchError::NotCheckedIn { .. }));
        assert!(err.to_string().contains("\"Web\""));
    }

    #[test]
    fn factory_errors_pass_through_and_stop_resolution() {
        #[derive(Debug)]
        enum FactoryError {
            Launch,
            Refused(i32),
        }

        impl From<LaunchError> for FactoryError {
            fn from(_: LaunchError) -> Self {
                Self::Launch
            }
        }

        let snap = snapshot(LaunchValue::dictionary([("Web", LaunchValue::fds([3, 4, 5]))]));
        let mut seen = Vec::new();

        let err = resolve_with(Some(&snap), "Web", |fd| {
            seen.push(fd.get());
            if fd.get() == 4 {
                Err(FactoryError::Refused(fd.get()))
            } else {
                Ok(fd)
            }
        })
        .unwrap_err();

        assert!(matches!(err, FactoryError::Refused(4)));
        assert_eq!(seen, vec![3, 4]);
        assert!(!matches!(err, FactoryError::Launch));
    }

    #[test]
    fn typed_resolution_reports_io_errors_unchanged() {
        struct Refusing;

        impl FromRawDescriptor for Refusing {
            fn from_raw_descriptor(_: RawDescriptor) -> io::Result<Self> {
                Err(io::Error::new(io::ErrorKind::InvalidInput, "not a socket"))
            }
        }

        let snap = snapshot(LaunchValue::dictionary([("Web", LaunchValue::fds([3]))]));

        let err = resolve::<Refusing>(Some(&snap), "Web").err().unwrap();

        assert!(matches!(err, LaunchError::Io(ref e) if e.kind() == io::ErrorKind::InvalidInput));
        assert_eq!(err.to_string(), "not a socket");
    }
}
