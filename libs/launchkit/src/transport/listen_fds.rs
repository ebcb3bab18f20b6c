use super::SupervisorTransport;
use crate::error::TransportError;
use crate::keys::{job, request};
use crate::value::LaunchValue;
use std::collections::BTreeMap;
use std::os::fd::RawFd;

/// First inherited descriptor; 0 through 2 are the standard streams.
pub const LISTEN_FDS_START: RawFd = 3;

const UNNAMED_GROUP: &str = "unknown";

/// Checkin through the `LISTEN_FDS` environment handoff used by systemd
/// and compatible supervisors.
///
/// The handoff is read with `sd_notify::listen_fds_with_names`, which only
/// accepts descriptors when `LISTEN_PID` names the current process and
/// clears the variables afterwards, so only the first checkin sees them.
/// Descriptors are grouped under their `LISTEN_FDNAMES` entry (`"unknown"`
/// when unnamed), in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenFdsTransport;

impl ListenFdsTransport {
    #[must_use]
    pub fn from_env() -> Self {
        Self
    }
}

/// Launchd-shaped checkin response for `(descriptor, name)` pairs, or
/// `None` when there are no descriptors.
fn handoff_response<I>(fds: I) -> Option<LaunchValue>
where
    I: IntoIterator<Item = (RawFd, String)>,
{
    let mut groups: BTreeMap<String, Vec<LaunchValue>> = BTreeMap::new();
    for (fd, name) in fds {
        let name = if name.is_empty() {
            UNNAMED_GROUP.to_owned()
        } else {
            name
        };
        groups.entry(name).or_default().push(LaunchValue::Fd(fd));
    }
    if groups.is_empty() {
        return None;
    }

    let sockets = groups
        .into_iter()
        .map(|(name, fds)| (name, LaunchValue::Array(fds)));
    Some(LaunchValue::dictionary([(
        job::SOCKETS,
        LaunchValue::dictionary(sockets),
    )]))
}

impl SupervisorTransport for ListenFdsTransport {
    fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError> {
        if key != request::CHECKIN {
            return Err(TransportError::Unsupported {
                key: key.to_owned(),
            });
        }

        let fds = sd_notify::listen_fds_with_names(true).map_err(|source| TransportError::Errno {
            op: "sd_listen_fds",
            source,
        })?;
        let count = fds.len();

        let response = handoff_response(fds);
        if response.is_none() {
            tracing::debug!("No LISTEN_FDS handoff for this process");
        } else {
            tracing::debug!(count, "Read LISTEN_FDS handoff");
        }
        Ok(response)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn group(response: &LaunchValue, name: &str) -> Vec<i64> {
        response
            .get(job::SOCKETS)
            .and_then(|s| s.get(name))
            .and_then(LaunchValue::as_array)
            .unwrap()
            .iter()
            .filter_map(LaunchValue::as_integer)
            .collect()
    }

    fn named(names: &[&str]) -> Vec<(RawFd, String)> {
        (LISTEN_FDS_START..)
            .zip(names)
            .map(|(fd, name)| (fd, (*name).to_owned()))
            .collect()
    }

    #[test]
    fn groups_named_descriptors_in_order() {
        let response = handoff_response(named(&["web", "admin", "web", ""])).unwrap();

        assert_eq!(group(&response, "web"), vec![3, 5]);
        assert_eq!(group(&response, "admin"), vec![4]);
        assert_eq!(group(&response, "unknown"), vec![6]);
    }

    #[test]
    fn unnamed_descriptors_share_one_group() {
        let response = handoff_response(named(&["", ""])).unwrap();

        assert_eq!(group(&response, "unknown"), vec![3, 4]);
    }

    #[test]
    fn no_descriptors_is_no_response() {
        assert!(handoff_response(Vec::new()).is_none());
    }

    #[test]
    fn handoff_without_listen_pid_is_ignored() {
        temp_env::with_vars(
            [
                ("LISTEN_PID", None),
                ("LISTEN_FDS", Some("2")),
                ("LISTEN_FDNAMES", Some("EchoSocket:EchoSocket")),
            ],
            || {
                let response = ListenFdsTransport::from_env()
                    .message(request::CHECKIN)
                    .unwrap();
                assert!(response.is_none());
            },
        );
    }

    #[test]
    fn handoff_for_another_process_is_ignored() {
        let other = (std::process::id() + 1).to_string();
        temp_env::with_vars(
            [
                ("LISTEN_PID", Some(other.as_str())),
                ("LISTEN_FDS", Some("1")),
                ("LISTEN_FDNAMES", None),
            ],
            || {
                let response = ListenFdsTransport::from_env()
                    .message(request::CHECKIN)
                    .unwrap();
                assert!(response.is_none());
            },
        );
    }

    #[test]
    fn nothing_to_report_without_handoff() {
        temp_env::with_vars_unset(["LISTEN_PID", "LISTEN_FDS", "LISTEN_FDNAMES"], || {
            let response = ListenFdsTransport::from_env()
                .message(request::CHECKIN)
                .unwrap();
            assert!(response.is_none());
        });
    }

    #[test]
    fn only_checkin_is_supported() {
        let err = ListenFdsTransport::from_env()
            .message(request::GET_JOBS)
            .unwrap_err();

        assert!(err.to_string().contains("GetJobs"));
    }
}
