//! Typed view of the supervisor's checkin response.
//!
//! The response is validated once, when it arrives, so a malformed socket
//! table fails the checkin instead of a later lookup.

use crate::descriptor::RawDescriptor;
use crate::error::LaunchError;
use crate::keys::job;
use crate::value::LaunchValue;
use std::collections::BTreeMap;

/// Socket-group table: logical name to descriptors, in supervisor order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketGroups(BTreeMap<String, Vec<RawDescriptor>>);

impl SocketGroups {
    /// Descriptors registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[RawDescriptor]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RawDescriptor])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_value(value: &LaunchValue) -> Result<Self, LaunchError> {
        let table = value.as_dictionary().ok_or_else(|| {
            LaunchError::malformed(
                job::SOCKETS,
                format!("expected a dictionary, got {}", value.kind()),
            )
        })?;

        let mut groups = BTreeMap::new();
        for (name, entry) in table {
            let key = format!("{}.{name}", job::SOCKETS);
            let items = entry.as_array().ok_or_else(|| {
                LaunchError::malformed(&key, format!("expected an array, got {}", entry.kind()))
            })?;

            let descriptors = items
                .iter()
                .map(|item| {
                    let n = item.as_integer().ok_or_else(|| {
                        LaunchError::malformed(
                            &key,
                            format!("expected a descriptor, got {}", item.kind()),
                        )
                    })?;
                    RawDescriptor::try_from(n).map_err(|reason| LaunchError::malformed(&key, reason))
                })
                .collect::<Result<Vec<_>, _>>()?;

            groups.insert(name.clone(), descriptors);
        }
        Ok(Self(groups))
    }
}

/// Immutable configuration returned by one checkin.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckinSnapshot {
    raw: LaunchValue,
    label: Option<String>,
    program_arguments: Option<Vec<String>>,
    sockets: Option<SocketGroups>,
}

impl CheckinSnapshot {
    /// Validate a checkin response.
    ///
    /// # Errors
    /// Returns [`LaunchError::MalformedResponse`] if the response is not a
    /// dictionary or a recognized section has the wrong shape.
    pub fn from_response(raw: LaunchValue) -> Result<Self, LaunchError> {
        if raw.as_dictionary().is_none() {
            return Err(LaunchError::malformed(
                "<root>",
                format!("expected a dictionary, got {}", raw.kind()),
            ));
        }

        let label = match raw.get(job::LABEL) {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| {
                        LaunchError::malformed(job::LABEL, format!("expected a string, got {}", v.kind()))
                    })?
                    .to_owned(),
            ),
        };

        let program_arguments = match raw.get(job::PROGRAM_ARGUMENTS) {
            None => None,
            Some(v) => Some(string_array(job::PROGRAM_ARGUMENTS, v)?),
        };

        let sockets = raw
            .get(job::SOCKETS)
            .map(SocketGroups::from_value)
            .transpose()?;

        Ok(Self {
            raw,
            label,
            program_arguments,
            sockets,
        })
    }

    /// The response exactly as the supervisor sent it.
    #[must_use]
    pub fn raw(&self) -> &LaunchValue {
        &self.raw
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn program_arguments(&self) -> Option<&[String]> {
        self.program_arguments.as_deref()
    }

    /// The socket-group table, if the job declares any sockets.
    #[must_use]
    pub fn sockets(&self) -> Option<&SocketGroups> {
        self.sockets.as_ref()
    }

    /// Any top-level entry, including ones without a typed accessor.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LaunchValue> {
        self.raw.get(key)
    }
}

fn string_array(key: &str, value: &LaunchValue) -> Result<Vec<String>, LaunchError> {
    let items = value
        .as_array()
        .ok_or_else(|| LaunchError::malformed(key, format!("expected an array, got {}", value.kind())))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                LaunchError::malformed(key, format!("expected a string, got {}", item.kind()))
            })
        })
        .collect()
}
