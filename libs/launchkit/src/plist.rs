//! launchd job property lists.
//!
//! Builds the XML descriptor a service installs with `launchctl load`, with
//! the socket groups it expects to receive at checkin.

use crate::keys::{job, socket};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::Path;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple Computer//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockType {
    Stream,
    Dgram,
    Seqpacket,
}

impl SockType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Dgram => "dgram",
            Self::Seqpacket => "seqpacket",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockFamily {
    IPv4,
    IPv6,
    Unix,
}

impl SockFamily {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
            Self::Unix => "Unix",
        }
    }
}

/// One socket launchd binds on the job's behalf.
///
/// Unset fields are omitted and take launchd's defaults (a passive stream
/// socket on every address family).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketSpec {
    pub service_name: Option<String>,
    pub node_name: Option<String>,
    pub path_name: Option<String>,
    pub sock_type: Option<SockType>,
    pub family: Option<SockFamily>,
    pub passive: Option<bool>,
}

impl SocketSpec {
    /// A TCP listener on `port`.
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self {
            service_name: Some(port.to_string()),
            ..Self::default()
        }
    }

    /// A Unix-domain listener at `path`.
    #[must_use]
    pub fn unix(path: impl Into<String>) -> Self {
        Self {
            path_name: Some(path.into()),
            family: Some(SockFamily::Unix),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn node_name(mut self, node: impl Into<String>) -> Self {
        self.node_name = Some(node.into());
        self
    }

    #[must_use]
    pub fn sock_type(mut self, sock_type: SockType) -> Self {
        self.sock_type = Some(sock_type);
        self
    }

    #[must_use]
    pub fn family(mut self, family: SockFamily) -> Self {
        self.family = Some(family);
        self
    }

    #[must_use]
    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = Some(passive);
        self
    }
}

/// A launchd job descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPlist {
    label: String,
    program_arguments: Vec<String>,
    service_ipc: bool,
    sockets: BTreeMap<String, SocketSpec>,
}

impl JobPlist {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn program_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the job as checking in with launchd.
    #[must_use]
    pub fn service_ipc(mut self, enabled: bool) -> Self {
        self.service_ipc = enabled;
        self
    }

    /// Add a socket group. Repeating a name replaces the earlier spec.
    #[must_use]
    pub fn socket(mut self, name: impl Into<String>, spec: SocketSpec) -> Self {
        self.sockets.insert(name.into(), spec);
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        self.to_string()
    }

    /// Write the XML rendering to `path`, replacing any existing file.
    ///
    /// # Errors
    /// Returns the underlying I/O error if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_xml())?;
        tracing::info!(label = %self.label, path = %path.display(), "Wrote job plist");
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn key(out: &mut String, depth: usize, name: &str) -> fmt::Result {
    writeln!(out, "{:indent$}<key>{}</key>", "", escape(name), indent = depth * 2)
}

fn string(out: &mut String, depth: usize, value: &str) -> fmt::Result {
    writeln!(out, "{:indent$}<string>{}</string>", "", escape(value), indent = depth * 2)
}

fn boolean(out: &mut String, depth: usize, value: bool) -> fmt::Result {
    let tag = if value { "<true/>" } else { "<false/>" };
    writeln!(out, "{:indent$}{tag}", "", indent = depth * 2)
}

fn socket_entry(out: &mut String, spec: &SocketSpec) -> fmt::Result {
    const DEPTH: usize = 3;
    let strings = [
        (socket::SERVICE_NAME, spec.service_name.as_deref()),
        (socket::NODE_NAME, spec.node_name.as_deref()),
        (socket::PATH_NAME, spec.path_name.as_deref()),
        (socket::TYPE, spec.sock_type.map(SockType::as_str)),
        (socket::FAMILY, spec.family.map(SockFamily::as_str)),
    ];
    for (name, value) in strings {
        if let Some(value) = value {
            key(out, DEPTH, name)?;
            string(out, DEPTH, value)?;
        }
    }
    if let Some(passive) = spec.passive {
        key(out, DEPTH, socket::PASSIVE)?;
        boolean(out, DEPTH, passive)?;
    }
    Ok(())
}

impl fmt::Display for JobPlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from(HEADER);
        out.push_str("<dict>\n");

        key(&mut out, 1, job::LABEL)?;
        string(&mut out, 1, &self.label)?;

        if !self.program_arguments.is_empty() {
            key(&mut out, 1, job::PROGRAM_ARGUMENTS)?;
            out.push_str("  <array>\n");
            for arg in &self.program_arguments {
                string(&mut out, 2, arg)?;
            }
            out.push_str("  </array>\n");
        }

        if self.service_ipc {
            key(&mut out, 1, job::SERVICE_IPC)?;
            boolean(&mut out, 1, true)?;
        }

        if !self.sockets.is_empty() {
            key(&mut out, 1, job::SOCKETS)?;
            out.push_str("  <dict>\n");
            for (name, spec) in &self.sockets {
                key(&mut out, 2, name)?;
                out.push_str("    <dict>\n");
                socket_entry(&mut out, spec)?;
                out.push_str("    </dict>\n");
            }
            out.push_str("  </dict>\n");
        }

        out.push_str("</dict>\n</plist>\n");
        f.write_str(&out)
    }
}
