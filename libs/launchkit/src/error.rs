use std::io;

/// Errors raised by checkin and socket resolution.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The requested socket group is absent from the checkin snapshot, or
    /// lists no descriptors.
    #[error("no sockets found for \"{name}\"")]
    SocketGroupNotFound { name: String },

    /// Sockets were requested before a successful checkin.
    #[error("cannot resolve sockets for \"{name}\": no checkin snapshot is available")]
    NotCheckedIn { name: String },

    /// The supervisor answered with data of an unexpected shape.
    #[error("malformed checkin response at '{key}': {reason}")]
    MalformedResponse { key: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LaunchError {
    pub(crate) fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of the supervisor message transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{op} failed: {source}")]
    Errno {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("request '{key}' is not supported by this supervisor transport")]
    Unsupported { key: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
