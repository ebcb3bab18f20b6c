use super::SupervisorTransport;
use crate::error::TransportError;
use crate::value::LaunchValue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;

enum Scripted {
    Respond(LaunchValue),
    Empty,
    Fail(String),
}

/// In-memory supervisor double.
///
/// Replies are consumed in the order they were scripted; once the script is
/// exhausted every request gets the empty response. Received request keys
/// are recorded for assertions.
#[derive(Default)]
pub struct MemoryTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose first reply is `response`.
    #[must_use]
    pub fn responding(response: LaunchValue) -> Self {
        let transport = Self::new();
        transport.respond(response);
        transport
    }

    /// Queue a structured reply.
    pub fn respond(&self, response: LaunchValue) -> &Self {
        self.script.lock().push_back(Scripted::Respond(response));
        self
    }

    /// Queue an empty reply.
    pub fn respond_empty(&self) -> &Self {
        self.script.lock().push_back(Scripted::Empty);
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Request keys received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl SupervisorTransport for MemoryTransport {
    fn message(&self, key: &str) -> Result<Option<LaunchValue>, TransportError> {
        self.requests.lock().push(key.to_owned());

        match self.script.lock().pop_front() {
            Some(Scripted::Respond(value)) => Ok(Some(value)),
            Some(Scripted::Empty) | None => Ok(None),
            Some(Scripted::Fail(message)) => Err(TransportError::Io(io::Error::other(message))),
        }
    }
}
