//! # Error Definitions
//!
//! The central ledger of envelope and remote failures.

use std::fmt;

/// Failures while building or reading an RPC envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Encoding arguments or decoding a result failed.
    Codec(slotpack::Error),
    /// The reply frame could not be read or written.
    Wire(slotmsg::Error),
    /// The remote side answered with a failure reply.
    Remote(RemoteFailure),
    /// A handler rejected the call on its own terms.
    Handler(String),
}

impl Error {
    /// Shorthand for handlers that want to fail with a message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Codec(e) => write!(f, "codec: {}", e),
            Error::Wire(e) => write!(f, "wire: {}", e),
            Error::Remote(failure) => write!(f, "{}", failure),
            Error::Handler(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<slotpack::Error> for Error {
    fn from(e: slotpack::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<slotmsg::Error> for Error {
    fn from(e: slotmsg::Error) -> Self {
        Self::Wire(e)
    }
}

impl From<RemoteFailure> for Error {
    fn from(f: RemoteFailure) -> Self {
        Self::Remote(f)
    }
}

/// A specialized Result type for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why the remote side refused or failed a call.
///
/// These are distinct from `Error`; these represent the *remote* system
/// failing, whereas the other variants of `Error` are local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No handler is registered under the requested name.
    UnknownMethod,
    /// A `module.load` request could not be satisfied.
    ModuleLoad,
    /// The handler ran and reported an error.
    Handler,
    /// The request itself was malformed or spoke another ABI.
    Protocol,
}

impl FailureKind {
    pub fn as_tag(self) -> &'static str {
        match self {
            FailureKind::UnknownMethod => "UnknownMethod",
            FailureKind::ModuleLoad => "ModuleLoad",
            FailureKind::Handler => "Handler",
            FailureKind::Protocol => "Protocol",
        }
    }

    /// Unrecognized tags read as `Handler`, the most generic kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "UnknownMethod" => FailureKind::UnknownMethod,
            "ModuleLoad" => FailureKind::ModuleLoad,
            "Protocol" => FailureKind::Protocol,
            _ => FailureKind::Handler,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A failure carried back to the caller in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote {}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RemoteFailure {}
