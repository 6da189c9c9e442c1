//! # RPC Session
//!
//! The client side of a connection: connects through a [`Connector`], loads
//! remote modules and issues typed calls.
//!
//! ## Invariants
//! - **One Call At A Time**: Every operation takes `&mut self`; a session
//!   never has two requests in flight.
//! - **Remembered Modules**: Every module loaded successfully is recorded
//!   once, in load order, and reloaded by [`RpcSession::reconnect`].
//! - **Dead On Failure**: A failed exchange drops the transport. The session
//!   reads as disconnected until `connect` or `reconnect`.
//! - **Single Translation**: Transport, codec and remote failures are mapped
//!   onto [`Error`] in exactly one place.

use std::fmt;

use slotmsg::WireMessage;
use slotpack::Decode;
use slotpack::Encode;
use slotrpc::FailureKind;
use slotrpc::Method;
use slotrpc::ModuleLoad;
use slotrpc::RemoteFailure;
use tracing::Level;
use tracing::level_filters::LevelFilter;

use crate::config::SessionConfig;
use crate::tcp::TcpConnector;
use crate::transport;
use crate::transport::Connector;
use crate::transport::Transport;

/// Emits a tracing event if the session's own level lets it through.
macro_rules! session_event {
    ($session:expr, $level:expr, $($arg:tt)+) => {
        if $level <= $session.log_level {
            tracing::event!($level, $($arg)+);
        }
    };
}

/// Session failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport could not be established or failed mid-call.
    Connection(String),
    /// `connect` was called on a connected session.
    AlreadyConnected,
    /// A call was attempted without a connection.
    NotConnected,
    /// The server refused to load a module.
    ModuleLoad { module: String, cause: String },
    /// The server has no handler under the requested name.
    UnknownMethod(String),
    /// The handler ran and failed.
    Remote(RemoteFailure),
    /// Arguments or result did not fit the call signature.
    Codec(slotpack::Error),
    /// The reply was not a valid message, or the server rejected the request.
    Protocol(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "RPC connection error: {}", msg),
            Self::AlreadyConnected => write!(f, "already connected"),
            Self::NotConnected => write!(f, "not connected"),
            Self::ModuleLoad { module, cause } => write!(f, "could not load module {}: {}", module, cause),
            Self::UnknownMethod(msg) => write!(f, "RPC error: {}", msg),
            Self::Remote(failure) => write!(f, "RPC error: {}", failure.message),
            Self::Codec(e) => write!(f, "RPC codec error (signature mismatch?): {}", e),
            Self::Protocol(msg) => write!(f, "RPC protocol error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(e: transport::Error) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<slotpack::Error> for Error {
    fn from(e: slotpack::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<slotmsg::Error> for Error {
    fn from(e: slotmsg::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<slotrpc::Error> for Error {
    fn from(e: slotrpc::Error) -> Self {
        match e {
            slotrpc::Error::Codec(e) => Self::Codec(e),
            slotrpc::Error::Wire(e) => e.into(),
            slotrpc::Error::Remote(failure) => match failure.kind {
                FailureKind::UnknownMethod => Self::UnknownMethod(failure.message),
                FailureKind::Protocol => Self::Protocol(failure.message),
                FailureKind::ModuleLoad | FailureKind::Handler => Self::Remote(failure),
            },
            slotrpc::Error::Handler(msg) => Self::Protocol(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A client connection to one RPC server.
pub struct RpcSession {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    modules: Vec<(String, String)>,
    log_level: LevelFilter,
}

impl RpcSession {
    /// A disconnected session that will connect through `connector`.
    pub fn new(connector: impl Connector) -> Self {
        Self { connector: Box::new(connector), transport: None, modules: Vec::new(), log_level: LevelFilter::TRACE }
    }

    /// A disconnected session over TCP.
    pub fn tcp(config: &SessionConfig) -> Self {
        Self::new(TcpConnector::new(config))
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Modules loaded during this session's lifetime, in load order.
    pub fn loaded_modules(&self) -> &[(String, String)] {
        &self.modules
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Sets how verbose this session's own events are: 0 error, 1 warn,
    /// 2 info, 3 debug, 4 and above trace.
    pub fn set_log_level(&mut self, level: u8) {
        self.log_level = match level {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
    }

    pub async fn connect(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(Error::AlreadyConnected);
        }
        match self.connector.connect().await {
            Ok(transport) => {
                self.transport = Some(transport);
                session_event!(self, Level::INFO, peer = %self.connector.describe(), "connected");
                Ok(())
            }
            Err(e) => {
                session_event!(self, Level::ERROR, peer = %self.connector.describe(), error = %e, "connect failed");
                Err(e.into())
            }
        }
    }

    /// Releases the transport. Does nothing when already disconnected.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            session_event!(self, Level::INFO, peer = %self.connector.describe(), "disconnected");
        }
    }

    /// Tears the connection down, connects again and reloads every module
    /// loaded so far, in load order.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.disconnect();
        self.connect().await?;
        let modules = self.modules.clone();
        for (module, version) in &modules {
            self.send_module_load(module, version).await?;
        }
        session_event!(self, Level::INFO, modules = modules.len(), "reconnected");
        Ok(())
    }

    /// Asks the server to load `module` at `version`.
    pub async fn load_module(&mut self, module: &str, version: &str) -> Result<()> {
        self.send_module_load(module, version).await?;
        if !self.modules.iter().any(|(m, v)| m == module && v == version) {
            self.modules.push((module.to_string(), version.to_string()));
        }
        Ok(())
    }

    async fn send_module_load(&mut self, module: &str, version: &str) -> Result<()> {
        let args = (module.to_string(), version.to_string());
        match self.invoke::<ModuleLoad>(&args).await {
            Ok(()) => {
                session_event!(self, Level::INFO, module, version, "module loaded");
                Ok(())
            }
            Err(Error::Remote(failure)) if failure.kind == FailureKind::ModuleLoad => {
                Err(Error::ModuleLoad { module: module.to_string(), cause: failure.message })
            }
            Err(e) => Err(e),
        }
    }

    /// Calls `method` with `args` and decodes its result as `R`.
    pub async fn call<A, R>(&mut self, method: &str, args: &A) -> Result<R>
    where
        A: Encode + ?Sized,
        R: Decode,
    {
        let request = slotrpc::encode_call(method, args)?;
        session_event!(self, Level::DEBUG, method, "call");
        session_event!(self, Level::TRACE, method, keys = request.len(), "request encoded");
        let reply = self.exchange(&request).await?;
        slotrpc::decode_reply(&reply).map_err(|e| {
            let e = Error::from(e);
            session_event!(self, Level::ERROR, method, error = %e, "call failed");
            e
        })
    }

    /// Calls the typed method `M`.
    pub async fn invoke<M: Method>(&mut self, args: &M::Args) -> Result<M::Output> {
        self.call(&slotrpc::qualified_name::<M>(), args).await
    }

    async fn exchange(&mut self, request: &WireMessage) -> Result<WireMessage> {
        let payload = request.to_bytes()?;
        let transport = self.transport.as_ref().ok_or(Error::NotConnected)?;
        let outcome = transport.call(&payload).await;
        match outcome {
            Ok(bytes) => Ok(WireMessage::from_bytes(&bytes)?),
            Err(e) => {
                self.transport = None;
                session_event!(self, Level::ERROR, method = request.method(), error = %e, "transport failed");
                Err(e.into())
            }
        }
    }
}

impl fmt::Debug for RpcSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSession")
            .field("peer", &self.connector.describe())
            .field("connected", &self.is_connected())
            .field("modules", &self.modules)
            .field("log_level", &self.log_level)
            .finish()
    }
}
