//! # Server
//!
//! Turns requests into replies against a [`MethodRegistry`], and serves that
//! over TCP.
//!
//! ## Invariants
//! - **Always Reply**: Every request yields exactly one reply. Failures become
//!   failure replies; they never close the connection.
//! - **Per-Connection State**: Every accepted connection owns a fresh
//!   registry. Modules loaded by one client are invisible to others and are
//!   forgotten when the connection ends.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use slotmsg::WireMessage;
use slotrpc::FailureKind;
use slotrpc::MODULE_LOAD_METHOD;
use slotrpc::RemoteFailure;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

use crate::config::ServerConfig;
use crate::registry;
use crate::registry::MethodRegistry;
use crate::registry::ModuleCatalog;
use crate::tcp::read_frame;
use crate::tcp::write_frame;
use crate::transport;

/// Pause after an accept failure that is not the peer's doing.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Handles one request and returns its reply.
///
/// `module.load` is served by the registry itself; every other method goes
/// to its registered handler.
pub fn dispatch(registry: &mut MethodRegistry, request: &WireMessage) -> WireMessage {
    let method = request.method();
    let mut response = WireMessage::new(method);

    let outcome = slotrpc::check_abi(request).and_then(|()| {
        if method == MODULE_LOAD_METHOD {
            load_module(registry, request)
        } else {
            registry.invoke_method(method, request, &mut response).map_err(to_failure)
        }
    });

    if let Err(failure) = outcome {
        tracing::error!(method, kind = %failure.kind, error = %failure.message, "call failed");
        slotrpc::encode_failure(&mut response, &failure);
    }
    response
}

/// [`dispatch`] over framed bytes. Undecodable requests, and replies whose
/// frame would exceed `max_reply_len`, get a `Protocol` failure reply.
pub fn dispatch_frame(registry: &mut MethodRegistry, request: &[u8], max_reply_len: usize) -> slotmsg::Result<Vec<u8>> {
    let mut response = match WireMessage::from_bytes(request) {
        Ok(request) => dispatch(registry, &request),
        Err(e) => {
            tracing::error!(error = %e, "malformed request frame");
            let mut response = WireMessage::new("");
            slotrpc::encode_failure(&mut response, &RemoteFailure::new(FailureKind::Protocol, e.to_string()));
            response
        }
    };
    let reply = response.to_bytes()?;
    if reply.len() <= max_reply_len {
        return Ok(reply);
    }
    let message = format!("reply of {} bytes exceeds the {} byte frame limit", reply.len(), max_reply_len);
    tracing::error!(method = response.method(), error = %message, "reply too large");
    slotrpc::encode_failure(&mut response, &RemoteFailure::new(FailureKind::Protocol, message));
    response.to_bytes()
}

fn load_module(registry: &mut MethodRegistry, request: &WireMessage) -> Result<(), RemoteFailure> {
    let (module, version): (String, String) = slotrpc::decode_args(request)
        .map_err(|e| RemoteFailure::new(FailureKind::Protocol, format!("bad module.load request: {}", e)))?;
    let dir = registry.module_dir().to_string();
    registry
        .load_module(&dir, &module, &version)
        .map_err(|e| RemoteFailure::new(FailureKind::ModuleLoad, e.to_string()))
}

fn to_failure(e: registry::Error) -> RemoteFailure {
    let kind = match &e {
        registry::Error::UnknownMethod(_) => FailureKind::UnknownMethod,
        registry::Error::ModuleLoad(_) => FailureKind::ModuleLoad,
        registry::Error::Handler(_) => FailureKind::Handler,
    };
    let message = match e {
        registry::Error::Handler(slotrpc::Error::Handler(msg)) => msg,
        other => other.to_string(),
    };
    RemoteFailure::new(kind, message)
}

/// A TCP listener serving one registry per connection.
pub struct Server {
    listener: TcpListener,
    catalog: Arc<ModuleCatalog>,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig, catalog: Arc<ModuleCatalog>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        Ok(Self { listener, catalog, config })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever. Accept failures are logged and retried.
    pub async fn run(self) -> std::io::Result<()> {
        tracing::info!(addr = %self.local_addr()?, module_dir = %self.config.module_dir, "serving");
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    if let Some(delay) = accept_backoff(&e) {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
            };
            let registry = MethodRegistry::new(self.catalog.clone()).with_module_dir(self.config.module_dir.clone());
            let max_frame_len = self.config.max_frame_len;
            tokio::spawn(async move {
                tracing::info!(%peer, "client connected");
                match serve_connection(stream, registry, max_frame_len).await {
                    Ok(()) => tracing::info!(%peer, "client disconnected"),
                    Err(e) => tracing::warn!(%peer, error = %e, "connection closed"),
                }
            });
        }
    }
}

/// How long to wait before accepting again after `e`: no pause after a
/// peer-side abort, [`ACCEPT_BACKOFF`] after anything else, such as running
/// out of file descriptors.
pub(crate) fn accept_backoff(e: &std::io::Error) -> Option<Duration> {
    match e.kind() {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => None,
        _ => Some(ACCEPT_BACKOFF),
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    mut registry: MethodRegistry,
    max_frame_len: usize,
) -> transport::Result<()> {
    stream.set_nodelay(true)?;
    while let Some(request) = read_frame(&mut stream, max_frame_len).await? {
        let reply =
            dispatch_frame(&mut registry, &request, max_frame_len).map_err(|e| transport::Error::Io(e.to_string()))?;
        write_frame(&mut stream, &reply, max_frame_len).await?;
    }
    Ok(())
}
