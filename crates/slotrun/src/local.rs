//! In-process transport.
//!
//! Runs the full request path (framing, dispatch, reply framing) against a
//! registry in the same process. Every connection gets a fresh registry, like
//! a connection to a real server. A [`LocalLink`] lets tests make the
//! "server" unreachable or cut existing connections.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;

use crate::config::DEFAULT_MAX_FRAME_LEN;
use crate::registry::MethodRegistry;
use crate::registry::ModuleCatalog;
use crate::server::dispatch_frame;
use crate::transport;
use crate::transport::Connector;
use crate::transport::Transport;

#[derive(Debug)]
struct LinkState {
    reachable: AtomicBool,
    generation: AtomicU64,
    connections: AtomicUsize,
}

/// Remote control for the connections of a [`LocalConnector`].
#[derive(Debug, Clone)]
pub struct LocalLink(Arc<LinkState>);

impl LocalLink {
    /// While unreachable, new connections fail. Existing ones keep working.
    pub fn set_reachable(&self, reachable: bool) {
        self.0.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Breaks every connection opened so far.
    pub fn drop_connections(&self) {
        self.0.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Connections opened so far.
    pub fn connections(&self) -> usize {
        self.0.connections.load(Ordering::SeqCst)
    }
}

/// Connects to an in-process server over `catalog`.
pub struct LocalConnector {
    catalog: Arc<ModuleCatalog>,
    module_dir: Option<String>,
    max_frame_len: usize,
    link: LocalLink,
}

impl LocalConnector {
    pub fn new(catalog: Arc<ModuleCatalog>) -> Self {
        let state = LinkState {
            reachable: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
        };
        Self { catalog, module_dir: None, max_frame_len: DEFAULT_MAX_FRAME_LEN, link: LocalLink(Arc::new(state)) }
    }

    pub fn with_module_dir(mut self, dir: impl Into<String>) -> Self {
        self.module_dir = Some(dir.into());
        self
    }

    /// Largest reply frame the in-process server will send.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn link(&self) -> LocalLink {
        self.link.clone()
    }
}

#[async_trait::async_trait]
impl Connector for LocalConnector {
    async fn connect(&self) -> transport::Result<Box<dyn Transport>> {
        let state = &self.link.0;
        if !state.reachable.load(Ordering::SeqCst) {
            return Err(transport::Error::Unreachable("local server is down".into()));
        }
        state.connections.fetch_add(1, Ordering::SeqCst);

        let mut registry = MethodRegistry::new(self.catalog.clone());
        if let Some(dir) = &self.module_dir {
            registry = registry.with_module_dir(dir.clone());
        }
        Ok(Box::new(LocalTransport {
            registry: Mutex::new(registry),
            link: self.link.clone(),
            max_frame_len: self.max_frame_len,
            generation: state.generation.load(Ordering::SeqCst),
        }))
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

struct LocalTransport {
    registry: Mutex<MethodRegistry>,
    link: LocalLink,
    max_frame_len: usize,
    generation: u64,
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    async fn call(&self, payload: &[u8]) -> transport::Result<Vec<u8>> {
        if self.link.0.generation.load(Ordering::SeqCst) != self.generation {
            return Err(transport::Error::ConnectionLost("local link dropped".into()));
        }
        let mut registry = self.registry.lock().await;
        dispatch_frame(&mut registry, payload, self.max_frame_len).map_err(|e| transport::Error::Io(e.to_string()))
    }
}
