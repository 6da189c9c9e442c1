//! Integration tests for slotrun: module catalogs, sessions and both
//! transports end to end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use slotpack::Decode;
use slotpack::Encode;
use slotrpc::Method;
use slotrun::config::ServerConfig;
use slotrun::config::SessionConfig;
use slotrun::local::LocalConnector;
use slotrun::registry::DEFAULT_MODULE_DIR;
use slotrun::registry::InitError;
use slotrun::registry::MethodRegistry;
use slotrun::registry::Module;
use slotrun::registry::ModuleCatalog;
use slotrun::registry::ModuleLoadError;
use slotrun::server::Server;
use slotrun::session;
use slotrun::session::RpcSession;

// --- Fixtures ---

/// A module exposing one `<name>.echo` method that returns its argument.
struct EchoModule {
    name: &'static str,
    fail_init: bool,
    calls: Arc<AtomicUsize>,
}

impl EchoModule {
    fn new(name: &'static str) -> Self {
        Self { name, fail_init: false, calls: Arc::new(AtomicUsize::new(0)) }
    }

    fn failing(name: &'static str) -> Self {
        Self { fail_init: true, ..Self::new(name) }
    }
}

impl Module for EchoModule {
    fn name(&self) -> &str {
        self.name
    }

    fn version_key(&self) -> &str {
        "1.0"
    }

    fn init(&self) -> Result<(), InitError> {
        if self.fail_init {
            return Err(format!("{} cannot reach its hardware", self.name).into());
        }
        Ok(())
    }

    fn register(&self, registry: &mut MethodRegistry) {
        let calls = self.calls.clone();
        registry.register_method(
            format!("{}.echo", self.name),
            self.name,
            Box::new(move |req: &slotrpc::WireMessage, rsp: &mut slotrpc::WireMessage| {
                calls.fetch_add(1, Ordering::SeqCst);
                let text: String = slotrpc::decode_args(req)?;
                slotrpc::encode_result(rsp, &text)
            }),
        );
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct RegisterDump {
    base: u32,
    values: Vec<u32>,
    names: BTreeMap<String, u32>,
    mask: [u8; 4],
}

struct Dump;

impl Method for Dump {
    const MODULE: &'static str = "memory";
    const NAME: &'static str = "dump";
    type Args = (u32, u16);
    type Output = RegisterDump;
}

struct Fill;

impl Method for Fill {
    const MODULE: &'static str = "memory";
    const NAME: &'static str = "fill";
    type Args = u32;
    type Output = Vec<u32>;
}

struct MemoryModule;

impl Module for MemoryModule {
    fn name(&self) -> &str {
        "memory"
    }

    fn version_key(&self) -> &str {
        "2.1"
    }

    fn register(&self, registry: &mut MethodRegistry) {
        registry.register::<Dump, _>(|(base, count)| {
            let values: Vec<u32> = (0..u32::from(count)).map(|i| base + 4 * i).collect();
            let names = values.iter().enumerate().map(|(i, v)| (format!("REG{}", i), *v)).collect();
            Ok(RegisterDump { base, values, names, mask: [0xff, 0x0f, 0, 1] })
        });
        registry.register::<Fill, _>(|count| Ok(vec![7; count as usize]));
    }
}

fn catalog() -> Arc<ModuleCatalog> {
    Arc::new(
        ModuleCatalog::new()
            .with(DEFAULT_MODULE_DIR, EchoModule::new("alpha"))
            .with(DEFAULT_MODULE_DIR, EchoModule::failing("beta"))
            .with(DEFAULT_MODULE_DIR, EchoModule::new("gamma"))
            .with(DEFAULT_MODULE_DIR, MemoryModule),
    )
}

// --- Test 1: Partial failure while scanning a directory ---

#[test]
fn test_directory_scan_partial_failure() {
    let catalog = Arc::new(
        ModuleCatalog::new()
            .with("/opt/mods", EchoModule::new("alpha"))
            .with("/opt/mods", EchoModule::failing("beta"))
            .with("/opt/mods", EchoModule::new("gamma")),
    );
    let mut registry = MethodRegistry::new(catalog);

    assert_eq!(registry.load_modules_dir("/opt/mods"), 2);
    assert!(matches!(registry.load_errors().get("beta"), Some(ModuleLoadError::InitFailed { .. })));
    assert_eq!(registry.load_errors().len(), 1);

    for name in ["alpha", "gamma"] {
        let method = format!("{}.echo", name);
        let request = slotrpc::encode_call(&method, "hi").expect("encode");
        let mut response = slotrpc::WireMessage::new(&method);
        registry.invoke_method(&method, &request, &mut response).expect("dispatch");
        assert_eq!(slotrpc::decode_reply::<String>(&response).expect("decode"), "hi");
    }
    assert!(!registry.contains("beta.echo"));
}

// --- Test 2: Reconnect reloads remembered modules ---

#[tokio::test]
async fn test_reconnect_reloads_modules() -> session::Result<()> {
    let connector = LocalConnector::new(catalog());
    let link = connector.link();
    let mut session = RpcSession::new(connector);

    session.connect().await?;
    session.load_module("alpha", "1.0").await?;
    session.load_module("memory", "2.1").await?;
    assert_eq!(session.call::<_, String>("alpha.echo", "before").await?, "before");

    link.drop_connections();
    let err = session.call::<_, String>("alpha.echo", "lost").await;
    assert!(matches!(err, Err(session::Error::Connection(_))), "got {:?}", err);
    assert!(!session.is_connected());

    session.reconnect().await?;
    assert_eq!(link.connections(), 2);
    assert_eq!(session.call::<_, String>("alpha.echo", "after").await?, "after");
    assert_eq!(session.invoke::<Dump>(&(0x100, 1)).await?.values, vec![0x100]);
    assert_eq!(
        session.loaded_modules(),
        &[("alpha".to_string(), "1.0".to_string()), ("memory".to_string(), "2.1".to_string())]
    );
    Ok(())
}

#[tokio::test]
async fn test_fresh_connection_forgets_modules() -> session::Result<()> {
    let mut first = RpcSession::new(LocalConnector::new(catalog()));
    first.connect().await?;
    first.load_module("gamma", "1.0").await?;
    first.disconnect();
    first.connect().await?;

    // `connect` alone does not reload; only `reconnect` does.
    let err = first.call::<_, String>("gamma.echo", "x").await;
    assert!(matches!(err, Err(session::Error::UnknownMethod(_))), "got {:?}", err);
    Ok(())
}

#[tokio::test]
async fn test_reconnect_while_unreachable() -> session::Result<()> {
    let connector = LocalConnector::new(catalog());
    let link = connector.link();
    let mut session = RpcSession::new(connector);
    session.connect().await?;

    link.set_reachable(false);
    assert!(matches!(session.reconnect().await, Err(session::Error::Connection(_))));
    assert!(!session.is_connected());

    link.set_reachable(true);
    session.reconnect().await?;
    assert!(session.is_connected());
    Ok(())
}

#[tokio::test]
async fn test_version_mismatch_is_reported() -> session::Result<()> {
    let mut session = RpcSession::new(LocalConnector::new(catalog()));
    session.connect().await?;
    match session.load_module("memory", "3.0").await {
        Err(session::Error::ModuleLoad { module, cause }) => {
            assert_eq!(module, "memory");
            assert!(cause.contains("2.1"), "cause was {}", cause);
        }
        other => panic!("expected ModuleLoad, got {:?}", other),
    }
    Ok(())
}

// --- Test 3: TCP end to end ---

async fn spawn_server() -> std::net::SocketAddr {
    spawn_server_with(ServerConfig { bind: "127.0.0.1:0".into(), ..ServerConfig::default() }).await
}

async fn spawn_server_with(config: ServerConfig) -> std::net::SocketAddr {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("slotrun=debug"))
        .with_test_writer()
        .try_init();
    let server = Server::bind(config, catalog()).await.expect("bind");
    let addr = server.local_addr().expect("addr");
    tokio::spawn(server.run());
    addr
}

#[tokio::test]
async fn test_tcp_round_trip() -> session::Result<()> {
    let addr = spawn_server().await;
    let config = SessionConfig::default().with_endpoint(addr.to_string());
    let mut session = RpcSession::tcp(&config);

    session.connect().await?;
    session.load_module("memory", "2.1").await?;
    let dump = session.invoke::<Dump>(&(0x6640_0000, 3)).await?;
    assert_eq!(dump.base, 0x6640_0000);
    assert_eq!(dump.values, vec![0x6640_0000, 0x6640_0004, 0x6640_0008]);
    assert_eq!(dump.names.get("REG2"), Some(&0x6640_0008));
    assert_eq!(dump.mask, [0xff, 0x0f, 0, 1]);

    let err = session.call::<_, ()>("memory.erase", &()).await;
    assert!(matches!(err, Err(session::Error::UnknownMethod(_))));
    Ok(())
}

#[tokio::test]
async fn test_tcp_connections_are_isolated() -> session::Result<()> {
    let addr = spawn_server().await;
    let config = SessionConfig::default().with_endpoint(addr.to_string());

    let mut a = RpcSession::tcp(&config);
    let mut b = RpcSession::tcp(&config);
    a.connect().await?;
    b.connect().await?;
    a.load_module("alpha", "1.0").await?;

    assert_eq!(a.call::<_, String>("alpha.echo", "a").await?, "a");
    assert!(matches!(b.call::<_, String>("alpha.echo", "b").await, Err(session::Error::UnknownMethod(_))));

    a.reconnect().await?;
    assert_eq!(a.call::<_, String>("alpha.echo", "again").await?, "again");
    Ok(())
}

#[tokio::test]
async fn test_tcp_unreachable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let config = SessionConfig::default()
        .with_endpoint(addr.to_string())
        .with_connect_timeout(Duration::from_secs(1));
    let mut session = RpcSession::tcp(&config);
    assert!(matches!(session.connect().await, Err(session::Error::Connection(_))));
}

// --- Test 4: Oversized replies ---

#[tokio::test]
async fn test_tcp_reply_over_client_limit_drops_connection() -> session::Result<()> {
    let addr = spawn_server_with(ServerConfig {
        bind: "127.0.0.1:0".into(),
        max_frame_len: 8 << 20,
        ..ServerConfig::default()
    })
    .await;
    let config = SessionConfig::default().with_endpoint(addr.to_string());
    let mut session = RpcSession::tcp(&config);
    session.connect().await?;
    session.load_module("memory", "2.1").await?;

    // 300k words is about 1.2 MB, above the client's 1 MiB cap.
    let err = session.invoke::<Fill>(&300_000).await;
    assert!(matches!(err, Err(session::Error::Connection(_))), "got {:?}", err);
    assert!(!session.is_connected());
    assert_eq!(session.invoke::<Fill>(&2).await, Err(session::Error::NotConnected));

    // A fresh stream carries no leftovers from the refused reply.
    session.reconnect().await?;
    assert_eq!(session.invoke::<Fill>(&2).await?, vec![7, 7]);
    Ok(())
}

#[tokio::test]
async fn test_tcp_reply_over_server_limit_keeps_connection() -> session::Result<()> {
    let addr = spawn_server().await;
    let config = SessionConfig::default().with_endpoint(addr.to_string());
    let mut session = RpcSession::tcp(&config);
    session.connect().await?;
    session.load_module("memory", "2.1").await?;

    let err = session.invoke::<Fill>(&300_000).await;
    assert!(matches!(err, Err(session::Error::Protocol(_))), "got {:?}", err);
    assert!(session.is_connected());

    // Same connection, modules still loaded.
    assert_eq!(session.invoke::<Fill>(&3).await?, vec![7, 7, 7]);
    Ok(())
}
