//! Built-in modules.
//!
//! `memory` exposes a simulated register space; `info` reports the server
//! build. Both serve as references for writing hardware modules.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use slotrpc::Method;
use slotrun::registry::ActivityIndicator;
use slotrun::registry::MethodRegistry;
use slotrun::registry::Module;
use slotrun::registry::ModuleCatalog;

pub fn catalog(dir: &str) -> ModuleCatalog {
    ModuleCatalog::new().with(dir, MemoryModule::default()).with(dir, InfoModule)
}

// ============================================================================
//  MEMORY
// ============================================================================

type Registers = Arc<Mutex<BTreeMap<u32, u32>>>;

/// Reads `count` consecutive words starting at `addr`.
pub struct Read;

impl Method for Read {
    const MODULE: &'static str = "memory";
    const NAME: &'static str = "read";
    type Args = (u32, u32);
    type Output = Vec<u32>;
}

/// Writes consecutive words starting at `addr`.
pub struct Write;

impl Method for Write {
    const MODULE: &'static str = "memory";
    const NAME: &'static str = "write";
    type Args = (u32, Vec<u32>);
    type Output = ();
}

/// Largest block a single read may return.
const MAX_READ_WORDS: u32 = 1 << 16;

#[derive(Default)]
struct MemoryModule {
    registers: Registers,
}

fn lock(registers: &Registers) -> slotrpc::Result<std::sync::MutexGuard<'_, BTreeMap<u32, u32>>> {
    registers.lock().map_err(|_| slotrpc::Error::handler("register space poisoned"))
}

impl Module for MemoryModule {
    fn name(&self) -> &str {
        "memory"
    }

    fn version_key(&self) -> &str {
        "v1"
    }

    fn activity_indicator(&self) -> ActivityIndicator {
        ActivityIndicator(1)
    }

    fn register(&self, registry: &mut MethodRegistry) {
        let registers = self.registers.clone();
        registry.register::<Read, _>(move |(addr, count)| {
            if count > MAX_READ_WORDS {
                return Err(slotrpc::Error::handler(format!("read of {} words exceeds {}", count, MAX_READ_WORDS)));
            }
            let regs = lock(&registers)?;
            Ok((0..count).map(|i| regs.get(&addr.wrapping_add(i)).copied().unwrap_or(0)).collect())
        });

        let registers = self.registers.clone();
        registry.register::<Write, _>(move |(addr, words)| {
            let mut regs = lock(&registers)?;
            for (i, word) in (0u32..).zip(words) {
                regs.insert(addr.wrapping_add(i), word);
            }
            Ok(())
        });
    }
}

// ============================================================================
//  INFO
// ============================================================================

/// Reports `(server name, version, ABI version)`.
pub struct Version;

impl Method for Version {
    const MODULE: &'static str = "info";
    const NAME: &'static str = "version";
    type Args = ();
    type Output = (String, String, String);
}

struct InfoModule;

impl Module for InfoModule {
    fn name(&self) -> &str {
        "info"
    }

    fn version_key(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn register(&self, registry: &mut MethodRegistry) {
        registry.register::<Version, _>(|()| {
            Ok((
                env!("CARGO_PKG_NAME").to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
                slotrpc::ABI_VERSION.to_string(),
            ))
        });
    }
}

#[cfg(test)]
mod tests {
    use slotrun::local::LocalConnector;
    use slotrun::session::Result;
    use slotrun::session::RpcSession;

    use super::*;

    #[tokio::test]
    async fn test_memory_write_then_read() -> Result<()> {
        let mut session = RpcSession::new(LocalConnector::new(Arc::new(catalog(slotrun::registry::DEFAULT_MODULE_DIR))));
        session.connect().await?;
        session.load_module("memory", "v1").await?;

        session.invoke::<Write>(&(0x10, vec![7, 8, 9])).await?;
        assert_eq!(session.invoke::<Read>(&(0x0f, 5)).await?, vec![0, 7, 8, 9, 0]);
        assert!(session.invoke::<Read>(&(0, MAX_READ_WORDS + 1)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_info_version() -> Result<()> {
        let mut session = RpcSession::new(LocalConnector::new(Arc::new(catalog("/modules"))).with_module_dir("/modules"));
        session.connect().await?;
        session.load_module("info", env!("CARGO_PKG_VERSION")).await?;
        let (name, _, abi) = session.invoke::<Version>(&()).await?;
        assert_eq!(name, "slotd");
        assert_eq!(abi, "v1");
        Ok(())
    }
}
