//! # Method Registry
//!
//! The server-side table from `module.method` names to handlers, plus the
//! load state of every module that contributes handlers.
//!
//! ## Invariants
//! - **Load Before Dispatch**: A catalog module's methods exist in the
//!   registry only after the module loaded successfully.
//! - **Last Wins**: Registering a name twice replaces the earlier handler.
//! - **No Guessing**: An unknown name never falls back to a similar one, and
//!   no handler runs for it.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use slotmsg::WireMessage;
use slotrpc::Method;

/// Catalog directory modules are looked up in unless configured otherwise.
pub const DEFAULT_MODULE_DIR: &str = "/mnt/persistent/rpcmodules";

/// A request handler: reads arguments from the request, writes its result
/// into the response.
pub type Handler = Box<dyn Fn(&WireMessage, &mut WireMessage) -> slotrpc::Result<()> + Send + Sync>;

/// Receives activity indicators as the registry works, e.g. to blink a
/// front-panel LED in the module's colour.
pub type ActivitySignal = Arc<dyn Fn(ActivityIndicator) + Send + Sync>;

/// Reason a module's `init` hook refused to load.
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Opaque per-module activity code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActivityIndicator(pub u32);

/// A loadable unit of remote methods.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// The version this build of the module answers to.
    fn version_key(&self) -> &str;

    fn activity_indicator(&self) -> ActivityIndicator {
        ActivityIndicator::default()
    }

    /// Runs once per registry before `register`. A failure aborts the load.
    fn init(&self) -> std::result::Result<(), InitError> {
        Ok(())
    }

    /// Adds the module's methods to `registry`.
    fn register(&self, registry: &mut MethodRegistry);
}

/// The set of modules a server can load, grouped by directory.
#[derive(Default, Clone)]
pub struct ModuleCatalog {
    dirs: BTreeMap<String, BTreeMap<String, Arc<dyn Module>>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module` to `dir`, replacing a module of the same name.
    pub fn insert(&mut self, dir: impl Into<String>, module: impl Module + 'static) {
        let module: Arc<dyn Module> = Arc::new(module);
        self.dirs.entry(dir.into()).or_default().insert(module.name().to_string(), module);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, dir: impl Into<String>, module: impl Module + 'static) -> Self {
        self.insert(dir, module);
        self
    }

    pub fn get(&self, dir: &str, name: &str) -> Option<Arc<dyn Module>> {
        self.dirs.get(dir)?.get(name).cloned()
    }

    /// Modules of `dir` in name order.
    pub fn modules(&self, dir: &str) -> Vec<Arc<dyn Module>> {
        self.dirs.get(dir).map(|mods| mods.values().cloned().collect()).unwrap_or_default()
    }

    pub fn has_dir(&self, dir: &str) -> bool {
        self.dirs.contains_key(dir)
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (dir, mods) in &self.dirs {
            map.entry(dir, &mods.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

/// Why a module did not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleLoadError {
    NotFound { dir: String, module: String },
    VersionMismatch { module: String, requested: String, available: String },
    InitFailed { module: String, reason: String },
}

impl fmt::Display for ModuleLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { dir, module } => write!(f, "module {} not found in {}", module, dir),
            Self::VersionMismatch { module, requested, available } => {
                write!(f, "module {} is at version {}, {} was requested", module, available, requested)
            }
            Self::InitFailed { module, reason } => write!(f, "module {} failed to initialize: {}", module, reason),
        }
    }
}

impl std::error::Error for ModuleLoadError {}

/// Dispatch failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnknownMethod(String),
    ModuleLoad(ModuleLoadError),
    /// The handler ran and failed.
    Handler(slotrpc::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod(name) => write!(f, "unknown method {}", name),
            Self::ModuleLoad(e) => write!(f, "{}", e),
            Self::Handler(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ModuleLoadError> for Error {
    fn from(e: ModuleLoadError) -> Self {
        Self::ModuleLoad(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load state of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    Unloaded,
    Loaded(String),
}

struct Registration {
    module: String,
    indicator: ActivityIndicator,
    handler: Handler,
}

/// Maps method names to handlers for one served connection.
pub struct MethodRegistry {
    catalog: Arc<ModuleCatalog>,
    module_dir: String,
    methods: HashMap<String, Registration>,
    modules: BTreeMap<String, String>,
    indicators: HashMap<String, ActivityIndicator>,
    load_errors: BTreeMap<String, ModuleLoadError>,
    modload_indicator: ActivityIndicator,
    signal: Option<ActivitySignal>,
}

impl MethodRegistry {
    /// An empty registry that loads modules from `catalog`.
    pub fn new(catalog: Arc<ModuleCatalog>) -> Self {
        Self {
            catalog,
            module_dir: DEFAULT_MODULE_DIR.to_string(),
            methods: HashMap::new(),
            modules: BTreeMap::new(),
            indicators: HashMap::new(),
            load_errors: BTreeMap::new(),
            modload_indicator: ActivityIndicator::default(),
            signal: None,
        }
    }

    /// Directory `module.load` requests resolve against.
    pub fn with_module_dir(mut self, dir: impl Into<String>) -> Self {
        self.module_dir = dir.into();
        self
    }

    pub fn with_activity_signal(mut self, signal: ActivitySignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Indicator signalled while a module loads.
    pub fn with_modload_indicator(mut self, indicator: ActivityIndicator) -> Self {
        self.modload_indicator = indicator;
        self
    }

    pub fn module_dir(&self) -> &str {
        &self.module_dir
    }

    pub fn catalog(&self) -> &Arc<ModuleCatalog> {
        &self.catalog
    }

    /// Binds `service` to `handler`, replacing any earlier binding.
    pub fn register_method(&mut self, service: impl Into<String>, module: impl Into<String>, handler: Handler) {
        let service = service.into();
        let module = module.into();
        let indicator = self.indicators.get(&module).copied().unwrap_or_default();
        let previous = self.methods.insert(service.clone(), Registration { module, indicator, handler });
        if let Some(previous) = previous {
            tracing::debug!(method = %service, previous_module = %previous.module, "method re-registered");
        }
    }

    /// Registers a typed handler under `M`'s qualified name.
    ///
    /// Arguments are decoded before `handler` runs and its output is encoded
    /// into the response.
    pub fn register<M, F>(&mut self, handler: F)
    where
        M: Method + 'static,
        F: Fn(M::Args) -> slotrpc::Result<M::Output> + Send + Sync + 'static,
    {
        let wrapped: Handler = Box::new(move |request: &WireMessage, response: &mut WireMessage| {
            let args: M::Args = slotrpc::decode_args(request)?;
            let output = handler(args)?;
            slotrpc::encode_result(response, &output)
        });
        self.register_method(slotrpc::qualified_name::<M>(), M::MODULE, wrapped);
    }

    pub fn contains(&self, service: &str) -> bool {
        self.methods.contains_key(service)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn module_state(&self, module: &str) -> ModuleState {
        match self.modules.get(module) {
            Some(version) => ModuleState::Loaded(version.clone()),
            None => ModuleState::Unloaded,
        }
    }

    /// Failures of the most recent load attempt of each module that has not
    /// loaded since.
    pub fn load_errors(&self) -> &BTreeMap<String, ModuleLoadError> {
        &self.load_errors
    }

    /// Loads `module` at `version_key` from the catalog directory `dir`.
    ///
    /// Loading a module that is already loaded at the same version succeeds
    /// without running it again.
    pub fn load_module(
        &mut self,
        dir: &str,
        module: &str,
        version_key: &str,
    ) -> std::result::Result<(), ModuleLoadError> {
        self.signal(self.modload_indicator);
        let outcome = self.try_load(dir, module, version_key);
        match &outcome {
            Ok(()) => {
                self.load_errors.remove(module);
            }
            Err(e) => {
                self.load_errors.insert(module.to_string(), e.clone());
            }
        }
        outcome
    }

    fn try_load(&mut self, dir: &str, name: &str, version_key: &str) -> std::result::Result<(), ModuleLoadError> {
        if let Some(loaded) = self.modules.get(name) {
            if loaded == version_key {
                tracing::debug!(module = name, version = version_key, "module already loaded");
                return Ok(());
            }
            return Err(ModuleLoadError::VersionMismatch {
                module: name.to_string(),
                requested: version_key.to_string(),
                available: loaded.clone(),
            });
        }

        let module = self
            .catalog
            .get(dir, name)
            .ok_or_else(|| ModuleLoadError::NotFound { dir: dir.to_string(), module: name.to_string() })?;

        if module.version_key() != version_key {
            return Err(ModuleLoadError::VersionMismatch {
                module: name.to_string(),
                requested: version_key.to_string(),
                available: module.version_key().to_string(),
            });
        }

        module
            .init()
            .map_err(|e| ModuleLoadError::InitFailed { module: name.to_string(), reason: e.to_string() })?;

        self.modules.insert(name.to_string(), version_key.to_string());
        self.indicators.insert(name.to_string(), module.activity_indicator());
        module.register(self);
        tracing::info!(module = name, version = version_key, dir, "module loaded");
        Ok(())
    }

    /// Loads every module of `dir` at its own version, in name order.
    ///
    /// Returns how many loaded. Failures are logged and kept in
    /// [`load_errors`](Self::load_errors), never returned.
    pub fn load_modules_dir(&mut self, dir: &str) -> usize {
        if !self.catalog.has_dir(dir) {
            tracing::warn!(dir, "module directory not found");
            return 0;
        }
        let mut loaded = 0;
        for module in self.catalog.modules(dir) {
            match self.load_module(dir, module.name(), module.version_key()) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!(module = module.name(), error = %e, "skipping module"),
            }
        }
        tracing::info!(dir, loaded, "module directory scanned");
        loaded
    }

    /// Runs the handler bound to `service`.
    pub fn invoke_method(&self, service: &str, request: &WireMessage, response: &mut WireMessage) -> Result<()> {
        let registration = self.methods.get(service).ok_or_else(|| Error::UnknownMethod(service.to_string()))?;
        self.signal(registration.indicator);
        tracing::debug!(method = service, module = %registration.module, "invoking");
        (registration.handler)(request, response).map_err(Error::Handler)?;
        tracing::trace!(method = service, keys = response.len(), "handler finished");
        Ok(())
    }

    fn signal(&self, indicator: ActivityIndicator) {
        if let Some(signal) = &self.signal {
            signal(indicator);
        }
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ModuleCatalog::new()))
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("module_dir", &self.module_dir)
            .field("methods", &self.method_names())
            .field("modules", &self.modules)
            .field("load_errors", &self.load_errors)
            .finish()
    }
}
