use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// An application-wide config, set once at startup and read from anywhere.
///
/// Layers are not `Send`, so the holder lives in a `thread_local!`. The
/// config is either installed with [`initialize`](Self::initialize) or, if
/// the holder was created with a builder that needs no arguments, built on
/// first read.
///
/// ```
/// use stratum_config::{DictConfig, InitializableConfig, Setting, config_schema, layers};
///
/// config_schema! {
///     pub struct AppConfig {
///         workers: i64 = Setting::int().with_default(4),
///     }
/// }
///
/// thread_local! {
///     static APP: InitializableConfig<AppConfig> = const { InitializableConfig::new("AppConfig") };
/// }
///
/// APP.with(|app| assert!(app.get().is_err()));
/// APP.with(|app| app.initialize(AppConfig::load(layers![DictConfig::new()]).unwrap()));
/// let workers = APP.with(|app| app.get().unwrap().workers().unwrap());
/// assert_eq!(workers, 4);
/// ```
pub struct InitializableConfig<C> {
    name: &'static str,
    config: RefCell<Option<Rc<C>>>,
    build: Option<fn() -> ConfigResult<C>>,
}

impl<C> InitializableConfig<C> {
    /// A holder that must be initialized before it is read.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            config: RefCell::new(None),
            build: None,
        }
    }

    /// A holder that runs `build` on first read if nothing was installed.
    #[must_use]
    pub const fn with_builder(name: &'static str, build: fn() -> ConfigResult<C>) -> Self {
        Self {
            name,
            config: RefCell::new(None),
            build: Some(build),
        }
    }

    /// Install `config`, replacing any earlier one. Readers holding the
    /// previous instance keep it.
    pub fn initialize(&self, config: C) -> Rc<C> {
        let config = Rc::new(config);
        let previous = self.config.replace(Some(Rc::clone(&config)));
        debug!(name = self.name, replaced = previous.is_some(), "Config initialized");
        config
    }

    /// Build with `build` and install the result. On error the holder is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// Returns whatever `build` returns.
    pub fn initialize_with(
        &self,
        build: impl FnOnce() -> ConfigResult<C>,
    ) -> ConfigResult<Rc<C>> {
        Ok(self.initialize(build()?))
    }

    /// The installed config, building it first if the holder has a builder.
    ///
    /// # Errors
    ///
    /// Returns a definition error if nothing was installed and there is no
    /// builder, or the builder's error.
    pub fn get(&self) -> ConfigResult<Rc<C>> {
        if let Some(config) = self.config.borrow().as_ref() {
            return Ok(Rc::clone(config));
        }
        match self.build {
            Some(build) => self.initialize_with(build),
            None => Err(ConfigError::definition(format!(
                "initialize() has not been called on {}",
                self.name
            ))),
        }
    }

    /// Whether a config is installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.config.borrow().is_some()
    }

    /// Remove the installed config, returning it.
    pub fn reset(&self) -> Option<Rc<C>> {
        self.config.take()
    }
}

impl<C> fmt::Debug for InitializableConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializableConfig")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .field("lazy", &self.build.is_some())
            .finish()
    }
}
