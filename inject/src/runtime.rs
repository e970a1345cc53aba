//! The injection runtime and the process-wide instance.

use crate::config::Config;
use crate::dependency::Dependency;
use crate::error::Result;
use crate::global::GlobalSlot;
use crate::registry::{InjectableOptions, InjectableRecord, Registry};
use crate::stats::Stats;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

// The runtime every rewritten call site talks to, created on first access.
static PROCESS_RUNTIME: Lazy<DiRuntime> = Lazy::new(DiRuntime::new);

struct RuntimeInner {
  enabled: bool,
  registry: Registry,
  stats: Stats,
  global: GlobalSlot,
}

/// Registry, diagnostics and global override slot bundled together.
///
/// A runtime is a cheap handle; clones share state. Most code uses the process
/// instance returned by [`runtime()`], while tests that want isolation construct
/// their own.
#[derive(Clone)]
pub struct DiRuntime {
  inner: Arc<RuntimeInner>,
}

impl DiRuntime {
  /// Creates a runtime following the process configuration.
  pub fn new() -> Self {
    Self::with_config(Config::process())
  }

  pub fn with_config(config: &Config) -> Self {
    let enabled = config.is_enabled();
    tracing::debug!(env = config.current_env(), enabled, "creating injection runtime");
    Self {
      inner: Arc::new(RuntimeInner {
        enabled,
        registry: Registry::new(),
        stats: Stats::new(),
        global: GlobalSlot::new(),
      }),
    }
  }

  /// Whether resolution is active. A disabled runtime passes every dependency
  /// through untouched.
  pub fn is_enabled(&self) -> bool {
    self.inner.enabled
  }

  pub fn registry(&self) -> &Registry {
    &self.inner.registry
  }

  pub fn stats(&self) -> &Stats {
    &self.inner.stats
  }

  pub(crate) fn global_slot(&self) -> &GlobalSlot {
    &self.inner.global
  }

  pub fn ptr_eq(&self, other: &DiRuntime) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  /// Registers `replacement` as an injectable stand-in for `original` and
  /// returns it, ready to be handed to a provider or to global mode.
  #[track_caller]
  pub fn injectable(
    &self,
    original: &Dependency,
    replacement: Dependency,
    options: InjectableOptions,
  ) -> Result<Dependency> {
    let record = self.registry().register(original, replacement, options)?;
    self.stats().mark_unused(&record);
    Ok(record.replacement().clone())
  }

  /// Drops every injectable, clears the diagnostics and deactivates global
  /// overrides. Mounted scopes keep the records they were built with.
  pub fn reset(&self) {
    self.deactivate();
    self.registry().clear();
    self.stats().reset();
    tracing::debug!("reset injection runtime");
  }

  pub(crate) fn records_for(&self, values: &[Dependency]) -> Result<Vec<Arc<InjectableRecord>>> {
    self.registry().records_for(values)
  }
}

impl Default for DiRuntime {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for DiRuntime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DiRuntime")
      .field("enabled", &self.inner.enabled)
      .field("injectables", &self.inner.registry.len())
      .finish()
  }
}

/// The runtime shared by every call site in this process.
pub fn runtime() -> &'static DiRuntime {
  &PROCESS_RUNTIME
}

/// Registers an injectable on the process runtime.
///
/// ```
/// use fibre_inject::{injectable, Dependency, InjectableOptions};
///
/// fn fetch() -> String { "fetch-og".into() }
/// fn fetch_di() -> String { "fetch-di".into() }
///
/// let original = Dependency::function("fetch", fetch as fn() -> String);
/// let replacement = injectable(
///   &original,
///   Dependency::function("fetch_di", fetch_di as fn() -> String),
///   InjectableOptions::new().track(false),
/// )
/// .unwrap();
/// assert_eq!(replacement.name(), "fetch_di");
/// ```
#[track_caller]
pub fn injectable(
  original: &Dependency,
  replacement: Dependency,
  options: InjectableOptions,
) -> Result<Dependency> {
  runtime().injectable(original, replacement, options)
}
