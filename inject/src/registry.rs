//! The registry of injectables: replacement identity → record.

use crate::dependency::{Dependency, DependencyId, Identity, Targets};
use crate::error::{DiError, Result};
use dashmap::DashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static WARNED_SHARED_REPLACEMENT: AtomicBool = AtomicBool::new(false);

/// Options accepted when registering an injectable.
#[derive(Debug, Clone)]
pub struct InjectableOptions {
  pub(crate) display_name: Option<String>,
  pub(crate) target: Option<Targets>,
  pub(crate) track: bool,
  pub(crate) global: bool,
}

impl Default for InjectableOptions {
  fn default() -> Self {
    Self {
      display_name: None,
      target: None,
      track: true,
      global: false,
    }
  }
}

impl InjectableOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn display_name(mut self, name: impl Into<String>) -> Self {
    self.display_name = Some(name.into());
    self
  }

  /// Restricts the replacement to the given callers.
  pub fn target(mut self, target: impl Into<Targets>) -> Self {
    self.target = Some(target.into());
    self
  }

  /// Whether the stats tracker should report this injectable when unused.
  pub fn track(mut self, track: bool) -> Self {
    self.track = track;
    self
  }

  /// Whether a provider with `global(true)` may promote this injectable.
  pub fn global(mut self, global: bool) -> Self {
    self.global = global;
    self
  }
}

/// Metadata linking a replacement to the dependency it stands in for.
#[derive(Debug)]
pub struct InjectableRecord {
  replacement: Dependency,
  original: Dependency,
  targets: Option<Targets>,
  track: bool,
  global: bool,
  display_name: String,
  origin: &'static Location<'static>,
}

impl InjectableRecord {
  pub fn replacement(&self) -> &Dependency {
    &self.replacement
  }

  /// The true original this record replaces.
  pub fn original(&self) -> &Dependency {
    &self.original
  }

  pub fn targets(&self) -> Option<&Targets> {
    self.targets.as_ref()
  }

  pub fn is_tracked(&self) -> bool {
    self.track
  }

  pub fn is_global(&self) -> bool {
    self.global
  }

  pub fn display_name(&self) -> &str {
    &self.display_name
  }

  /// Where `injectable()` was called for this record.
  pub fn origin(&self) -> &'static Location<'static> {
    self.origin
  }

  /// Whether the record names `caller` explicitly in its targets.
  pub(crate) fn targets_caller(&self, caller: Option<&Identity>) -> bool {
    self.targets.as_ref().map_or(false, |t| t.admits(caller))
  }
}

/// Thread-safe store of every registered injectable.
#[derive(Default)]
pub struct Registry {
  records: DashMap<DependencyId, Arc<InjectableRecord>>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `replacement` as a stand-in for `original`.
  ///
  /// When `original` is itself a registered replacement, the record is keyed on
  /// the dependency that one replaces, so chained overrides share one original.
  #[track_caller]
  pub fn register(
    &self,
    original: &Dependency,
    replacement: Dependency,
    options: InjectableOptions,
  ) -> Result<Arc<InjectableRecord>> {
    let origin = Location::caller();
    let original = self.original_of(original);
    if replacement.is(&original) {
      return Err(DiError::SelfInjection {
        name: replacement.name().to_owned(),
      });
    }

    let display_name = options
      .display_name
      .or_else(|| (!replacement.name().is_empty()).then(|| replacement.name().to_owned()))
      .unwrap_or_else(|| format!("di({})", original.name()));

    if let Some(existing) = self.lookup(&replacement) {
      if !existing.original.is(&original) {
        warn_shared_replacement(&display_name);
      }
    }

    let record = Arc::new(InjectableRecord {
      replacement: replacement.clone(),
      original,
      targets: options.target,
      track: options.track,
      global: options.global,
      display_name,
      origin,
    });
    tracing::debug!(
      injectable = %record.display_name,
      original = %record.original,
      track = record.track,
      global = record.global,
      "registered injectable"
    );
    self.records.insert(replacement.id(), record.clone());
    Ok(record)
  }

  pub fn lookup(&self, value: &Dependency) -> Option<Arc<InjectableRecord>> {
    self.records.get(&value.id()).map(|r| r.value().clone())
  }

  pub fn is_registered(&self, value: &Dependency) -> bool {
    self.records.contains_key(&value.id())
  }

  /// Dereferences a replacement to the dependency it replaces. Anything that is
  /// not a registered replacement is returned as is.
  pub fn original_of(&self, dep: &Dependency) -> Dependency {
    match self.records.get(&dep.id()) {
      Some(record) => record.original.clone(),
      None => dep.clone(),
    }
  }

  /// Looks up every value, failing on the first one that is not an injectable.
  pub(crate) fn records_for(&self, values: &[Dependency]) -> Result<Vec<Arc<InjectableRecord>>> {
    values
      .iter()
      .map(|v| {
        self.lookup(v).ok_or_else(|| DiError::NotInjectable {
          name: v.name().to_owned(),
        })
      })
      .collect()
  }

  /// Forgets every registered injectable. Values created before the call are
  /// no longer injectables afterwards.
  pub fn clear(&self) {
    self.records.clear();
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

fn warn_shared_replacement(name: &str) {
  if !WARNED_SHARED_REPLACEMENT.swap(true, Ordering::Relaxed) {
    tracing::warn!(
      "You are trying to use replacement \"{}\" on multiple injectables. \
       That will override only the last dependency, as each replacement is uniquely linked.",
      name
    );
  }
}
