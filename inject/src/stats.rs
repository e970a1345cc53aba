//! Usage diagnostics for injectables.
//!
//! The tracker answers two questions test suites care about: which injectables
//! were set up but never resolved, and which dependencies were requested inside a
//! provider without any injectable standing in for them.

use crate::dependency::{Dependency, DependencyId};
use crate::error::Diagnostic;
use crate::registry::InjectableRecord;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Default)]
struct StatsState {
  unused: IndexMap<DependencyId, Arc<InjectableRecord>>,
  used: HashSet<DependencyId>,
  missing: IndexMap<DependencyId, Dependency>,
  satisfied: HashSet<DependencyId>,
}

/// An injectable that has not been resolved since it was set up.
#[derive(Debug, Clone)]
pub struct UnusedInjectable {
  record: Arc<InjectableRecord>,
}

impl UnusedInjectable {
  /// The replacement value.
  pub fn get(&self) -> Dependency {
    self.record.replacement().clone()
  }

  pub fn record(&self) -> &Arc<InjectableRecord> {
    &self.record
  }

  pub fn error(&self) -> Diagnostic {
    Diagnostic::Unused {
      name: self.record.display_name().to_owned(),
      origin: self.record.origin(),
    }
  }
}

/// A dependency resolved inside a provider with no injectable for it.
#[derive(Debug, Clone)]
pub struct MissingDependency {
  dependency: Dependency,
}

impl MissingDependency {
  /// The original dependency.
  pub fn get(&self) -> Dependency {
    self.dependency.clone()
  }

  pub fn error(&self) -> Diagnostic {
    Diagnostic::Missing {
      name: self.dependency.name().to_owned(),
    }
  }
}

/// Thread-safe usage tracker.
#[derive(Default)]
pub struct Stats {
  state: Mutex<StatsState>,
}

impl Stats {
  pub fn new() -> Self {
    Self::default()
  }

  /// Marks a freshly registered record as unused.
  pub(crate) fn mark_unused(&self, record: &Arc<InjectableRecord>) {
    if !record.is_tracked() {
      return;
    }
    let key = record.replacement().id();
    let mut state = self.state.lock();
    if !state.used.contains(&key) {
      state.unused.insert(key, record.clone());
    }
  }

  /// Puts a record into play (provider mount or global activation).
  ///
  /// A newer injectable for the same original takes over the "unused" slot of
  /// older ones, so overriding an injectable does not flag the overridden one.
  pub(crate) fn set(&self, record: &Arc<InjectableRecord>) {
    if !record.is_tracked() {
      return;
    }
    let key = record.replacement().id();
    let mut state = self.state.lock();
    state
      .unused
      .retain(|id, other| *id == key || !other.original().is(record.original()));
    state.unused.insert(key, record.clone());
  }

  /// Records a successful resolution through `record`.
  pub(crate) fn track(&self, record: &Arc<InjectableRecord>) {
    let key = record.replacement().id();
    let original = record.original().id();
    let mut state = self.state.lock();
    state.unused.shift_remove(&key);
    state.used.insert(key);
    state.missing.shift_remove(&original);
    state.satisfied.insert(original);
  }

  /// Records a resolution of `original` that no injectable answered.
  pub(crate) fn track_missing(&self, original: &Dependency) {
    let key = original.id();
    let mut state = self.state.lock();
    if !state.satisfied.contains(&key) {
      state.missing.entry(key).or_insert_with(|| original.clone());
    }
  }

  /// Injectables set up but never resolved, in the order they were set up.
  pub fn unused(&self) -> Vec<UnusedInjectable> {
    self
      .state
      .lock()
      .unused
      .values()
      .map(|record| UnusedInjectable {
        record: record.clone(),
      })
      .collect()
  }

  /// Dependencies requested inside providers with no injectable, in request order.
  pub fn missing(&self) -> Vec<MissingDependency> {
    self
      .state
      .lock()
      .missing
      .values()
      .map(|dependency| MissingDependency {
        dependency: dependency.clone(),
      })
      .collect()
  }

  pub fn used_count(&self) -> usize {
    self.state.lock().used.len()
  }

  pub fn is_used(&self, replacement: &Dependency) -> bool {
    self.state.lock().used.contains(&replacement.id())
  }

  pub fn reset(&self) {
    *self.state.lock() = StatsState::default();
  }

  /// Renders a human-readable summary of the current diagnostics.
  pub fn report(&self) -> String {
    let unused = self.unused();
    let missing = self.missing();
    let mut out = String::from("--- Fibre Inject Stats Report ---\n");
    let _ = writeln!(out, "[Used] {} injectable(s)", self.used_count());
    if unused.is_empty() {
      out.push_str("[Unused] none\n");
    } else {
      let _ = writeln!(out, "[Unused] {} injectable(s):", unused.len());
      for entry in &unused {
        let _ = writeln!(out, "  {}", entry.error());
      }
    }
    if missing.is_empty() {
      out.push_str("[Missing] none\n");
    } else {
      let _ = writeln!(out, "[Missing] {} dependency(ies):", missing.len());
      for entry in &missing {
        let _ = writeln!(out, "  {}", entry.error());
      }
    }
    out.push_str("--- End of Stats Report ---");
    out
  }

  /// Emits [`report`](Self::report) through `tracing`.
  pub fn log_report(&self) {
    let unused = self.unused();
    let missing = self.missing();
    if unused.is_empty() && missing.is_empty() {
      tracing::info!(target: "fibre_inject::stats", "{}", self.report());
    } else {
      tracing::warn!(target: "fibre_inject::stats", "{}", self.report());
    }
  }
}
