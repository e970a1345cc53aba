//! Tree-independent overrides for plain function calls.
//!
//! Global mode is a single slot: one activation at a time, visible to every call
//! site resolving through the runtime until it is released. It is not safe for
//! overlapping unrelated callers; wrap each use in [`DiRuntime::run_scoped`] or
//! [`DiRuntime::run_scoped_async`] so the slot is always released.

use crate::dependency::{Dependency, DependencyId};
use crate::error::{DiError, Result};
use crate::registry::InjectableRecord;
use crate::runtime::DiRuntime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Default)]
struct GlobalState {
  active: HashMap<DependencyId, Arc<InjectableRecord>>,
  // (scope id, records) in mount order
  promoted: Vec<(u64, Vec<Arc<InjectableRecord>>)>,
}

#[derive(Default)]
pub(crate) struct GlobalSlot {
  state: Mutex<GlobalState>,
}

impl GlobalSlot {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  fn lookup(&self, original: DependencyId) -> Option<Arc<InjectableRecord>> {
    let state = self.state.lock();
    if let Some(record) = state.active.get(&original) {
      return Some(record.clone());
    }
    state.promoted.iter().rev().find_map(|(_, records)| {
      records
        .iter()
        .rev()
        .find(|r| r.original().id() == original)
        .cloned()
    })
  }

  pub(crate) fn promote(&self, scope_id: u64, records: Vec<Arc<InjectableRecord>>) {
    if records.is_empty() {
      return;
    }
    self.state.lock().promoted.push((scope_id, records));
  }

  pub(crate) fn release(&self, scope_id: u64) {
    self.state.lock().promoted.retain(|(id, _)| *id != scope_id);
  }
}

/// Releases the global slot when dropped.
#[must_use = "dropping the guard deactivates the overrides immediately"]
pub struct GlobalOverrideGuard {
  runtime: DiRuntime,
}

impl Drop for GlobalOverrideGuard {
  fn drop(&mut self) {
    self.runtime.deactivate();
  }
}

impl DiRuntime {
  /// Activates `values` as global overrides.
  ///
  /// Fails if an activation is already in flight, or if any value was not
  /// created with `injectable()`. Nothing is activated on failure.
  pub fn activate(&self, values: &[Dependency]) -> Result<()> {
    let mut state = self.global_slot().state.lock();
    if !state.active.is_empty() {
      return Err(DiError::AlreadyActive);
    }
    let records = self.records_for(values)?;
    for record in records {
      self.stats().set(&record);
      state.active.insert(record.original().id(), record);
    }
    tracing::debug!(count = state.active.len(), "activated global overrides");
    Ok(())
  }

  /// Clears the active overrides. Calling it with nothing active is a no-op.
  pub fn deactivate(&self) {
    let mut state = self.global_slot().state.lock();
    if !state.active.is_empty() {
      tracing::debug!(count = state.active.len(), "deactivated global overrides");
      state.active.clear();
    }
  }

  pub fn is_active(&self) -> bool {
    !self.global_slot().state.lock().active.is_empty()
  }

  /// Activates `values` and returns a guard that deactivates on drop.
  pub fn activate_guarded(&self, values: &[Dependency]) -> Result<GlobalOverrideGuard> {
    self.activate(values)?;
    Ok(GlobalOverrideGuard {
      runtime: self.clone(),
    })
  }

  /// Resolves each dependency against the global slot, ignoring any scope.
  pub fn resolve_global(&self, deps: &[Dependency]) -> Vec<Dependency> {
    deps.iter().map(|dep| self.resolve_global_one(dep)).collect()
  }

  pub(crate) fn resolve_global_one(&self, dep: &Dependency) -> Dependency {
    let original = self.registry().original_of(dep);
    match self.global_slot().lookup(original.id()) {
      Some(record) => {
        self.stats().track(&record);
        tracing::trace!(
          dependency = %original,
          injectable = %record.display_name(),
          "resolved global override"
        );
        record.replacement().clone()
      }
      None => dep.clone(),
    }
  }

  /// Runs `thunk` with `values` active as global overrides, releasing them on
  /// every exit path, unwinding included.
  ///
  /// ```
  /// use fibre_inject::{di, DiRuntime, Dependency, InjectableOptions};
  ///
  /// let rt = DiRuntime::new();
  /// let original = Dependency::value("greeting", "hello");
  /// let mocked = rt
  ///   .injectable(&original, Dependency::value("greeting_di", "hi"), InjectableOptions::new())
  ///   .unwrap();
  ///
  /// let seen = rt
  ///   .run_scoped(&[mocked], || {
  ///     let [greeting] = rt.di([&original], None);
  ///     *greeting.get::<&str>().unwrap()
  ///   })
  ///   .unwrap();
  /// # if rt.is_enabled() {
  /// assert_eq!(seen, "hi");
  /// # }
  /// assert!(!rt.is_active());
  /// ```
  pub fn run_scoped<T>(&self, values: &[Dependency], thunk: impl FnOnce() -> T) -> Result<T> {
    let _guard = self.activate_guarded(values)?;
    Ok(thunk())
  }

  /// Async counterpart of [`run_scoped`](Self::run_scoped).
  ///
  /// Activation and the call to `thunk` happen immediately, so usage errors
  /// surface before anything is awaited. The overrides stay active until the
  /// returned future completes, whatever its output, or is dropped.
  pub fn run_scoped_async<F, Fut>(
    &self,
    values: &[Dependency],
    thunk: F,
  ) -> Result<impl Future<Output = Fut::Output>>
  where
    F: FnOnce() -> Fut,
    Fut: Future,
  {
    let guard = self.activate_guarded(values)?;
    let future = thunk();
    Ok(async move {
      let _guard = guard;
      future.await
    })
  }
}
