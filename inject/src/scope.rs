//! Providers and the tree-mode resolution algorithm.
//!
//! A provider mounts a [`Scope`]: an immutable node holding the injectables it
//! was given, an optional caller restriction and a link to the enclosing scope.
//! Resolution walks the chain from the nearest node to the root and the first
//! node contributing an injectable wins.
//!
//! The "current" chain of a thread is whatever scope was most recently entered
//! with [`Scope::enter`] (or [`Scope::render`]) and not yet left.

use crate::dependency::{Dependency, DependencyId, Identity, Targets};
use crate::error::Result;
use crate::registry::InjectableRecord;
use crate::runtime::DiRuntime;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
  // Scopes entered on this thread, innermost last.
  static CURRENT_SCOPES: RefCell<Vec<Scope>> = RefCell::new(Vec::new());
}

/// The innermost scope entered on this thread, if any.
pub fn current_scope() -> Option<Scope> {
  CURRENT_SCOPES.with(|scopes| scopes.borrow().last().cloned())
}

/// The innermost entered scope belonging to `runtime`. Scopes of other runtimes
/// entered above it are skipped.
pub(crate) fn current_scope_for(runtime: &DiRuntime) -> Option<Scope> {
  CURRENT_SCOPES.with(|scopes| {
    scopes
      .borrow()
      .iter()
      .rev()
      .find(|scope| scope.runtime().ptr_eq(runtime))
      .cloned()
  })
}

struct ScopeNode {
  id: u64,
  runtime: DiRuntime,
  own: HashMap<DependencyId, Vec<Arc<InjectableRecord>>>,
  target: Option<Targets>,
  global: bool,
  parent: Option<Scope>,
}

impl ScopeNode {
  /// Picks the injectable this node offers for `original`: records naming the
  /// caller beat untargeted ones, and the latest registered wins a tie.
  fn select(
    &self,
    original: DependencyId,
    caller: Option<&Identity>,
  ) -> Option<&Arc<InjectableRecord>> {
    let candidates = self.own.get(&original)?;
    let mut untargeted = None;
    for record in candidates.iter().rev() {
      if record.targets_caller(caller) {
        return Some(record);
      }
      if untargeted.is_none() && record.targets().is_none() {
        untargeted = Some(record);
      }
    }
    untargeted
  }

  fn admits(&self, caller: Option<&Identity>) -> bool {
    self.target.as_ref().map_or(true, |t| t.admits(caller))
  }
}

impl Drop for ScopeNode {
  fn drop(&mut self) {
    if self.global {
      self.runtime.global_slot().release(self.id);
    }
    tracing::trace!(scope = self.id, "unmounted scope");
  }
}

/// A mounted provider. Clones share the node; dropping the last clone unmounts it.
#[derive(Clone)]
pub struct Scope {
  node: Arc<ScopeNode>,
}

impl Scope {
  fn mount(
    runtime: &DiRuntime,
    parent: Option<Scope>,
    records: Vec<Arc<InjectableRecord>>,
    target: Option<Targets>,
    global: bool,
  ) -> Scope {
    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    let mut own: HashMap<DependencyId, Vec<Arc<InjectableRecord>>> = HashMap::new();
    for record in &records {
      runtime.stats().set(record);
      own
        .entry(record.original().id())
        .or_default()
        .push(record.clone());
    }
    if global {
      let promoted: Vec<_> = records.iter().filter(|r| r.is_global()).cloned().collect();
      runtime.global_slot().promote(id, promoted);
    }
    tracing::debug!(
      scope = id,
      parent = parent.as_ref().map(|p| p.node.id),
      injectables = records.len(),
      targeted = target.is_some(),
      global,
      "mounted scope"
    );
    Scope {
      node: Arc::new(ScopeNode {
        id,
        runtime: runtime.clone(),
        own,
        target,
        global,
        parent,
      }),
    }
  }

  pub fn id(&self) -> u64 {
    self.node.id
  }

  pub fn runtime(&self) -> &DiRuntime {
    &self.node.runtime
  }

  pub fn parent(&self) -> Option<&Scope> {
    self.node.parent.as_ref()
  }

  /// Starts a provider nested directly under this scope.
  pub fn provider(&self, values: Vec<Dependency>) -> ProviderBuilder {
    ProviderBuilder {
      runtime: self.node.runtime.clone(),
      values,
      target: None,
      global: false,
      parent: Parent::Explicit(self.clone()),
    }
  }

  /// Mounts a replacement for this scope with a new set of injectables and the
  /// same parent, target and global flag. This scope is left untouched.
  pub fn rebuild(&self, values: &[Dependency]) -> Result<Scope> {
    let records = self.node.runtime.records_for(values)?;
    Ok(Scope::mount(
      &self.node.runtime,
      self.node.parent.clone(),
      records,
      self.node.target.clone(),
      self.node.global,
    ))
  }

  /// Makes this scope the current one on this thread until the guard drops.
  pub fn enter(&self) -> ScopeGuard {
    CURRENT_SCOPES.with(|scopes| scopes.borrow_mut().push(self.clone()));
    ScopeGuard {
      scope_id: self.node.id,
      _not_send: PhantomData,
    }
  }

  /// Runs `f` with this scope entered.
  pub fn render<R>(&self, f: impl FnOnce() -> R) -> R {
    let _guard = self.enter();
    f()
  }

  /// Resolves each dependency through this scope chain.
  pub fn resolve(&self, deps: &[Dependency], caller: Option<&Identity>) -> Vec<Dependency> {
    deps.iter().map(|dep| self.resolve_one(dep, caller)).collect()
  }

  pub(crate) fn resolve_one(&self, dep: &Dependency, caller: Option<&Identity>) -> Dependency {
    let runtime = &self.node.runtime;
    let original = runtime.registry().original_of(dep);
    let mut node = Some(&self.node);
    while let Some(current) = node {
      // a node restricted to other callers is transparent
      if current.admits(caller) {
        if let Some(record) = current.select(original.id(), caller) {
          runtime.stats().track(record);
          tracing::trace!(
            scope = current.id,
            dependency = %original,
            injectable = %record.display_name(),
            "resolved injectable"
          );
          return record.replacement().clone();
        }
      }
      node = current.parent.as_ref().map(|p| &p.node);
    }
    runtime.stats().track_missing(&original);
    dep.clone()
  }
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("id", &self.node.id)
      .field("injectables", &self.node.own.values().map(Vec::len).sum::<usize>())
      .field("target", &self.node.target)
      .field("global", &self.node.global)
      .field("parent", &self.node.parent.as_ref().map(|p| p.node.id))
      .finish()
  }
}

/// Leaves the scope entered by [`Scope::enter`] when dropped.
#[must_use = "the scope is left as soon as the guard is dropped"]
pub struct ScopeGuard {
  scope_id: u64,
  _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
  fn drop(&mut self) {
    // Remove the entry this guard pushed, even if guards drop out of order.
    CURRENT_SCOPES.with(|scopes| {
      let mut scopes = scopes.borrow_mut();
      if let Some(pos) = scopes.iter().rposition(|s| s.node.id == self.scope_id) {
        scopes.remove(pos);
      }
    });
  }
}

enum Parent {
  Current,
  Explicit(Scope),
}

/// Configures a provider before mounting it.
pub struct ProviderBuilder {
  runtime: DiRuntime,
  values: Vec<Dependency>,
  target: Option<Targets>,
  global: bool,
  parent: Parent,
}

impl ProviderBuilder {
  /// Restricts the whole provider to the given callers.
  pub fn target(mut self, target: impl Into<Targets>) -> Self {
    self.target = Some(target.into());
    self
  }

  /// Also exposes the provider's global-capable injectables to code resolving
  /// outside any scope, for as long as the scope is mounted.
  pub fn global(mut self, global: bool) -> Self {
    self.global = global;
    self
  }

  /// Mounts the provider. Without an explicit parent it nests under the current
  /// scope of this thread, if that scope belongs to the same runtime.
  pub fn mount(self) -> Result<Scope> {
    let records = self.runtime.records_for(&self.values)?;
    let parent = match self.parent {
      Parent::Explicit(scope) => Some(scope),
      Parent::Current => current_scope_for(&self.runtime),
    };
    Ok(Scope::mount(
      &self.runtime,
      parent,
      records,
      self.target,
      self.global,
    ))
  }
}

/// A component wrapped so that every render happens inside its own provider.
pub struct WithDi<F> {
  runtime: DiRuntime,
  records: Vec<Arc<InjectableRecord>>,
  target: Option<Targets>,
  component: F,
}

impl<F> WithDi<F> {
  pub fn render<R>(&self) -> R
  where
    F: Fn() -> R,
  {
    let parent = current_scope_for(&self.runtime);
    let scope = Scope::mount(
      &self.runtime,
      parent,
      self.records.clone(),
      self.target.clone(),
      false,
    );
    scope.render(&self.component)
  }
}

impl DiRuntime {
  /// Starts a provider for `values`, which must all be injectables.
  pub fn provider(&self, values: Vec<Dependency>) -> ProviderBuilder {
    ProviderBuilder {
      runtime: self.clone(),
      values,
      target: None,
      global: false,
      parent: Parent::Current,
    }
  }

  /// Wraps `component` in a provider for `values`.
  pub fn with_di<F>(
    &self,
    component: F,
    values: &[Dependency],
    target: Option<Targets>,
  ) -> Result<WithDi<F>> {
    Ok(WithDi {
      runtime: self.clone(),
      records: self.records_for(values)?,
      target,
      component,
    })
  }
}
