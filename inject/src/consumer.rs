//! The call-site entry point.

use crate::dependency::{Dependency, Identity};
use crate::runtime::{runtime, DiRuntime};
use crate::scope::{current_scope, current_scope_for};

impl DiRuntime {
  /// Resolves the dependencies a call site uses, in order.
  ///
  /// Inside an entered scope of this runtime the scope chain answers; anywhere
  /// else the global override slot does. A disabled runtime returns its input.
  pub fn di<const N: usize>(
    &self,
    deps: [&Dependency; N],
    caller: Option<&Identity>,
  ) -> [Dependency; N] {
    if !self.is_enabled() {
      return deps.map(Dependency::clone);
    }
    match current_scope_for(self) {
      Some(scope) => deps.map(|dep| scope.resolve_one(dep, caller)),
      None => deps.map(|dep| self.resolve_global_one(dep)),
    }
  }

  /// Slice form of [`di`](Self::di) for call sites with a dynamic list.
  pub fn di_slice(&self, deps: &[Dependency], caller: Option<&Identity>) -> Vec<Dependency> {
    if !self.is_enabled() {
      return deps.to_vec();
    }
    match current_scope_for(self) {
      Some(scope) => scope.resolve(deps, caller),
      None => self.resolve_global(deps),
    }
  }
}

/// Resolves dependencies through the runtime of the current scope, or the
/// process runtime outside any scope.
///
/// This is what the [`di!`](crate::di!) macro expands to.
pub fn di<const N: usize>(deps: [&Dependency; N], caller: Option<&Identity>) -> [Dependency; N] {
  match current_scope() {
    Some(scope) => scope.runtime().di(deps, caller),
    None => runtime().di(deps, caller),
  }
}
