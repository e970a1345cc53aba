//! Dependency handles, caller identities and target sets.

use crate::error::{DiError, Result};
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_DEPENDENCY_ID: AtomicU64 = AtomicU64::new(1);

/// Type-erased payload carried by a dependency.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// What a dependency holds.
#[derive(Clone)]
pub enum Implementation {
  /// A callable, typically a `fn` pointer or an `Arc<dyn Fn(..) + Send + Sync>`.
  Function(Payload),
  /// A plain value.
  Value(Payload),
}

impl Implementation {
  fn payload(&self) -> &Payload {
    match self {
      Implementation::Function(p) | Implementation::Value(p) => p,
    }
  }
}

impl fmt::Debug for Implementation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Implementation::Function(_) => write!(f, "Function(..)"),
      Implementation::Value(_) => write!(f, "Value(..)"),
    }
  }
}

struct DependencyInner {
  id: u64,
  name: String,
  implementation: Implementation,
}

/// Stable identity of a dependency handle, usable as a map key. Never reused
/// within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyId(u64);

/// A handle to something a call site depends on, or to a replacement for it.
///
/// Cloning is cheap and keeps the identity: two handles are the same dependency
/// iff they were cloned from the same constructor call.
#[derive(Clone)]
pub struct Dependency {
  inner: Arc<DependencyInner>,
}

impl Dependency {
  /// Creates a callable dependency.
  ///
  /// ```
  /// use fibre_inject::Dependency;
  ///
  /// fn double(v: i32) -> i32 { v * 2 }
  ///
  /// let dep = Dependency::function("double", double as fn(i32) -> i32);
  /// let f = *dep.get::<fn(i32) -> i32>().unwrap();
  /// assert_eq!(f(21), 42);
  /// ```
  pub fn function<F: Any + Send + Sync>(name: impl Into<String>, f: F) -> Self {
    Self::from_implementation(name, Implementation::Function(Arc::new(f)))
  }

  /// Creates a value dependency.
  pub fn value<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
    Self::from_implementation(name, Implementation::Value(Arc::new(value)))
  }

  pub fn from_implementation(name: impl Into<String>, implementation: Implementation) -> Self {
    Self {
      inner: Arc::new(DependencyInner {
        id: NEXT_DEPENDENCY_ID.fetch_add(1, Ordering::Relaxed),
        name: name.into(),
        implementation,
      }),
    }
  }

  pub fn id(&self) -> DependencyId {
    DependencyId(self.inner.id)
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn implementation(&self) -> &Implementation {
    &self.inner.implementation
  }

  pub fn is_function(&self) -> bool {
    matches!(self.inner.implementation, Implementation::Function(_))
  }

  /// Returns `true` if both handles refer to the same dependency.
  pub fn is(&self, other: &Dependency) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  /// The identity this dependency has when it acts as a caller.
  pub fn identity(&self) -> Identity {
    Identity::Dependency(self.id())
  }

  /// Returns the payload as `T`, if it holds one.
  pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.inner.implementation.payload().clone().downcast::<T>().ok()
  }

  /// Like [`get`](Self::get), but reports a typed error on mismatch.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
    self.get::<T>().ok_or_else(|| DiError::TypeMismatch {
      name: self.name().to_owned(),
      expected: type_name::<T>(),
    })
  }
}

impl PartialEq for Dependency {
  fn eq(&self, other: &Self) -> bool {
    self.is(other)
  }
}

impl Eq for Dependency {}

impl fmt::Debug for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dependency")
      .field("name", &self.inner.name)
      .field("implementation", &self.inner.implementation)
      .finish()
  }
}

impl fmt::Display for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.inner.name)
  }
}

/// Identifies the component or function requesting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
  Dependency(DependencyId),
  Named(&'static str),
}

impl From<&Dependency> for Identity {
  fn from(dep: &Dependency) -> Self {
    dep.identity()
  }
}

impl From<&'static str> for Identity {
  fn from(name: &'static str) -> Self {
    Identity::Named(name)
  }
}

impl From<&Identity> for Identity {
  fn from(identity: &Identity) -> Self {
    identity.clone()
  }
}

/// A normalized set of caller identities a replacement or scope is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets(HashSet<Identity>);

impl Targets {
  pub fn contains(&self, identity: &Identity) -> bool {
    self.0.contains(identity)
  }

  /// Whether a caller passes this restriction. Anonymous callers never do.
  pub(crate) fn admits(&self, caller: Option<&Identity>) -> bool {
    caller.map_or(false, |c| self.contains(c))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<Identity> for Targets {
  fn from(identity: Identity) -> Self {
    Targets(HashSet::from([identity]))
  }
}

impl From<&Dependency> for Targets {
  fn from(dep: &Dependency) -> Self {
    Targets::from(dep.identity())
  }
}

impl From<&'static str> for Targets {
  fn from(name: &'static str) -> Self {
    Targets::from(Identity::Named(name))
  }
}

impl From<Vec<Identity>> for Targets {
  fn from(identities: Vec<Identity>) -> Self {
    Targets(identities.into_iter().collect())
  }
}

impl<const N: usize> From<[Identity; N]> for Targets {
  fn from(identities: [Identity; N]) -> Self {
    Targets(identities.into_iter().collect())
  }
}

impl FromIterator<Identity> for Targets {
  fn from_iter<I: IntoIterator<Item = Identity>>(iter: I) -> Self {
    Targets(iter.into_iter().collect())
  }
}
