//! # Fibre Inject
//!
//! Scope-propagated dependency substitution. Call sites declare which of their
//! dependencies are overridable; providers higher up the component tree, or a
//! global override slot, supply replacements without touching the call site.
//!
//! ## Core Concepts
//!
//! - **Dependency**: a handle with identity wrapping a function or value.
//! - **Injectable**: a replacement registered against an original with
//!   [`injectable`] or [`DiRuntime::injectable`], optionally restricted to some
//!   callers.
//! - **Scope**: a mounted provider. Scopes nest; the nearest scope offering an
//!   injectable for a dependency wins.
//! - **Global mode**: a single override slot for code running outside any scope,
//!   activated for the duration of [`DiRuntime::run_scoped`].
//! - **Stats**: which injectables were never used and which dependencies had no
//!   injectable, for test assertions.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_inject::{di, Dependency, DiRuntime, Identity, InjectableOptions};
//!
//! let rt = DiRuntime::new();
//! let text = Dependency::value("Text", "text-og");
//! let text_di = rt
//!   .injectable(&text, Dependency::value("TextDi", "text-di"), InjectableOptions::new())
//!   .unwrap();
//!
//! let scope = rt.provider(vec![text_di.clone()]).mount().unwrap();
//! let label = Identity::Named("Label");
//! let [resolved] = scope.render(|| rt.di([&text], Some(&label)));
//!
//! if rt.is_enabled() {
//!   assert!(resolved.is(&text_di));
//!   assert!(rt.stats().unused().is_empty());
//! }
//! ```

mod config;
mod consumer;
mod dependency;
mod error;
mod global;
mod macros;
mod registry;
mod runtime;
mod scope;
mod stats;

pub use config::{Config, ENABLED_VAR, ENV_VAR};
pub use consumer::di;
pub use dependency::{Dependency, DependencyId, Identity, Implementation, Payload, Targets};
pub use error::{DiError, Diagnostic, Result};
pub use global::GlobalOverrideGuard;
pub use registry::{InjectableOptions, InjectableRecord, Registry};
pub use runtime::{injectable, runtime, DiRuntime};
pub use scope::{current_scope, ProviderBuilder, Scope, ScopeGuard, WithDi};
pub use stats::{MissingDependency, Stats, UnusedInjectable};
