use std::panic::Location;
use thiserror::Error;

/// Usage errors raised by the injection runtime.
///
/// These always indicate a programming mistake at the call site and are returned
/// immediately; the runtime never retries or recovers from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
  #[error("global overrides are already active; call deactivate() before activating again")]
  AlreadyActive,

  #[error("\"{name}\" is not an injectable; create it with injectable() before using it")]
  NotInjectable { name: String },

  #[error("cannot inject \"{name}\" as a replacement for itself")]
  SelfInjection { name: String },

  #[error("dependency \"{name}\" does not hold a value of type {expected}")]
  TypeMismatch { name: String, expected: &'static str },
}

/// A specialized `Result` type for `fibre_inject` operations.
pub type Result<T, E = DiError> = std::result::Result<T, E>;

/// A queryable report about an injectable or dependency, produced by the stats
/// tracker. Never raised automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
  #[error(
    "Unused \"di\" injectable: {name}. Created at {origin} but never resolved. \
     If this is on purpose, register it with track(false)"
  )]
  Unused {
    name: String,
    origin: &'static Location<'static>,
  },

  #[error("Missing \"di\" injectable for dependency: {name}")]
  Missing { name: String },
}
