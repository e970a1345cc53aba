//! Public macros for call sites.

/// Resolves the listed dependencies for a call site, returning an array in the
/// same order that can be destructured back onto local names.
///
/// `di!(caller; a, b)` passes `caller` (anything convertible into an
/// [`Identity`](crate::Identity)) for target matching; `di!(a, b)` resolves
/// anonymously, so only untargeted injectables apply.
///
/// # Examples
///
/// ```
/// use fibre_inject::{di, Dependency, DiRuntime, InjectableOptions};
/// use once_cell::sync::Lazy;
///
/// fn process(v: &str) -> String { format!("{v} process") }
///
/// static PROCESS: Lazy<Dependency> =
///   Lazy::new(|| Dependency::function("process", process as fn(&str) -> String));
///
/// fn transformer(data: &str) -> String {
///   let [process] = di!("transformer"; PROCESS);
///   let process = process.get::<fn(&str) -> String>().unwrap();
///   (*process)(data)
/// }
///
/// // No provider and nothing active: the real dependency is used.
/// assert_eq!(transformer("data"), "data process");
/// ```
#[macro_export]
macro_rules! di {
  ($caller:expr; $($dep:expr),+ $(,)?) => {
    $crate::di(
      [$(&$dep),+],
      ::core::option::Option::Some(&$crate::Identity::from($caller)),
    )
  };
  ($($dep:expr),+ $(,)?) => {
    $crate::di([$(&$dep),+], ::core::option::Option::None)
  };
}
