use std::any::Any;

use fibre_inject::{Config, Dependency, DiError, DiRuntime, Identity, InjectableOptions, Targets};

// --- Test Fixtures ---

fn enabled_runtime() -> DiRuntime {
  DiRuntime::with_config(&Config {
    enabled: Some(true),
    ..Config::default()
  })
}

fn text_og() -> String {
  "<text-og />".to_string()
}
fn text_di() -> String {
  "<text-di />".to_string()
}
fn text_di2() -> String {
  "<text-di2 />".to_string()
}
fn text_di_target() -> String {
  "<text-di-target />".to_string()
}
fn wrapper_og(children: String) -> String {
  format!("<wrapper-og>{}</wrapper-og>", children)
}
fn wrapper_di(children: String) -> String {
  format!("<wrapper-di>{}</wrapper-di>", children)
}

type Text = fn() -> String;
type Wrapper = fn(String) -> String;

const LABEL: Identity = Identity::Named("Label");
const INPUT: Identity = Identity::Named("Input");

/// A tiny component tree: `Label` renders a wrapped text, `Input` a bare text.
struct Tree {
  rt: DiRuntime,
  text: Dependency,
  wrapper: Dependency,
}

impl Tree {
  fn new() -> Self {
    Self {
      rt: enabled_runtime(),
      text: Dependency::function("Text", text_og as Text),
      wrapper: Dependency::function("Wrapper", wrapper_og as Wrapper),
    }
  }

  fn injectable(&self, original: &Dependency, name: &str, f: impl Any + Send + Sync) -> Dependency {
    self
      .rt
      .injectable(original, Dependency::function(name, f), InjectableOptions::new())
      .unwrap()
  }

  fn label(&self) -> String {
    let [wrapper, text] = self.rt.di([&self.wrapper, &self.text], Some(&LABEL));
    let wrapper: Wrapper = *wrapper.downcast::<Wrapper>().unwrap();
    let text: Text = *text.downcast::<Text>().unwrap();
    format!("<label>{}</label>", wrapper(text()))
  }

  fn input(&self) -> String {
    let [text] = self.rt.di([&self.text], Some(&INPUT));
    let text: Text = *text.downcast::<Text>().unwrap();
    format!("<input>{}</input>", text())
  }
}

// --- Tests ---

#[test]
fn test_returns_real_dependencies_without_provider() {
  let tree = Tree::new();
  assert_eq!(tree.label(), "<label><wrapper-og><text-og /></wrapper-og></label>");
  assert_eq!(tree.input(), "<input><text-og /></input>");

  let deps = vec![tree.text.clone(), tree.wrapper.clone()];
  assert_eq!(tree.rt.di_slice(&deps, Some(&LABEL)), deps);
  assert_eq!(tree.rt.di_slice(&deps, None), deps);
}

#[test]
fn test_overrides_all_dependencies_of_same_type() {
  let tree = Tree::new();
  let text = tree.injectable(&tree.text, "TextDi", text_di as Text);
  let scope = tree.rt.provider(vec![text]).mount().unwrap();

  scope.render(|| {
    assert_eq!(tree.label(), "<label><wrapper-og><text-di /></wrapper-og></label>");
    assert_eq!(tree.input(), "<input><text-di /></input>");
  });
  // leaving the scope restores the real dependencies
  assert_eq!(tree.input(), "<input><text-og /></input>");
}

#[test]
fn test_composes_nested_providers() {
  let tree = Tree::new();
  let wrapper = tree.injectable(&tree.wrapper, "WrapperDi", wrapper_di as Wrapper);
  let text = tree.injectable(&tree.text, "TextDi", text_di as Text);

  let outer = tree.rt.provider(vec![wrapper]).mount().unwrap();
  let inner = outer.provider(vec![text]).mount().unwrap();

  inner.render(|| {
    assert_eq!(tree.label(), "<label><wrapper-di><text-di /></wrapper-di></label>");
  });
  outer.render(|| {
    assert_eq!(tree.label(), "<label><wrapper-di><text-og /></wrapper-di></label>");
  });
}

#[test]
fn test_nested_mount_picks_up_current_scope() {
  let tree = Tree::new();
  let wrapper = tree.injectable(&tree.wrapper, "WrapperDi", wrapper_di as Wrapper);
  let text = tree.injectable(&tree.text, "TextDi", text_di as Text);

  let outer = tree.rt.provider(vec![wrapper]).mount().unwrap();
  let inner = outer.render(|| tree.rt.provider(vec![text]).mount().unwrap());
  assert_eq!(inner.parent().map(|p| p.id()), Some(outer.id()));
}

#[test]
fn test_nearest_provider_wins() {
  let tree = Tree::new();
  let outer_text = tree.injectable(&tree.text, "TextDi", text_di as Text);
  let inner_text = tree.injectable(&tree.text, "TextDi2", text_di2 as Text);

  let outer = tree.rt.provider(vec![outer_text]).mount().unwrap();
  let inner = outer.provider(vec![inner_text]).mount().unwrap();

  inner.render(|| assert_eq!(tree.input(), "<input><text-di2 /></input>"));
  outer.render(|| assert_eq!(tree.input(), "<input><text-di /></input>"));
}

#[test]
fn test_chained_override_traces_back_to_original() {
  let tree = Tree::new();
  let first = tree.injectable(&tree.text, "TextDi", text_di as Text);
  // registered against the replacement, not the original
  let second = tree.injectable(&first, "TextDi2", text_di2 as Text);

  assert!(tree.rt.registry().original_of(&second).is(&tree.text));

  let outer = tree.rt.provider(vec![first.clone()]).mount().unwrap();
  let inner = outer.provider(vec![second.clone()]).mount().unwrap();

  // the call site may even hold the outer replacement already
  let resolved = inner.resolve(&[tree.text.clone(), first.clone()], None);
  assert!(resolved[0].is(&second));
  assert!(resolved[1].is(&second));

  let resolved = outer.resolve(&[first.clone()], None);
  assert!(resolved[0].is(&first));
}

#[test]
fn test_only_overrides_dependencies_of_specified_target() {
  let tree = Tree::new();
  let wrapper = tree.injectable(&tree.wrapper, "WrapperDi", wrapper_di as Wrapper);
  let text = tree.injectable(&tree.text, "TextDi", text_di as Text);

  let outer = tree
    .rt
    .provider(vec![wrapper])
    .target(vec![INPUT])
    .mount()
    .unwrap();
  let inner = outer.provider(vec![text]).target(LABEL).mount().unwrap();

  inner.render(|| {
    assert_eq!(tree.label(), "<label><wrapper-og><text-di /></wrapper-og></label>");
    assert_eq!(tree.input(), "<input><text-og /></input>");
  });
}

#[test]
fn test_transparent_scope_passes_through_ancestor_result() {
  let tree = Tree::new();
  let outer_text = tree.injectable(&tree.text, "TextDi", text_di as Text);
  let inner_text = tree.injectable(&tree.text, "TextDi2", text_di2 as Text);

  let outer = tree.rt.provider(vec![outer_text]).mount().unwrap();
  let inner = outer
    .provider(vec![inner_text])
    .target(LABEL)
    .mount()
    .unwrap();

  inner.render(|| {
    // Input is not a target of the inner scope, the outer one still answers
    assert_eq!(tree.input(), "<input><text-di /></input>");
    assert_eq!(tree.label(), "<label><wrapper-og><text-di2 /></wrapper-og></label>");
  });
}

#[test]
fn test_targeted_injectable_outranks_later_untargeted_one() {
  let tree = Tree::new();
  let targeted = tree
    .rt
    .injectable(
      &tree.text,
      Dependency::function("TextDiTarget", text_di_target as Text),
      InjectableOptions::new().target(INPUT),
    )
    .unwrap();
  let untargeted = tree.injectable(&tree.text, "TextDi", text_di as Text);

  let scope = tree.rt.provider(vec![targeted, untargeted]).mount().unwrap();
  scope.render(|| {
    assert_eq!(tree.input(), "<input><text-di-target /></input>");
    assert_eq!(tree.label(), "<label><wrapper-og><text-di /></wrapper-og></label>");
  });
}

#[test]
fn test_latest_untargeted_injectable_wins_within_scope() {
  let tree = Tree::new();
  let first = tree.injectable(&tree.text, "TextDi", text_di as Text);
  let second = tree.injectable(&tree.text, "TextDi2", text_di2 as Text);

  let scope = tree.rt.provider(vec![first, second]).mount().unwrap();
  scope.render(|| assert_eq!(tree.input(), "<input><text-di2 /></input>"));
}

#[test]
fn test_anonymous_caller_skips_targeted_injectables() {
  let tree = Tree::new();
  let targeted = tree
    .rt
    .injectable(
      &tree.text,
      Dependency::function("TextDiTarget", text_di_target as Text),
      InjectableOptions::new().target(INPUT),
    )
    .unwrap();
  let scope = tree.rt.provider(vec![targeted]).mount().unwrap();

  let resolved = scope.resolve(&[tree.text.clone()], None);
  assert!(resolved[0].is(&tree.text));
}

#[test]
fn test_concrete_target_scenario() {
  let rt = enabled_runtime();
  let o1 = Dependency::value("O1", 1);
  let o2 = Dependency::value("O2", 2);
  let comp_a = Dependency::value("CompA", ());
  let comp_b = Dependency::value("CompB", ());

  let r1 = rt
    .injectable(&o1, Dependency::value("R1", 10), InjectableOptions::new())
    .unwrap();
  let r2 = rt
    .injectable(
      &o2,
      Dependency::value("R2", 20),
      InjectableOptions::new().target(&comp_a),
    )
    .unwrap();
  let root = rt.provider(vec![r1.clone(), r2.clone()]).mount().unwrap();

  let [a1, a2] = root.render(|| rt.di([&o1, &o2], Some(&comp_a.identity())));
  assert!(a1.is(&r1));
  assert!(a2.is(&r2));

  let [b1, b2] = root.render(|| rt.di([&o1, &o2], Some(&comp_b.identity())));
  assert!(b1.is(&r1));
  assert!(b2.is(&o2));
}

#[test]
fn test_mount_rejects_non_injectables() {
  let tree = Tree::new();
  let err = tree
    .rt
    .provider(vec![tree.text.clone()])
    .mount()
    .unwrap_err();
  assert_eq!(
    err,
    DiError::NotInjectable {
      name: "Text".to_string()
    }
  );
}

#[test]
fn test_rebuild_mounts_a_new_scope() {
  let tree = Tree::new();
  let first = tree.injectable(&tree.text, "TextDi", text_di as Text);
  let second = tree.injectable(&tree.text, "TextDi2", text_di2 as Text);

  let scope = tree
    .rt
    .provider(vec![first])
    .target(Targets::from(INPUT))
    .mount()
    .unwrap();
  let rebuilt = scope.rebuild(&[second]).unwrap();

  assert_ne!(scope.id(), rebuilt.id());
  scope.render(|| assert_eq!(tree.input(), "<input><text-di /></input>"));
  rebuilt.render(|| {
    assert_eq!(tree.input(), "<input><text-di2 /></input>");
    // the target restriction carried over
    assert_eq!(tree.label(), "<label><wrapper-og><text-og /></wrapper-og></label>");
  });
}

#[test]
fn test_with_di_wraps_component_in_provider() {
  let tree = Tree::new();
  let text = tree.injectable(&tree.text, "TextDi2", text_di2 as Text);
  let outer_text = tree.injectable(&tree.text, "TextDi", text_di as Text);

  let wrapped = tree.rt.with_di(|| tree.input(), &[text], None).unwrap();
  assert_eq!(wrapped.render(), "<input><text-di2 /></input>");

  // closest provider wins even when an outer one replaces the same dependency
  let outer = tree.rt.provider(vec![outer_text]).mount().unwrap();
  outer.render(|| {
    assert_eq!(tree.label(), "<label><wrapper-og><text-di /></wrapper-og></label>");
    assert_eq!(wrapped.render(), "<input><text-di2 /></input>");
  });
}

#[test]
fn test_global_provider_exposes_global_injectables_outside_tree() {
  let rt = enabled_runtime();
  let fetch = Dependency::value("fetch", "fetch-og");
  let process = Dependency::value("process", "process-og");
  let fetch_di = rt
    .injectable(
      &fetch,
      Dependency::value("fetchDi", "fetch-di"),
      InjectableOptions::new().global(true),
    )
    .unwrap();
  let process_di = rt
    .injectable(
      &process,
      Dependency::value("processDi", "process-di"),
      InjectableOptions::new(),
    )
    .unwrap();

  let scope = rt
    .provider(vec![fetch_di.clone(), process_di])
    .global(true)
    .mount()
    .unwrap();

  // outside the tree only the global-capable injectable is visible
  let [f, p] = rt.di([&fetch, &process], None);
  assert!(f.is(&fetch_di));
  assert!(p.is(&process));

  drop(scope);
  let [f] = rt.di([&fetch], None);
  assert!(f.is(&fetch));
}

#[test]
fn test_non_global_provider_does_not_promote() {
  let rt = enabled_runtime();
  let fetch = Dependency::value("fetch", "fetch-og");
  let fetch_di = rt
    .injectable(
      &fetch,
      Dependency::value("fetchDi", "fetch-di"),
      InjectableOptions::new().global(true),
    )
    .unwrap();
  let _scope = rt.provider(vec![fetch_di]).mount().unwrap();

  let [f] = rt.di([&fetch], None);
  assert!(f.is(&fetch));
}

#[test]
fn test_disabled_runtime_passes_through() {
  let rt = DiRuntime::with_config(&Config {
    env: Some("production".to_string()),
    ..Config::default()
  });
  assert!(!rt.is_enabled());

  let text = Dependency::value("Text", "og");
  let text_di = rt
    .injectable(&text, Dependency::value("TextDi", "di"), InjectableOptions::new())
    .unwrap();
  let scope = rt.provider(vec![text_di]).mount().unwrap();

  let [resolved] = scope.render(|| rt.di([&text], Some(&LABEL)));
  assert!(resolved.is(&text));
  // no diagnostics are written on the pass-through path
  assert!(rt.stats().missing().is_empty());
  assert_eq!(rt.stats().used_count(), 0);
}

#[test]
fn test_scopes_of_other_runtimes_are_ignored() {
  let rt = enabled_runtime();
  let other = enabled_runtime();
  let text = Dependency::value("Text", "og");
  let text_di = other
    .injectable(&text, Dependency::value("TextDi", "di"), InjectableOptions::new())
    .unwrap();
  let scope = other.provider(vec![text_di.clone()]).mount().unwrap();

  scope.render(|| {
    let [mine] = rt.di([&text], None);
    assert!(mine.is(&text));
    let [theirs] = other.di([&text], None);
    assert!(theirs.is(&text_di));
  });
}

#[test]
fn test_nearest_scope_of_runtime_found_under_foreign_scope() {
  let rt = enabled_runtime();
  let other = enabled_runtime();
  let text = Dependency::value("Text", "og");
  let mine = rt
    .injectable(&text, Dependency::value("Mine", "mine"), InjectableOptions::new())
    .unwrap();
  let theirs = other
    .injectable(&text, Dependency::value("Theirs", "theirs"), InjectableOptions::new())
    .unwrap();
  let my_scope = rt.provider(vec![mine.clone()]).mount().unwrap();
  let other_scope = other.provider(vec![theirs.clone()]).mount().unwrap();

  my_scope.render(|| {
    other_scope.render(|| {
      let [resolved] = rt.di([&text], None);
      assert!(resolved.is(&mine));
      let [resolved] = other.di([&text], None);
      assert!(resolved.is(&theirs));

      // a nested mount still attaches to this runtime's nearest scope
      let nested = rt.provider(vec![]).mount().unwrap();
      assert_eq!(nested.parent().map(|p| p.id()), Some(my_scope.id()));
    });
  });
}

#[test]
fn test_scope_guards_dropped_out_of_order_leave_their_own_scope() {
  let rt = enabled_runtime();
  let text = Dependency::value("Text", "og");
  let a_di = rt
    .injectable(&text, Dependency::value("A", "a"), InjectableOptions::new())
    .unwrap();
  let b_di = rt
    .injectable(&text, Dependency::value("B", "b"), InjectableOptions::new())
    .unwrap();
  let a = rt.provider(vec![a_di.clone()]).mount().unwrap();
  let b = rt.provider(vec![b_di.clone()]).mount().unwrap();

  let guard_a = a.enter();
  let guard_b = b.enter();
  drop(guard_a);

  // b is still entered, so it stays current
  assert_eq!(fibre_inject::current_scope().map(|s| s.id()), Some(b.id()));
  let [resolved] = rt.di([&text], None);
  assert!(resolved.is(&b_di));

  drop(guard_b);
  assert!(fibre_inject::current_scope().is_none());
  let [resolved] = rt.di([&text], None);
  assert!(resolved.is(&text));
}
