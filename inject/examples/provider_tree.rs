use fibre_inject::{di, injectable, runtime, Dependency, Identity, InjectableOptions};
use once_cell::sync::Lazy;

type Render = fn() -> String;
type Wrap = fn(String) -> String;

fn text() -> String {
  "<text />".to_string()
}
fn wrapper(children: String) -> String {
  format!("<wrapper>{}</wrapper>", children)
}

static TEXT: Lazy<Dependency> = Lazy::new(|| Dependency::function("Text", text as Render));
static WRAPPER: Lazy<Dependency> = Lazy::new(|| Dependency::function("Wrapper", wrapper as Wrap));

// A component resolving its dependencies the way a rewritten call site does.
fn label() -> String {
  let [wrapper, text] = di!("Label"; WRAPPER, TEXT);
  let wrapper: Wrap = *wrapper.downcast::<Wrap>().unwrap();
  let text: Render = *text.downcast::<Render>().unwrap();
  format!("<label>{}</label>", wrapper(text()))
}

fn input() -> String {
  let [text] = di!("Input"; TEXT);
  let text: Render = *text.downcast::<Render>().unwrap();
  format!("<input>{}</input>", text())
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter("fibre_inject=debug")
    .init();

  let text_di = injectable(
    &TEXT,
    Dependency::function("TextDi", (|| "<text-di />".to_string()) as Render),
    InjectableOptions::new(),
  )
  .unwrap();
  let wrapper_di = injectable(
    &WRAPPER,
    Dependency::function(
      "WrapperDi",
      (|children: String| format!("<wrapper-di>{}</wrapper-di>", children)) as Wrap,
    ),
    InjectableOptions::new().target(Identity::Named("Input")),
  )
  .unwrap();

  println!("--- Without providers ---");
  println!("{}", label());
  println!("{}", input());

  let outer = runtime().provider(vec![wrapper_di]).mount().unwrap();
  let inner = outer.provider(vec![text_di]).target("Label").mount().unwrap();

  println!("--- Inside providers ---");
  inner.render(|| {
    println!("{}", label());
    println!("{}", input());
  });

  runtime().stats().log_report();
  println!("{}", runtime().stats().report());
}
