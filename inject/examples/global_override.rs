use fibre_inject::{di, injectable, runtime, Dependency, InjectableOptions};
use once_cell::sync::Lazy;

type Fetch = fn() -> String;
type Process = fn(&str) -> String;

fn fetch_api() -> String {
  "fetch".to_string()
}
fn process_api_data(v: &str) -> String {
  format!("{} process", v)
}

static FETCH_API: Lazy<Dependency> =
  Lazy::new(|| Dependency::function("fetch_api", fetch_api as Fetch));
static PROCESS_API_DATA: Lazy<Dependency> =
  Lazy::new(|| Dependency::function("process_api_data", process_api_data as Process));

fn transformer(data: &str) -> String {
  let [process] = di!("transformer"; PROCESS_API_DATA);
  let process: Process = *process.downcast::<Process>().unwrap();
  process(data)
}

async fn api_handler() -> String {
  let [fetch] = di!("api_handler"; FETCH_API);
  let fetch: Fetch = *fetch.downcast::<Fetch>().unwrap();
  let data = fetch();
  tokio::task::yield_now().await;
  transformer(&data)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter("fibre_inject=debug")
    .init();

  let fetch_di = injectable(
    &FETCH_API,
    Dependency::function("fetch_api_di", (|| "fetch-di".to_string()) as Fetch),
    InjectableOptions::new(),
  )
  .unwrap();
  let process_di = injectable(
    &PROCESS_API_DATA,
    Dependency::function("process_api_data_di", (|v: &str| format!("{} process-di", v)) as Process),
    InjectableOptions::new(),
  )
  .unwrap();

  println!("real:       {}", api_handler().await);

  let sync = runtime()
    .run_scoped(&[process_di.clone()], || transformer("data"))
    .unwrap();
  println!("sync mock:  {}", sync);

  let overridden = runtime()
    .run_scoped_async(&[fetch_di, process_di], api_handler)
    .unwrap()
    .await;
  println!("async mock: {}", overridden);
  println!("released:   {}", !runtime().is_active());

  runtime().stats().log_report();
}
