use std::process::ExitCode;

use opctl::cli::{Runtime, entrypoint};
use opctl::env::{ProcessEnv, proxy_from_env};
use opctl::logging;
use opctl::output::Output;

// `Output` drops write errors, so a closed pipe (`opctl --help | head`) exits quietly.
fn main() -> ExitCode {
    let log = logging::init(logging::level_from_env(&ProcessEnv));
    if let Some(proxy) = proxy_from_env(&ProcessEnv) {
        tracing::info!(
            "Proxy environment variables detected. We'll use your proxy for fetch requests: {proxy}"
        );
    }

    let output = Output::stdio();
    let rt = Runtime::from_env(output.clone(), log);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            output.error(&format!("failed to start async runtime: {err}"));
            return ExitCode::FAILURE;
        }
    };

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let outcome = runtime.block_on(entrypoint::main(argv, &rt));
    ExitCode::from(u8::try_from(outcome.exit_code).unwrap_or(1))
}
