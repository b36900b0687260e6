mod calc;
mod config;
mod flows;
mod gateway;
mod ipc;
mod model;
mod store;

use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    config::init_logging()?;
    let cfg = config::Config::from_env();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        gateway = ?cfg.gateway_url,
        "rosterd starting"
    );

    let mut state = ipc::AppState::new(&cfg);
    if state.gateway.endpoint().is_some() {
        // Failure is kept in the store's error field for the shell to show.
        let _ = state.store.refresh(&state.gateway);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => ipc::bad_json(e.to_string()),
        };
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }

    tracing::info!("rosterd exiting");
    Ok(())
}
