use std::io;

use chat_session::config::{shell_config_from_env, LOG_FILTER_ENV_VAR};
use chat_session::shell::Shell;
use chat_session::transports;
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env(LOG_FILTER_ENV_VAR))
        .with_writer(io::stderr)
        .init();

    let config = shell_config_from_env().map_err(io::Error::other)?;
    let transport = transports::transport_for_config(&config).map_err(io::Error::other)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut shell = Shell::new(transport, config.startup_identity);
    shell.run(stdin.lock(), stdout.lock())
}
