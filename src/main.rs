// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, read the config and hand it to the
//   UI loop.
// - Logs go to stderr so they don't interleave with menu output on stdout.

use protonbridge_cli::{config::Config, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Executor location, timeout and credential file come from
    // `PROTONBRIDGE_*` variables. See `config::Config::from_env`.
    let config = Config::from_env()?;

    // Start the interactive menu. This call blocks until the user exits.
    main_menu(&config)?;
    Ok(())
}
