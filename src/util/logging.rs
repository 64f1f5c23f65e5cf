use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

const DEFAULT_FILTER: &str = "quote_along=info,warn";
const VERBOSE_FILTER: &str = "quote_along=debug,warn";

/// Initialize the logging system with env_logger.
///
/// If `log_file` is provided, logs are appended to that file instead of stderr.
/// The `verbose` flag controls whether debug logs are shown. `RUST_LOG`
/// overrides both defaults.
pub fn init_logging(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let mut builder = Builder::from_env(Env::default().default_filter_or(filter));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder
        .try_init()
        .context("Logger was already initialized")?;
    Ok(())
}
