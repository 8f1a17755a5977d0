// Runtime settings read from the environment, following the same pattern as
// the rest of the CLI: every value has a default, env vars override it.

use crate::dispatch::Dispatcher;
use crate::executor::{CallOptions, ProcessExecutor};
use crate::notifier::CredentialFile;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const EXEC_ENV: &str = "PROTONBRIDGE_EXEC";
pub const TIMEOUT_ENV: &str = "PROTONBRIDGE_TIMEOUT_SECS";
pub const CREDENTIALS_ENV: &str = "PROTONBRIDGE_CREDENTIALS";

/// File name of the executor when it ships next to our own binary.
pub const DEFAULT_EXEC_NAME: &str = "_go_exec";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub executor_path: PathBuf,
    /// `None` disables the per-call deadline.
    pub timeout: Option<Duration>,
    pub credentials_path: PathBuf,
}

impl Config {
    /// Build the config from `PROTONBRIDGE_*` variables, falling back to
    /// the executor beside the current binary, a 300s deadline and the
    /// credential file in the home directory.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env` but reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let executor_path = match lookup(EXEC_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_executor_path()?,
        };
        let timeout_secs = match lookup(TIMEOUT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of seconds, got {:?}", TIMEOUT_ENV, raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
        let credentials_path = match lookup(CREDENTIALS_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => CredentialFile::default_path(),
        };
        Ok(Config {
            executor_path,
            timeout,
            credentials_path,
        })
    }

    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.timeout,
            cancel: None,
        }
    }

    /// Locate the executor once and wrap it in a dispatcher.
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let executor = ProcessExecutor::locate(&self.executor_path)
            .with_context(|| format!("Set {} to the executor binary", EXEC_ENV))?;
        Ok(Dispatcher::new(Arc::new(executor)).with_default_options(self.call_options()))
    }

    pub fn credential_file(&self) -> CredentialFile {
        CredentialFile::new(&self.credentials_path)
    }
}

fn default_executor_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to resolve current executable")?;
    let dir = exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(dir.join(DEFAULT_EXEC_NAME))
}
