// Observers for credential rotation. The dispatcher calls the notifier
// synchronously, once per reply carrying a `creds` object, before the call
// returns to its caller.

use crate::types::Credentials;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Receives every rotated credential set. Implementations observe only: the
/// value passed in is a copy, the session keeps its own.
pub trait AuthChangeNotifier {
    fn on_credentials_renewed(&self, creds: &Credentials);
}

impl<F> AuthChangeNotifier for F
where
    F: Fn(&Credentials),
{
    fn on_credentials_renewed(&self, creds: &Credentials) {
        self(creds)
    }
}

/// Stores credentials as JSON in a single file so a later run can resume the
/// session without logging in again.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.protonbridge_credentials.json`, or the working directory when no
    /// home directory is known.
    pub fn default_path() -> PathBuf {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.join(".protonbridge_credentials.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, creds: &Credentials) -> Result<()> {
        let data = serde_json::to_string_pretty(creds).context("Serializing credentials")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Writing {}", self.path.display()))?;
        debug!(path = %self.path.display(), uid = %creds.uid, "stored credentials");
        Ok(())
    }

    /// Returns `None` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Reading {}", self.path.display()))?;
        let creds = serde_json::from_str(&data)
            .with_context(|| format!("Parsing {}", self.path.display()))?;
        Ok(Some(creds))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Removing {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl AuthChangeNotifier for CredentialFile {
    fn on_credentials_renewed(&self, creds: &Credentials) {
        // The rotation already happened on the backend; a failed write must
        // not turn a successful call into an error.
        if let Err(e) = self.save(creds) {
            warn!(error = %format!("{:#}", e), "could not persist rotated credentials");
        }
    }
}
