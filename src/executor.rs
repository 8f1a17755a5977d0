// Process invocation for the external executor. Each call spawns one child,
// blocks until it exits, and returns whatever it wrote to stdout. The
// `Executor` trait is the seam the dispatcher talks to, which lets tests
// script replies without a real binary.
//
// Each call starts two helper threads that drain stdout and stderr while the
// caller polls for exit, deadline or cancellation. After a timeout or cancel
// the child is killed and the helpers are left detached: if a grandchild
// still holds a pipe open they keep running until it closes.

use crate::error::BridgeError;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cooperative cancellation flag shared between the caller and a running call.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call limits. `timeout: None` waits forever.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: None,
        }
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancelToken::is_cancelled)
    }
}

/// Runs one executor invocation and returns its captured stdout.
pub trait Executor {
    fn run(
        &self,
        operation: &'static str,
        args: &[String],
        opts: &CallOptions,
    ) -> Result<String, BridgeError>;
}

/// Executor backed by a binary on disk, located once and reused.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    path: PathBuf,
}

impl ProcessExecutor {
    /// Validate that `path` points at a file and keep it for every call.
    pub fn locate(path: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let path = path.into();
        if !path.is_file() {
            return Err(BridgeError::ExecutorNotFound { path });
        }
        debug!(path = %path.display(), "located executor");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Executor for ProcessExecutor {
    fn run(
        &self,
        operation: &'static str,
        args: &[String],
        opts: &CallOptions,
    ) -> Result<String, BridgeError> {
        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    BridgeError::ExecutorNotFound {
                        path: self.path.clone(),
                    }
                } else {
                    BridgeError::failed(format!("spawning {}: {}", self.path.display(), e))
                }
            })?;

        // Both pipes are drained concurrently so a chatty child cannot block
        // on a full buffer while we wait for it to exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    stop(&mut child);
                    return Err(BridgeError::failed(format!("waiting for executor: {}", e)));
                }
            }
            if opts.is_cancelled() {
                stop(&mut child);
                return Err(BridgeError::Cancelled { operation });
            }
            if let Some(limit) = opts.timeout {
                if started.elapsed() >= limit {
                    warn!(operation, ?limit, "executor exceeded deadline, killing it");
                    stop(&mut child);
                    return Err(BridgeError::Timeout {
                        operation,
                        after: limit,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(BridgeError::failed(format!("{} ({})", status, stderr.trim())));
        }
        String::from_utf8(stdout)
            .map_err(|_| BridgeError::failed("executor output is not valid UTF-8"))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>, BridgeError> {
    reader
        .join()
        .map_err(|_| BridgeError::failed("output reader panicked"))?
        .map_err(|e| BridgeError::failed(format!("reading executor output: {}", e)))
}

// Kill and reap; errors mean the child is already gone.
fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
