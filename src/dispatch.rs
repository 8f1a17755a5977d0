// Command dispatcher: turns an operation plus its parameters into the
// executor's argument vector, runs it, and decodes the JSON reply into a
// `Reply` holding exactly the field that operation is defined to return.

use crate::error::BridgeError;
use crate::executor::{CallOptions, Executor};
use crate::notifier::AuthChangeNotifier;
use crate::types::{Credentials, Share};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// First token of every invocation.
pub const MODE: &str = "with-creds";

/// Flags whose values never reach the logs.
const SECRET_FLAGS: [&str; 5] = [
    "--access-token",
    "--refresh-token",
    "--salted-key-pass",
    "--password",
    "--mfa",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Check,
    Upload,
    Download,
    Delete,
    ListShares,
    FindBackup,
    ListFilesMetadata,
}

/// Reply field an operation must populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Creds,
    LinkId,
    DownloadedPath,
    Shares,
    Metadata,
    Nothing,
}

impl Field {
    fn key(self) -> &'static str {
        match self {
            Field::Creds => "creds",
            Field::LinkId => "link_id",
            Field::DownloadedPath => "downloaded_path",
            Field::Shares => "shares",
            Field::Metadata => "metadata",
            Field::Nothing => "",
        }
    }
}

impl Operation {
    pub fn token(self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Check => "check",
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::Delete => "delete",
            Operation::ListShares => "list-shares",
            Operation::FindBackup => "find-backup",
            Operation::ListFilesMetadata => "list-files-metadata",
        }
    }

    fn expects(self) -> Field {
        match self {
            Operation::Login => Field::Creds,
            Operation::FindBackup => Field::LinkId,
            Operation::Download => Field::DownloadedPath,
            Operation::ListShares => Field::Shares,
            Operation::ListFilesMetadata => Field::Metadata,
            Operation::Check | Operation::Upload | Operation::Delete => Field::Nothing,
        }
    }
}

/// Optional string parameters. Empty values are left off the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub link_id: String,
    pub instance_id: String,
    pub backup_id: String,
    pub name: String,
    pub metadata_json: String,
    pub content_path: String,
    pub root_folder: String,
    pub share_id: String,
    pub username: String,
    pub password: String,
    pub mfa: String,
}

impl Params {
    // Order is part of the executor contract.
    fn flags(&self) -> [(&'static str, &str); 11] {
        [
            ("--link-id", self.link_id.as_str()),
            ("--instance-id", self.instance_id.as_str()),
            ("--backup-id", self.backup_id.as_str()),
            ("--name", self.name.as_str()),
            ("--metadata-json", self.metadata_json.as_str()),
            ("--content-path", self.content_path.as_str()),
            ("--root-folder", self.root_folder.as_str()),
            ("--share-id", self.share_id.as_str()),
            ("--username", self.username.as_str()),
            ("--password", self.password.as_str()),
            ("--mfa", self.mfa.as_str()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Command {
    pub operation: Operation,
    pub credentials: Option<Credentials>,
    pub params: Params,
}

impl Command {
    pub fn new(operation: Operation, credentials: Option<Credentials>, params: Params) -> Self {
        Self {
            operation,
            credentials,
            params,
        }
    }

    /// Argument vector handed to the executor, without the program itself.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![MODE.to_string(), self.operation.token().to_string()];
        if let Some(creds) = &self.credentials {
            for (flag, value) in [
                ("--uid", &creds.uid),
                ("--access-token", &creds.access_token),
                ("--refresh-token", &creds.refresh_token),
                ("--salted-key-pass", &creds.salted_key_pass),
            ] {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        for (flag, value) in self.params.flags() {
            if !value.is_empty() {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }
        args
    }
}

/// Decoded reply, tagged by the field its operation returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Credentials(Credentials),
    LinkId(String),
    DownloadedPath(String),
    Shares(Vec<Share>),
    Metadata(Vec<String>),
    Done,
}

impl Reply {
    pub fn into_credentials(self, op: Operation) -> Result<Credentials, BridgeError> {
        match self {
            Reply::Credentials(creds) => Ok(creds),
            _ => Err(violation(op, Field::Creds)),
        }
    }

    pub fn into_link_id(self, op: Operation) -> Result<String, BridgeError> {
        match self {
            Reply::LinkId(id) => Ok(id),
            _ => Err(violation(op, Field::LinkId)),
        }
    }

    pub fn into_downloaded_path(self, op: Operation) -> Result<String, BridgeError> {
        match self {
            Reply::DownloadedPath(path) => Ok(path),
            _ => Err(violation(op, Field::DownloadedPath)),
        }
    }

    pub fn into_shares(self, op: Operation) -> Result<Vec<Share>, BridgeError> {
        match self {
            Reply::Shares(shares) => Ok(shares),
            _ => Err(violation(op, Field::Shares)),
        }
    }

    pub fn into_metadata(self, op: Operation) -> Result<Vec<String>, BridgeError> {
        match self {
            Reply::Metadata(metadata) => Ok(metadata),
            _ => Err(violation(op, Field::Metadata)),
        }
    }
}

fn violation(op: Operation, field: Field) -> BridgeError {
    BridgeError::ProtocolViolation {
        operation: op.token(),
        expected: field.key(),
    }
}

/// Remove `key` from the reply and decode it. `null` and a missing key are
/// both `None`; a value of the wrong shape is an executor failure.
fn take<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Option<T>, BridgeError> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BridgeError::failed(format!("malformed `{}` in reply: {}", key, e))),
    }
}

/// Decode one reply for `op`.
///
/// Decoding is staged: `error` and `creds` first, then only the field `op`
/// returns. Rotated credentials reach `notifier` even when the reply also
/// carries an `error`, since the rotation already happened on the backend
/// side. Once `error` is seen no other key is read, and keys the operation
/// does not return are never looked at.
pub fn decode(
    op: Operation,
    stdout: &str,
    notifier: Option<&dyn AuthChangeNotifier>,
) -> Result<Reply, BridgeError> {
    let value: Value = serde_json::from_str(stdout)
        .map_err(|e| BridgeError::failed(format!("unparsable output: {}", e)))?;
    let Value::Object(mut fields) = value else {
        return Err(BridgeError::failed(format!(
            "expected a JSON object, got: {}",
            stdout.trim()
        )));
    };

    let error = match fields.remove("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message),
        Some(other) => Some(other.to_string()),
    };

    let creds = match take::<Credentials>(&mut fields, "creds") {
        Ok(creds) => creds,
        // A broken `creds` object must not hide the backend's own error.
        Err(e) if error.is_some() => {
            warn!(error = %e, "ignoring malformed credentials next to a backend error");
            None
        }
        Err(e) => return Err(e),
    };
    if let (Some(creds), Some(notifier)) = (&creds, notifier) {
        debug!(uid = %creds.uid, "credentials rotated");
        notifier.on_credentials_renewed(creds);
    }

    if let Some(message) = error {
        return Err(BridgeError::Backend(message));
    }

    let field = op.expects();
    let reply = match field {
        Field::Creds => creds.map(Reply::Credentials),
        Field::LinkId => take(&mut fields, "link_id")?.map(Reply::LinkId),
        Field::DownloadedPath => take(&mut fields, "downloaded_path")?.map(Reply::DownloadedPath),
        Field::Shares => take(&mut fields, "shares")?.map(Reply::Shares),
        Field::Metadata => take(&mut fields, "metadata")?.map(Reply::Metadata),
        Field::Nothing => Some(Reply::Done),
    };
    reply.ok_or_else(|| violation(op, field))
}

/// Arguments with secret values masked, for logging.
fn redacted(args: &[String]) -> Vec<&str> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            out.push("***");
            hide_next = false;
        } else {
            hide_next = SECRET_FLAGS.contains(&arg.as_str());
            out.push(arg.as_str());
        }
    }
    out
}

/// Sends commands to an executor. Cheap to clone; every clone shares the
/// same executor.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn Executor>,
    defaults: CallOptions,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            defaults: CallOptions::default(),
        }
    }

    /// Options used by sessions and logins that don't pass their own.
    pub fn with_default_options(mut self, opts: CallOptions) -> Self {
        self.defaults = opts;
        self
    }

    pub fn default_options(&self) -> &CallOptions {
        &self.defaults
    }

    /// Run `command` and decode its reply. No retries happen here.
    pub fn dispatch(
        &self,
        command: &Command,
        notifier: Option<&dyn AuthChangeNotifier>,
        opts: &CallOptions,
    ) -> Result<Reply, BridgeError> {
        let op = command.operation;
        let args = command.args();
        debug!(operation = op.token(), args = ?redacted(&args), "dispatching");
        let stdout = self.executor.run(op.token(), &args, opts)?;
        decode(op, &stdout, notifier)
    }
}
