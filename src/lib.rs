// Library root
// -----------
// This crate exposes the bridge to the external storage executor plus the
// small interactive front end built on it. The binary (`main.rs`) only wires
// configuration and logging and then hands control to `ui`.
//
// Module responsibilities:
// - `types`: credential and share records that cross the bridge.
// - `error`: the error taxonomy every bridge call returns.
// - `executor`: spawns the external executor and captures its output.
// - `dispatch`: encodes commands into argument vectors and decodes replies.
// - `notifier`: observers for rotated credentials, including file storage.
// - `client`: login, the session client and folder handles.
// - `config`: environment-driven settings.
// - `ui`: terminal menus that drive a session interactively.
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod notifier;
pub mod types;
pub mod ui;

pub use client::{login, login_with, new_client, Client, Folder};
pub use dispatch::Dispatcher;
pub use error::BridgeError;
pub use executor::{CallOptions, CancelToken, Executor, ProcessExecutor};
pub use notifier::{AuthChangeNotifier, CredentialFile};
pub use types::{Credentials, Share};
