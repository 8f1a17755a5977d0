// Session objects built on the dispatcher. A `Client` owns the live
// credentials and the selected share; `Folder` handles borrow that state
// through a shared pointer, so they always send whatever the session holds
// at call time.
//
// Sessions are single-threaded (`Rc` + `RefCell`). Run independent clients
// on separate threads if parallelism is needed.

use crate::dispatch::{Command, Dispatcher, Operation, Params, Reply};
use crate::error::BridgeError;
use crate::executor::CallOptions;
use crate::notifier::AuthChangeNotifier;
use crate::types::{Credentials, Share};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Mint credentials from a username, password and optional MFA code.
///
/// Empty `mfa` leaves the flag off. No session or notifier is involved.
pub fn login(
    dispatcher: &Dispatcher,
    username: &str,
    password: &str,
    mfa: &str,
) -> Result<Credentials, BridgeError> {
    login_with(dispatcher, username, password, mfa, dispatcher.default_options())
}

pub fn login_with(
    dispatcher: &Dispatcher,
    username: &str,
    password: &str,
    mfa: &str,
    opts: &CallOptions,
) -> Result<Credentials, BridgeError> {
    let command = Command::new(
        Operation::Login,
        None,
        Params {
            username: username.to_string(),
            password: password.to_string(),
            mfa: mfa.to_string(),
            ..Params::default()
        },
    );
    let creds = dispatcher
        .dispatch(&command, None, opts)?
        .into_credentials(Operation::Login)?;
    info!(uid = %creds.uid, "logged in");
    Ok(creds)
}

/// Same as [`Client::new`].
pub fn new_client(
    dispatcher: Dispatcher,
    credentials: Credentials,
    notifier: impl AuthChangeNotifier + 'static,
) -> Result<Client, BridgeError> {
    Client::new(dispatcher, credentials, notifier)
}

struct SessionState {
    credentials: Credentials,
    // `None` until a share is selected; sent as an omitted `--share-id`.
    share_id: Option<String>,
    call_options: CallOptions,
}

struct Session {
    dispatcher: Dispatcher,
    notifier: Box<dyn AuthChangeNotifier>,
    state: RefCell<SessionState>,
}

impl Session {
    fn call(&self, operation: Operation, params: Params) -> Result<Reply, BridgeError> {
        // Snapshot the state so no borrow is held while the notifier runs.
        let (command, opts) = {
            let state = self.state.borrow();
            let params = Params {
                share_id: state.share_id.clone().unwrap_or_default(),
                ..params
            };
            let command = Command::new(operation, Some(state.credentials.clone()), params);
            (command, state.call_options.clone())
        };
        let notifier: &dyn AuthChangeNotifier = self;
        self.dispatcher.dispatch(&command, Some(notifier), &opts)
    }
}

impl AuthChangeNotifier for Session {
    fn on_credentials_renewed(&self, creds: &Credentials) {
        self.state.borrow_mut().credentials = creds.clone();
        self.notifier.on_credentials_renewed(creds);
    }
}

/// An authenticated session against the storage service.
#[derive(Clone)]
pub struct Client {
    session: Rc<Session>,
}

impl Client {
    /// Open a session and validate it with a `check` call. No share is
    /// selected yet, so the check goes out without `--share-id`.
    pub fn new(
        dispatcher: Dispatcher,
        credentials: Credentials,
        notifier: impl AuthChangeNotifier + 'static,
    ) -> Result<Self, BridgeError> {
        let call_options = dispatcher.default_options().clone();
        let client = Client {
            session: Rc::new(Session {
                dispatcher,
                notifier: Box::new(notifier),
                state: RefCell::new(SessionState {
                    credentials,
                    share_id: None,
                    call_options,
                }),
            }),
        };
        client.session.call(Operation::Check, Params::default())?;
        info!(uid = %client.credentials().uid, "session opened");
        Ok(client)
    }

    /// Current credentials, including any rotation seen so far.
    pub fn credentials(&self) -> Credentials {
        self.session.state.borrow().credentials.clone()
    }

    pub fn share_id(&self) -> Option<String> {
        self.session.state.borrow().share_id.clone()
    }

    /// Replace the timeout/cancellation used by later calls of this session
    /// and every folder handle made from it.
    pub fn set_call_options(&self, opts: CallOptions) {
        self.session.state.borrow_mut().call_options = opts;
    }

    /// Select `share_id` and validate it with `check`. If the check fails the
    /// previous selection is restored.
    pub fn select_share(&self, share_id: &str) -> Result<(), BridgeError> {
        let previous = self
            .session
            .state
            .borrow_mut()
            .share_id
            .replace(share_id.to_string());
        match self.session.call(Operation::Check, Params::default()) {
            Ok(_) => {
                info!(share_id, "share selected");
                Ok(())
            }
            Err(e) => {
                self.session.state.borrow_mut().share_id = previous;
                Err(e)
            }
        }
    }

    pub fn list_shares(&self) -> Result<Vec<Share>, BridgeError> {
        self.session
            .call(Operation::ListShares, Params::default())?
            .into_shares(Operation::ListShares)
    }

    /// Download a file by link id; returns the local path the executor wrote.
    pub fn download_file(&self, link_id: &str) -> Result<String, BridgeError> {
        let params = Params {
            link_id: link_id.to_string(),
            ..Params::default()
        };
        self.session
            .call(Operation::Download, params)?
            .into_downloaded_path(Operation::Download)
    }

    pub fn delete_file(&self, link_id: &str) -> Result<(), BridgeError> {
        let params = Params {
            link_id: link_id.to_string(),
            ..Params::default()
        };
        self.session.call(Operation::Delete, params)?;
        Ok(())
    }

    /// Folder handle scoped to `path`. Makes no backend call.
    pub fn make_root_folder(&self, path: &str) -> Folder {
        Folder {
            client: self.clone(),
            root_folder: path.to_string(),
        }
    }
}

/// Backup operations under one root folder of the session's selected share.
#[derive(Clone)]
pub struct Folder {
    client: Client,
    root_folder: String,
}

impl Folder {
    pub fn root_folder(&self) -> &str {
        &self.root_folder
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn call(&self, operation: Operation, params: Params) -> Result<Reply, BridgeError> {
        let params = Params {
            root_folder: self.root_folder.clone(),
            ..params
        };
        self.client.session.call(operation, params)
    }

    /// Link id of the stored backup `backup_id` of `instance_id`.
    pub fn find_backup(&self, instance_id: &str, backup_id: &str) -> Result<String, BridgeError> {
        let params = Params {
            instance_id: instance_id.to_string(),
            backup_id: backup_id.to_string(),
            ..Params::default()
        };
        self.call(Operation::FindBackup, params)?
            .into_link_id(Operation::FindBackup)
    }

    /// Upload the file at `content_path`. An empty `metadata_json` sends no
    /// metadata flag at all.
    pub fn upload(
        &self,
        instance_id: &str,
        backup_id: &str,
        name: &str,
        metadata_json: &str,
        content_path: &str,
    ) -> Result<(), BridgeError> {
        let params = Params {
            instance_id: instance_id.to_string(),
            backup_id: backup_id.to_string(),
            name: name.to_string(),
            metadata_json: metadata_json.to_string(),
            content_path: content_path.to_string(),
            ..Params::default()
        };
        self.call(Operation::Upload, params)?;
        Ok(())
    }

    pub fn list_files_metadata(&self, instance_id: &str) -> Result<Vec<String>, BridgeError> {
        let params = Params {
            instance_id: instance_id.to_string(),
            ..Params::default()
        };
        self.call(Operation::ListFilesMetadata, params)?
            .into_metadata(Operation::ListFilesMetadata)
    }
}
