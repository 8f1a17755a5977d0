// UI layer: a simple interactive menu using `dialoguer`. Each action maps to
// one bridge call, shown with an `indicatif` spinner while the executor runs.

use crate::client::{login, Client, Folder};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::notifier::CredentialFile;
use crate::types::Credentials;
use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// What the menu remembers between actions.
struct MenuState {
    dispatcher: Dispatcher,
    credential_file: CredentialFile,
    client: Option<Client>,
    last_root_folder: String,
}

/// Main interactive menu. Runs a select loop until the user chooses "Exit".
///
/// Bridge failures are printed and the loop continues; only terminal I/O
/// errors end the menu.
pub fn main_menu(config: &Config) -> Result<()> {
    let mut state = MenuState {
        dispatcher: config.dispatcher()?,
        credential_file: config.credential_file(),
        client: None,
        last_root_folder: String::new(),
    };

    let items = vec![
        "Login",
        "Open saved session",
        "List shares",
        "Select share",
        "Find backup",
        "Upload backup",
        "List files metadata",
        "Download file",
        "Delete file",
        "Logout",
        "Exit",
    ];
    loop {
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_login(&mut state)?,
            1 => handle_open_saved(&mut state)?,
            10 => break,
            9 => handle_logout(&mut state)?,
            n => {
                let Some(client) = state.client.clone() else {
                    println!("You should login first.");
                    continue;
                };
                match n {
                    2 => handle_list_shares(&client),
                    3 => handle_select_share(&client)?,
                    4 => handle_find_backup(&client, &mut state.last_root_folder)?,
                    5 => handle_upload(&client, &mut state.last_root_folder)?,
                    6 => handle_list_metadata(&client, &mut state.last_root_folder)?,
                    7 => handle_download(&client)?,
                    8 => handle_delete(&client)?,
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

/// Run `f` behind a spinner showing `message`.
fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    out
}

fn open_session(state: &mut MenuState, creds: Credentials) {
    let dispatcher = state.dispatcher.clone();
    let file = state.credential_file.clone();
    match with_spinner("Checking session...", || Client::new(dispatcher, creds, file)) {
        Ok(client) => {
            println!("Session ready.");
            state.client = Some(client);
        }
        Err(e) => println!("Session check failed: {}", e),
    }
}

/// Collect username, password and MFA code, then mint and store credentials.
fn handle_login(state: &mut MenuState) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new().with_prompt("Password").interact()?;
    let mfa: String = Input::new()
        .with_prompt("MFA code (leave empty if none)")
        .allow_empty(true)
        .interact_text()?;

    let result = with_spinner("Logging in...", || {
        login(&state.dispatcher, &username, &password, &mfa)
    });
    match result {
        Ok(creds) => {
            if let Err(e) = state.credential_file.save(&creds) {
                println!("Could not store credentials: {:#}", e);
            }
            open_session(state, creds);
        }
        Err(e) => println!("Login failed: {}", e),
    }
    Ok(())
}

fn handle_open_saved(state: &mut MenuState) -> Result<()> {
    match state.credential_file.load()? {
        Some(creds) => open_session(state, creds),
        None => println!(
            "No saved credentials at {}. Login first.",
            state.credential_file.path().display()
        ),
    }
    Ok(())
}

fn handle_logout(state: &mut MenuState) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Forget stored credentials?")
        .interact()?;
    if confirmed {
        state.credential_file.clear()?;
        state.client = None;
        println!("Logged out.");
    }
    Ok(())
}

fn handle_list_shares(client: &Client) {
    match with_spinner("Listing shares...", || client.list_shares()) {
        Ok(shares) if shares.is_empty() => println!("No shares."),
        Ok(shares) => {
            for share in shares {
                println!("{}  {}", share.share_id, share.name);
            }
        }
        Err(e) => println!("Listing shares failed: {}", e),
    }
}

fn handle_select_share(client: &Client) -> Result<()> {
    let shares = match with_spinner("Listing shares...", || client.list_shares()) {
        Ok(shares) => shares,
        Err(e) => {
            println!("Listing shares failed: {}", e);
            return Ok(());
        }
    };
    if shares.is_empty() {
        println!("No shares to select.");
        return Ok(());
    }
    let labels: Vec<String> = shares
        .iter()
        .map(|s| format!("{} ({})", s.name, s.share_id))
        .collect();
    let idx = Select::new().items(&labels).default(0).interact()?;
    let share_id = &shares[idx].share_id;
    match with_spinner("Selecting share...", || client.select_share(share_id)) {
        Ok(()) => println!("Selected {}.", shares[idx].name),
        Err(e) => println!("Selecting share failed: {}", e),
    }
    Ok(())
}

/// Ask for the root folder, offering the last one used.
fn prompt_folder(client: &Client, last: &mut String) -> Result<Folder> {
    let mut input = Input::<String>::new();
    input.with_prompt("Root folder");
    if !last.is_empty() {
        input.default(last.clone());
    }
    let path = input.interact_text()?;
    *last = path.clone();
    Ok(client.make_root_folder(&path))
}

fn handle_find_backup(client: &Client, last: &mut String) -> Result<()> {
    let folder = prompt_folder(client, last)?;
    let instance_id: String = Input::new().with_prompt("Instance ID").interact_text()?;
    let backup_id: String = Input::new().with_prompt("Backup ID").interact_text()?;
    match with_spinner("Looking up backup...", || {
        folder.find_backup(&instance_id, &backup_id)
    }) {
        Ok(link_id) => println!("Link ID: {}", link_id),
        Err(e) => println!("Find backup failed: {}", e),
    }
    Ok(())
}

fn handle_upload(client: &Client, last: &mut String) -> Result<()> {
    let folder = prompt_folder(client, last)?;
    let instance_id: String = Input::new().with_prompt("Instance ID").interact_text()?;
    let backup_id: String = Input::new().with_prompt("Backup ID").interact_text()?;
    let name: String = Input::new().with_prompt("File name").interact_text()?;
    let metadata_json: String = Input::new()
        .with_prompt("Metadata JSON (leave empty for none)")
        .allow_empty(true)
        .interact_text()?;
    let content_path: String = Input::new().with_prompt("Content file path").interact_text()?;

    if !metadata_json.is_empty() {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(&metadata_json) {
            println!("Metadata is not valid JSON: {}", e);
            return Ok(());
        }
    }
    if !Path::new(&content_path).is_file() {
        println!("No file at {}", content_path);
        return Ok(());
    }

    match with_spinner("Uploading...", || {
        folder.upload(&instance_id, &backup_id, &name, &metadata_json, &content_path)
    }) {
        Ok(()) => println!("Upload successful"),
        Err(e) => println!("Upload failed: {}", e),
    }
    Ok(())
}

fn handle_list_metadata(client: &Client, last: &mut String) -> Result<()> {
    let folder = prompt_folder(client, last)?;
    let instance_id: String = Input::new().with_prompt("Instance ID").interact_text()?;
    match with_spinner("Listing metadata...", || {
        folder.list_files_metadata(&instance_id)
    }) {
        Ok(entries) if entries.is_empty() => println!("No files."),
        Ok(entries) => {
            for entry in entries {
                println!("{}", entry);
            }
        }
        Err(e) => println!("Listing metadata failed: {}", e),
    }
    Ok(())
}

fn handle_download(client: &Client) -> Result<()> {
    let link_id: String = Input::new().with_prompt("Link ID").interact_text()?;
    match with_spinner("Downloading...", || client.download_file(&link_id)) {
        Ok(path) => println!("Downloaded to {}", path),
        Err(e) => println!("Download failed: {}", e),
    }
    Ok(())
}

fn handle_delete(client: &Client) -> Result<()> {
    let link_id: String = Input::new().with_prompt("Link ID").interact_text()?;
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete {}?", link_id))
        .interact()?;
    if !confirmed {
        return Ok(());
    }
    match with_spinner("Deleting...", || client.delete_file(&link_id)) {
        Ok(()) => println!("Deleted."),
        Err(e) => println!("Delete failed: {}", e),
    }
    Ok(())
}
