mod common;

use common::{creds, creds_json, dispatcher, flag_value, recording_notifier, ScriptedExecutor};
use protonbridge_cli::{login, BridgeError, Client, Credentials, Share};

fn open_client(exec: &std::sync::Arc<ScriptedExecutor>) -> Client {
    exec.reply("{}");
    let (notify, _log) = recording_notifier();
    Client::new(dispatcher(exec), creds("a"), notify).expect("session should open")
}

#[test]
fn login_returns_credentials_usable_for_check() {
    let exec = ScriptedExecutor::new();
    exec.reply(&format!(r#"{{"creds": {}}}"#, creds_json("a")));
    let minted = login(&dispatcher(&exec), "alice", "hunter2", "").unwrap();
    assert_eq!(minted, creds("a"));

    let call = exec.last_call();
    assert_eq!(
        call,
        vec!["with-creds", "login", "--username", "alice", "--password", "hunter2"]
    );

    exec.reply("{}");
    let (notify, _log) = recording_notifier();
    Client::new(dispatcher(&exec), minted, notify).unwrap();
    let check = exec.last_call();
    assert_eq!(&check[..2], ["with-creds", "check"]);
    assert_eq!(flag_value(&check, "--uid"), Some("uid-a"));
    assert_eq!(flag_value(&check, "--access-token"), Some("access-a"));
    assert_eq!(flag_value(&check, "--refresh-token"), Some("refresh-a"));
    assert_eq!(flag_value(&check, "--salted-key-pass"), Some("salt-a"));
}

#[test]
fn login_passes_mfa_when_given() {
    let exec = ScriptedExecutor::new();
    exec.reply(&format!(r#"{{"creds": {}}}"#, creds_json("a")));
    login(&dispatcher(&exec), "alice", "pw", "424242").unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--mfa"), Some("424242"));
}

#[test]
fn login_without_creds_is_a_protocol_violation() {
    let exec = ScriptedExecutor::new();
    exec.reply("{}");
    let err = login(&dispatcher(&exec), "alice", "pw", "").unwrap_err();
    assert!(err.is_protocol_violation(), "got {:?}", err);
}

#[test]
fn construction_checks_without_a_share() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    let check = exec.last_call();
    assert_eq!(&check[..2], ["with-creds", "check"]);
    assert_eq!(flag_value(&check, "--share-id"), None);
    assert_eq!(client.share_id(), None);
}

#[test]
fn construction_surfaces_backend_rejection() {
    let exec = ScriptedExecutor::new();
    exec.reply(r#"{"error": "session expired"}"#);
    let (notify, _log) = recording_notifier();
    let err = Client::new(dispatcher(&exec), creds("a"), notify).err().unwrap();
    match err {
        BridgeError::Backend(msg) => assert_eq!(msg, "session expired"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn rotated_credentials_notify_once_and_replace_the_session_copy() {
    let exec = ScriptedExecutor::new();
    exec.reply(&format!(r#"{{"creds": {}}}"#, creds_json("b")));
    let (notify, log) = recording_notifier();
    let client = Client::new(dispatcher(&exec), creds("a"), notify).unwrap();

    assert_eq!(*log.borrow(), vec![creds("b")]);
    assert_eq!(client.credentials(), creds("b"));

    exec.reply(r#"{"shares": []}"#);
    client.list_shares().unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--access-token"), Some("access-b"));
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn rotation_is_kept_when_the_same_reply_reports_an_error() {
    let exec = ScriptedExecutor::new();
    exec.reply("{}");
    let (notify, log) = recording_notifier();
    let client = Client::new(dispatcher(&exec), creds("a"), notify).unwrap();

    exec.reply(&format!(
        r#"{{"error": "link not found", "creds": {}}}"#,
        creds_json("c")
    ));
    let err = client.download_file("L1").unwrap_err();
    assert!(err.is_backend());
    assert_eq!(*log.borrow(), vec![creds("c")]);
    assert_eq!(client.credentials(), creds("c"));
}

#[test]
fn selected_share_is_forwarded_by_every_later_call() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    let early_folder = client.make_root_folder("/backups");

    exec.reply("{}");
    client.select_share("share-1").unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--share-id"), Some("share-1"));

    exec.reply(r#"{"link_id": "L1"}"#);
    assert_eq!(early_folder.find_backup("inst", "b1").unwrap(), "L1");
    let call = exec.last_call();
    assert_eq!(flag_value(&call, "--share-id"), Some("share-1"));
    assert_eq!(flag_value(&call, "--root-folder"), Some("/backups"));

    exec.reply(r#"{"metadata": ["{}"]}"#);
    client
        .make_root_folder("/backups")
        .list_files_metadata("inst")
        .unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--share-id"), Some("share-1"));

    exec.reply("{}");
    client.select_share("share-2").unwrap();
    exec.reply("{}");
    early_folder.upload("inst", "b2", "n", "", "/tmp/x").unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--share-id"), Some("share-2"));
}

#[test]
fn failed_share_selection_restores_the_previous_share() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);

    exec.reply("{}");
    client.select_share("good").unwrap();

    exec.reply(r#"{"error": "permission denied"}"#);
    let err = client.select_share("bad").unwrap_err();
    assert!(err.is_backend());
    assert_eq!(flag_value(&exec.last_call(), "--share-id"), Some("bad"));
    assert_eq!(client.share_id().as_deref(), Some("good"));

    exec.reply("{}");
    client.delete_file("L9").unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--share-id"), Some("good"));
}

#[test]
fn listing_shares_twice_sends_identical_arguments() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    let reply = r#"{"shares": [{"ShareID": "s1", "Name": "Main"}, {"ShareID": "s2", "Name": "Photos"}]}"#;

    exec.reply(reply);
    let first = client.list_shares().unwrap();
    exec.reply(reply);
    let second = client.list_shares().unwrap();

    assert_eq!(
        first,
        vec![
            Share {
                share_id: "s1".into(),
                name: "Main".into()
            },
            Share {
                share_id: "s2".into(),
                name: "Photos".into()
            },
        ]
    );
    assert_eq!(first, second);
    let calls = exec.calls();
    assert_eq!(calls[calls.len() - 1], calls[calls.len() - 2]);
}

#[test]
fn list_shares_without_shares_field_is_a_protocol_violation() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    exec.reply(r#"{"link_id": "x"}"#);
    assert!(client.list_shares().unwrap_err().is_protocol_violation());
}

#[test]
fn find_backup_requires_a_link_id() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    let folder = client.make_root_folder("/r");

    exec.reply(r#"{"link_id": null}"#);
    assert!(folder.find_backup("i", "b").unwrap_err().is_protocol_violation());

    exec.reply("{}");
    assert!(folder.find_backup("i", "b").unwrap_err().is_protocol_violation());
}

#[test]
fn upload_omits_empty_metadata_and_keeps_given_metadata() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    let folder = client.make_root_folder("/r");

    exec.reply("{}");
    folder.upload("i", "b", "file.tar", "", "/tmp/file.tar").unwrap();
    let call = exec.last_call();
    assert!(!call.iter().any(|a| a == "--metadata-json"));
    assert_eq!(flag_value(&call, "--content-path"), Some("/tmp/file.tar"));

    exec.reply("{}");
    folder.upload("i", "b", "file.tar", "{}", "/tmp/file.tar").unwrap();
    assert_eq!(flag_value(&exec.last_call(), "--metadata-json"), Some("{}"));
}

#[test]
fn upload_arguments_follow_the_flag_order() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    exec.reply("{}");
    client.select_share("S").unwrap();

    exec.reply("{}");
    client
        .make_root_folder("/root")
        .upload("I", "B", "N", r#"{"k":1}"#, "/c")
        .unwrap();
    let call = exec.last_call();
    let tail: Vec<&str> = call[10..].iter().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "--instance-id",
            "I",
            "--backup-id",
            "B",
            "--name",
            "N",
            "--metadata-json",
            r#"{"k":1}"#,
            "--content-path",
            "/c",
            "--root-folder",
            "/root",
            "--share-id",
            "S",
        ]
    );
}

#[test]
fn download_returns_the_local_path() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    exec.reply(r#"{"downloaded_path": "/tmp/dl/file.bin"}"#);
    assert_eq!(client.download_file("L1").unwrap(), "/tmp/dl/file.bin");
    assert_eq!(flag_value(&exec.last_call(), "--link-id"), Some("L1"));

    exec.reply("{}");
    assert!(client.download_file("L1").unwrap_err().is_protocol_violation());
}

#[test]
fn executor_failures_pass_through_untouched() {
    let exec = ScriptedExecutor::new();
    let client = open_client(&exec);
    exec.fail(BridgeError::failed("exit status: 2 (panic)"));
    let err = client.delete_file("L1").unwrap_err();
    assert!(matches!(err, BridgeError::ExecutorFailed { .. }));
    assert!(!err.is_backend());
}

#[test]
fn notifier_sees_the_decoded_values() {
    let exec = ScriptedExecutor::new();
    exec.reply("{}");
    let (notify, log) = recording_notifier();
    let client = Client::new(dispatcher(&exec), creds("a"), notify).unwrap();

    exec.reply(r#"{"metadata": [], "creds": {"uid": "U", "access_token": "A", "refresh_token": "R", "salted_key_pass": "S"}}"#);
    let entries = client.make_root_folder("/r").list_files_metadata("i").unwrap();
    assert!(entries.is_empty());
    assert_eq!(*log.borrow(), vec![Credentials::new("U", "A", "R", "S")]);
}
