#![allow(dead_code)]

use protonbridge_cli::{BridgeError, CallOptions, Credentials, Dispatcher, Executor};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Executor that replays scripted replies and records every argument vector.
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: Mutex<VecDeque<Result<String, BridgeError>>>,
    calls: Mutex<Vec<Vec<String>>>,
    options: Mutex<Vec<CallOptions>>,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, json: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(json.to_string()));
        self
    }

    pub fn fail(&self, err: BridgeError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Options passed to each call, in call order.
    pub fn options(&self) -> Vec<CallOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> CallOptions {
        self.options().last().cloned().expect("no call recorded")
    }

    pub fn last_call(&self) -> Vec<String> {
        self.calls().last().cloned().expect("no call recorded")
    }
}

impl Executor for ScriptedExecutor {
    fn run(
        &self,
        _operation: &'static str,
        args: &[String],
        opts: &CallOptions,
    ) -> Result<String, BridgeError> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.options.lock().unwrap().push(opts.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

pub fn dispatcher(exec: &Arc<ScriptedExecutor>) -> Dispatcher {
    Dispatcher::new(exec.clone())
}

pub fn creds(tag: &str) -> Credentials {
    Credentials::new(
        format!("uid-{tag}"),
        format!("access-{tag}"),
        format!("refresh-{tag}"),
        format!("salt-{tag}"),
    )
}

pub fn creds_json(tag: &str) -> String {
    format!(
        r#"{{"uid": "uid-{tag}", "access_token": "access-{tag}", "refresh_token": "refresh-{tag}", "salted_key_pass": "salt-{tag}"}}"#
    )
}

/// Notifier closure plus the log it appends to.
pub fn recording_notifier() -> (impl Fn(&Credentials) + 'static, Rc<RefCell<Vec<Credentials>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    (move |c: &Credentials| sink.borrow_mut().push(c.clone()), log)
}

/// Value following `flag` in `args`, if the flag is present.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
