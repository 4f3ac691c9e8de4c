//! Scripted in-memory command boundary for tests.
//!
//! Responses are registered per command (optionally per `entryName`) and
//! assigned to calls in arrival order. Calls can be held open until a test
//! releases them, which makes out-of-order completion reproducible.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tokio::sync::watch;

use crate::command::{Command, CommandBoundary, CommandRequest};
use crate::error::{BridgeError, Result};

type Key = (Command, Option<String>);

/// Handle that keeps matching calls suspended until [`Gate::release`].
#[derive(Clone)]
pub struct Gate {
    open: watch::Sender<bool>,
}

impl Gate {
    fn new() -> Self {
        let (open, _) = watch::channel(false);
        Self { open }
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Default)]
struct Script {
    once: HashMap<Key, VecDeque<Result<Value>>>,
    always: HashMap<Key, Result<Value>>,
    gates: HashMap<Key, Gate>,
}

impl Script {
    fn next(&mut self, command: Command, entry: Option<&str>) -> Result<Value> {
        let keyed = (command, entry.map(str::to_string));
        let generic = (command, None);

        for key in [&keyed, &generic] {
            if let Some(result) = self.once.get_mut(key).and_then(VecDeque::pop_front) {
                return result;
            }
        }
        for key in [&keyed, &generic] {
            if let Some(result) = self.always.get(key) {
                return result.clone();
            }
        }

        Err(BridgeError::NotAvailable(format!(
            "no scripted response for `{}`",
            command
        )))
    }

    fn gate(&self, command: Command, entry: Option<&str>) -> Option<Gate> {
        self.gates
            .get(&(command, entry.map(str::to_string)))
            .or_else(|| self.gates.get(&(command, None)))
            .cloned()
    }
}

/// In-memory [`CommandBoundary`] driven by a script.
pub struct ScriptedBoundary {
    script: Mutex<Script>,
    calls: Mutex<Vec<CommandRequest>>,
    call_counter: watch::Sender<usize>,
}

impl Default for ScriptedBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBoundary {
    pub fn new() -> Self {
        let (call_counter, _) = watch::channel(0);
        Self {
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            call_counter,
        }
    }

    /// Answer every `command` call with `value`.
    pub fn respond(&self, command: Command, value: Value) -> &Self {
        self.script.lock().always.insert((command, None), Ok(value));
        self
    }

    /// Answer `command` calls targeting `entry_name` with `value`.
    pub fn respond_for(&self, command: Command, entry_name: &str, value: Value) -> &Self {
        self.script
            .lock()
            .always
            .insert((command, Some(entry_name.to_string())), Ok(value));
        self
    }

    /// Fail every `command` call with `error`.
    pub fn fail(&self, command: Command, error: BridgeError) -> &Self {
        self.script.lock().always.insert((command, None), Err(error));
        self
    }

    /// Fail `command` calls targeting `entry_name` with `error`.
    pub fn fail_for(&self, command: Command, entry_name: &str, error: BridgeError) -> &Self {
        self.script
            .lock()
            .always
            .insert((command, Some(entry_name.to_string())), Err(error));
        self
    }

    /// Queue a one-shot result consumed before any standing response.
    pub fn respond_once(&self, command: Command, result: Result<Value>) -> &Self {
        self.script
            .lock()
            .once
            .entry((command, None))
            .or_default()
            .push_back(result);
        self
    }

    /// Suspend `command` calls (optionally only those for `entry_name`) until
    /// the returned gate is released.
    pub fn hold(&self, command: Command, entry_name: Option<&str>) -> Gate {
        let gate = Gate::new();
        self.script
            .lock()
            .gates
            .insert((command, entry_name.map(str::to_string)), gate.clone());
        gate
    }

    /// Every request received so far, in arrival order.
    pub fn calls(&self) -> Vec<CommandRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, command: Command) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|request| request.command == command)
            .count()
    }

    pub fn last_call(&self, command: Command) -> Option<CommandRequest> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|request| request.command == command)
            .cloned()
    }

    /// Wait until at least `count` calls of `command` have arrived.
    pub async fn wait_for_calls(&self, command: Command, count: usize) {
        let mut rx = self.call_counter.subscribe();
        let _ = rx.wait_for(|_| self.call_count(command) >= count).await;
    }
}

#[async_trait]
impl CommandBoundary for ScriptedBoundary {
    async fn invoke(&self, request: CommandRequest) -> Result<Value> {
        let command = request.command;
        let entry = request.entry_name().map(str::to_string);

        self.calls.lock().push(request);
        self.call_counter.send_modify(|count| *count += 1);

        // Answers are assigned in arrival order; a gate only delays delivery.
        let (result, gate) = {
            let mut script = self.script.lock();
            (
                script.next(command, entry.as_deref()),
                script.gate(command, entry.as_deref()),
            )
        };
        if let Some(gate) = gate {
            gate.wait().await;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_keyed_response_wins_over_generic() {
        let boundary = ScriptedBoundary::new();
        boundary
            .respond(Command::ReadEntry, json!("generic"))
            .respond_for(Command::ReadEntry, "mail", json!("keyed"));

        let keyed = boundary.invoke(CommandRequest::read_entry("mail")).await;
        let generic = boundary.invoke(CommandRequest::read_entry("bank")).await;

        assert_eq!(keyed.unwrap(), json!("keyed"));
        assert_eq!(generic.unwrap(), json!("generic"));
        assert_eq!(boundary.call_count(Command::ReadEntry), 2);
    }

    #[tokio::test]
    async fn test_once_responses_are_consumed_in_order() {
        let boundary = ScriptedBoundary::new();
        boundary
            .respond(Command::List, json!([]))
            .respond_once(Command::List, Err(BridgeError::from("network down")));

        assert!(boundary.invoke(CommandRequest::list()).await.is_err());
        assert_eq!(boundary.invoke(CommandRequest::list()).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_unscripted_command_fails() {
        let boundary = ScriptedBoundary::new();
        let err = boundary.invoke(CommandRequest::export_ledger()).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_held_call_completes_after_release() {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary.respond(Command::GeneratePw, json!("generated"));
        let gate = boundary.hold(Command::GeneratePw, None);

        let task = {
            let boundary = Arc::clone(&boundary);
            tokio::spawn(async move { boundary.invoke(CommandRequest::generate_pw()).await })
        };

        boundary.wait_for_calls(Command::GeneratePw, 1).await;
        assert!(!task.is_finished());

        gate.release();
        assert_eq!(task.await.unwrap().unwrap(), json!("generated"));
    }
}
