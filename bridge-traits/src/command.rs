//! Command Boundary Abstraction
//!
//! The host application owns the ledger (encryption, storage, network sync)
//! and exposes it to the core as a set of named request/response commands.
//! Each command takes a bag of named arguments and answers with a JSON value
//! or a failure payload.
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::command::{CommandBoundary, CommandRequest};
//!
//! async fn labels(boundary: &dyn CommandBoundary) -> bridge_traits::error::Result<serde_json::Value> {
//!     boundary.invoke(CommandRequest::list()).await
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Argument names understood by the host.
pub mod args {
    pub const ENTRY_NAME: &str = "entryName";
    pub const VALUE: &str = "val";
    pub const KEEP_ORIGINAL: &str = "keepOriginal";
    pub const TEMP_PASSWORD: &str = "tempPw";
    pub const PIN: &str = "pin";
    pub const LEDGER_NAME: &str = "ledgerName";
    pub const MASTER_PASSWORD: &str = "masterPw";

    /// Arguments whose values must never appear in logs.
    pub const SECRET_ARGS: &[&str] = &[VALUE, TEMP_PASSWORD, PIN, MASTER_PASSWORD];
}

/// Commands exposed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    List,
    ReadEntry,
    AddEntry,
    RegenPw,
    RemoveEntry,
    GeneratePw,
    GetConfPair,
    ResolveConflict,
    ExportLedger,
    PushS,
    Push,
    Pull,
    OpenCollection,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::List,
        Command::ReadEntry,
        Command::AddEntry,
        Command::RegenPw,
        Command::RemoveEntry,
        Command::GeneratePw,
        Command::GetConfPair,
        Command::ResolveConflict,
        Command::ExportLedger,
        Command::PushS,
        Command::Push,
        Command::Pull,
        Command::OpenCollection,
    ];

    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::ReadEntry => "read_entry",
            Command::AddEntry => "add_entry",
            Command::RegenPw => "regen_pw",
            Command::RemoveEntry => "remove_entry",
            Command::GeneratePw => "generate_pw",
            Command::GetConfPair => "get_conf_pair",
            Command::ResolveConflict => "resolve_conflict",
            Command::ExportLedger => "export_ledger",
            Command::PushS => "push_s",
            Command::Push => "push",
            Command::Pull => "pull",
            Command::OpenCollection => "open_collection",
        }
    }

    /// Whether a successful call changes the entry list or an entry's
    /// conflict flag.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::AddEntry
                | Command::RegenPw
                | Command::RemoveEntry
                | Command::ResolveConflict
                | Command::Pull
        )
    }
}

impl FromStr for Command {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| BridgeError::NotAvailable(format!("unknown command `{}`", s)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single call across the command boundary.
#[derive(Clone, PartialEq)]
pub struct CommandRequest {
    pub command: Command,
    pub args: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    pub fn arg_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(Value::as_bool)
    }

    /// The `entryName` argument, if the command targets a single entry.
    pub fn entry_name(&self) -> Option<&str> {
        self.arg_str(args::ENTRY_NAME)
    }

    pub fn list() -> Self {
        Self::new(Command::List)
    }

    pub fn read_entry(entry_name: &str) -> Self {
        Self::new(Command::ReadEntry).with_arg(args::ENTRY_NAME, entry_name)
    }

    pub fn add_entry(entry_name: &str, value: &str) -> Self {
        Self::new(Command::AddEntry)
            .with_arg(args::ENTRY_NAME, entry_name)
            .with_arg(args::VALUE, value)
    }

    pub fn regen_pw(entry_name: &str) -> Self {
        Self::new(Command::RegenPw).with_arg(args::ENTRY_NAME, entry_name)
    }

    pub fn remove_entry(entry_name: &str) -> Self {
        Self::new(Command::RemoveEntry).with_arg(args::ENTRY_NAME, entry_name)
    }

    pub fn generate_pw() -> Self {
        Self::new(Command::GeneratePw)
    }

    pub fn get_conf_pair(entry_name: &str) -> Self {
        Self::new(Command::GetConfPair).with_arg(args::ENTRY_NAME, entry_name)
    }

    pub fn resolve_conflict(entry_name: &str, keep_original: bool) -> Self {
        Self::new(Command::ResolveConflict)
            .with_arg(args::ENTRY_NAME, entry_name)
            .with_arg(args::KEEP_ORIGINAL, keep_original)
    }

    pub fn export_ledger() -> Self {
        Self::new(Command::ExportLedger)
    }

    pub fn push_s(temp_password: &str) -> Self {
        Self::new(Command::PushS).with_arg(args::TEMP_PASSWORD, temp_password)
    }

    pub fn push(temp_password: &str) -> Self {
        Self::new(Command::Push).with_arg(args::TEMP_PASSWORD, temp_password)
    }

    pub fn pull(temp_password: &str, pin: &str) -> Self {
        Self::new(Command::Pull)
            .with_arg(args::TEMP_PASSWORD, temp_password)
            .with_arg(args::PIN, pin)
    }

    pub fn open_collection(ledger_name: &str, master_password: &str) -> Self {
        Self::new(Command::OpenCollection)
            .with_arg(args::LEDGER_NAME, ledger_name)
            .with_arg(args::MASTER_PASSWORD, master_password)
    }
}

impl fmt::Debug for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted: Map<String, Value> = self
            .args
            .iter()
            .map(|(key, value)| {
                if args::SECRET_ARGS.contains(&key.as_str()) {
                    (key.clone(), Value::String("[REDACTED]".to_string()))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();

        f.debug_struct("CommandRequest")
            .field("command", &self.command)
            .field("args", &redacted)
            .finish()
    }
}

/// Request/response channel to the host-owned ledger.
///
/// Implementations forward the request to the host (an IPC bridge, an
/// embedded ledger, a test double) and map the host's failure payload through
/// [`BridgeError::from_payload`] so that string failures keep their text.
///
/// Calls are never cancelled by the core. A caller that loses interest in a
/// response simply ignores it when it arrives.
#[async_trait]
pub trait CommandBoundary: Send + Sync {
    /// Issue a command and wait for its response.
    async fn invoke(&self, request: CommandRequest) -> Result<Value>;
}
