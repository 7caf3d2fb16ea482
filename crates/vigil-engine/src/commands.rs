//! Admin commands
//!
//! Inbound text is authorised by a per-adapter [`CommandGate`] before any
//! verb runs. Verbs that need snapshot state are answered by the
//! orchestrator through a [`CommandRequest`]; the rest are answered locally.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use vigil_core::errors::{VgError, VgErrorKind};
use vigil_store::config::DenyReply;

const OP_COMMAND: &str = "admin_command";

pub const HELP_TEXT: &str =
    "Commands: report (full status), diff (last changes), status (overall), version, ping, help";
pub const PERMISSION_DENIED: &str = "Permission denied.";

/// Who sent a command, as far as the platform can vouch for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub nick: String,
    /// Platform-verified account name; `None` when the sender is not identified
    pub account: Option<String>,
}

impl SenderIdentity {
    pub fn new(nick: impl Into<String>, account: Option<String>) -> Self {
        Self {
            nick: nick.into(),
            account,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny { reply: Option<String> },
}

/// Allow-list plus verified-identity check
#[derive(Debug, Clone)]
pub struct CommandGate {
    admins: Vec<String>,
    deny_reply: DenyReply,
}

impl CommandGate {
    pub fn new(admins: &[String], deny_reply: DenyReply) -> Self {
        Self {
            admins: admins.iter().map(|a| a.to_lowercase()).collect(),
            deny_reply,
        }
    }

    /// Allow only a verified account that is on the allow-list (case-insensitive)
    pub fn check(&self, sender: &SenderIdentity) -> GateDecision {
        let allowed = sender
            .account
            .as_deref()
            .map(|account| self.admins.contains(&account.to_lowercase()))
            .unwrap_or(false);

        if allowed {
            GateDecision::Allow
        } else {
            GateDecision::Deny {
                reply: match self.deny_reply {
                    DenyReply::Silent => None,
                    DenyReply::Explicit => Some(PERMISSION_DENIED.to_string()),
                },
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Report,
    Diff,
    Status,
    Version,
    Ping,
    Help,
    Unknown(String),
}

impl AdminCommand {
    /// First word of `text`, case-insensitive; `None` for blank input
    pub fn parse(text: &str) -> Option<Self> {
        let verb = text.split_whitespace().next()?;
        Some(match verb.to_lowercase().as_str() {
            "report" => AdminCommand::Report,
            "diff" => AdminCommand::Diff,
            "status" => AdminCommand::Status,
            "version" => AdminCommand::Version,
            "ping" => AdminCommand::Ping,
            "help" => AdminCommand::Help,
            _ => AdminCommand::Unknown(verb.to_string()),
        })
    }
}

/// Verbs answered from orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusQuery {
    Report,
    Diff,
    Status,
}

#[derive(Debug)]
pub struct CommandRequest {
    pub adapter: String,
    pub query: StatusQuery,
    pub reply: oneshot::Sender<Vec<String>>,
}

/// Handle adapters use to run inbound commands
#[derive(Debug, Clone)]
pub struct CommandDispatch {
    requests: mpsc::Sender<CommandRequest>,
    timeout: Duration,
}

impl CommandDispatch {
    pub fn new(requests: mpsc::Sender<CommandRequest>, timeout: Duration) -> Self {
        Self { requests, timeout }
    }

    /// Authorise and run one inbound command.
    ///
    /// Returns the reply lines, or `None` when nothing should be said.
    pub async fn handle_inbound_command(
        &self,
        adapter: &str,
        gate: &CommandGate,
        sender: &SenderIdentity,
        text: &str,
    ) -> Option<Vec<String>> {
        let command = AdminCommand::parse(text)?;

        if let GateDecision::Deny { reply } = gate.check(sender) {
            let denied = VgError::new(VgErrorKind::Unauthorised)
                .with_op(OP_COMMAND)
                .with_adapter(adapter)
                .with_message(format!("'{}' is not a verified administrator", sender.nick));
            tracing::warn!(
                adapter,
                account = ?sender.account,
                err.code = denied.code(),
                error = %denied,
                "Unauthorised command attempt"
            );
            return reply.map(|r| vec![r]);
        }

        tracing::info!(
            adapter,
            nick = %sender.nick,
            command = ?command,
            "Admin command"
        );

        let query = match command {
            AdminCommand::Ping => return Some(vec!["Pong!".to_string()]),
            AdminCommand::Version => {
                return Some(vec![format!("vigil {}", env!("CARGO_PKG_VERSION"))])
            }
            AdminCommand::Help => return Some(vec![HELP_TEXT.to_string()]),
            AdminCommand::Unknown(verb) => {
                return Some(vec![
                    format!("Unrecognised command: {}", verb),
                    HELP_TEXT.to_string(),
                ])
            }
            AdminCommand::Report => StatusQuery::Report,
            AdminCommand::Diff => StatusQuery::Diff,
            AdminCommand::Status => StatusQuery::Status,
        };

        Some(self.query(adapter, query).await)
    }

    async fn query(&self, adapter: &str, query: StatusQuery) -> Vec<String> {
        let (reply, answer) = oneshot::channel();
        let request = CommandRequest {
            adapter: adapter.to_string(),
            query,
            reply,
        };
        if self.requests.send(request).await.is_err() {
            return vec!["Status is unavailable while shutting down.".to_string()];
        }
        match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(lines)) => lines,
            Ok(Err(_)) => vec!["Status is unavailable while shutting down.".to_string()],
            Err(_) => vec!["Status request timed out.".to_string()],
        }
    }
}
