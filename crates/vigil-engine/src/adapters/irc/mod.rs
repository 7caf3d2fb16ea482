//! IRC adapter
//!
//! Plain TCP line protocol. Connection setup runs strictly in order:
//! capability request, SASL PLAIN when configured, registration
//! (PASS/NICK/USER, wait for `001`), post-login commands, the autojoin
//! delay, then JOIN for every channel destination. The connect timeout
//! bounds the TCP connect and registration only. Reports go out as NOTICE. Admin commands arrive as PRIVMSG,
//! either privately or prefixed in a channel, and the sender's account is
//! taken from the IRCv3 `account` tag.

pub mod format;
pub mod protocol;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use vigil_store::config::IrcConfig;

use crate::adapter::{Alert, ChannelAdapter, Delivery};
use crate::commands::{CommandDispatch, CommandGate, SenderIdentity};
use crate::errors::AdapterError;

use protocol::Message;

const ACCOUNT_TAG_CAP: &str = "account-tag";
const SASL_CAP: &str = "sasl";
const NICK_SUFFIX_RETRIES: usize = 3;

type LineReader = Lines<BufReader<OwnedReadHalf>>;
type SharedWriter = Arc<Mutex<Option<OwnedWriteHalf>>>;

pub struct IrcAdapter {
    name: String,
    config: IrcConfig,
    destinations: Vec<String>,
    gate: CommandGate,
    reader: Mutex<Option<LineReader>>,
    writer: SharedWriter,
}

impl IrcAdapter {
    pub fn new(name: impl Into<String>, config: IrcConfig, destinations: Vec<String>) -> Self {
        let gate = CommandGate::new(&config.admins, config.deny_reply);
        Self {
            name: name.into(),
            config,
            destinations,
            gate,
            reader: Mutex::new(None),
            writer: Arc::new(Mutex::new(None)),
        }
    }

    async fn send(&self, line: &str) -> Result<(), AdapterError> {
        send_line(&self.name, &self.writer, line).await
    }

    /// Nicknames to try, in order: `nick`, the configured alternates, then
    /// `nick` with growing `_` suffixes
    fn nick_candidates(&self) -> Vec<String> {
        let nick = &self.config.nick;
        std::iter::once(nick.clone())
            .chain(self.config.alt_nicks.iter().cloned())
            .chain((1..=NICK_SUFFIX_RETRIES).map(|n| format!("{}{}", nick, "_".repeat(n))))
            .collect()
    }

    /// Capability request, optional SASL PLAIN exchange, PASS/NICK/USER, up to `001`.
    async fn register(&self, reader: &mut LineReader) -> Result<(), AdapterError> {
        let username = self.config.username.as_deref().unwrap_or(&self.config.nick);
        let realname = self.config.realname.as_deref().unwrap_or(&self.config.nick);

        let mut caps = Vec::new();
        if self.config.sasl.is_some() {
            caps.push(SASL_CAP);
        }
        if self.config.request_account_tag {
            caps.push(ACCOUNT_TAG_CAP);
        }
        if !caps.is_empty() {
            self.send(&protocol::cap_req(&caps.join(" "))).await?;
        }
        if let Some(password) = &self.config.password {
            self.send(&protocol::pass(password.expose())).await?;
        }
        let nicks = self.nick_candidates();
        let mut attempt = 0;
        self.send(&protocol::nick(&nicks[attempt])).await?;
        self.send(&protocol::user(username, realname)).await?;

        loop {
            let line = read_line(reader).await?;
            tracing::trace!(adapter = %self.name, line = %line, "<-");
            let Some(msg) = Message::parse(&line) else {
                continue;
            };

            match msg.command.as_str() {
                "001" => return Ok(()),
                "PING" => {
                    self.send(&protocol::pong(msg.param(0).unwrap_or_default()))
                        .await?
                }
                "CAP" => self.on_cap(&msg).await?,
                "AUTHENTICATE" if msg.param(0) == Some("+") => {
                    if let Some(sasl) = &self.config.sasl {
                        let password = sasl.password.as_ref().map(|p| p.expose().as_str());
                        for line in protocol::sasl_plain(&sasl.username, password.unwrap_or_default()) {
                            self.send(&line).await?;
                        }
                    }
                }
                "903" => {
                    tracing::info!(adapter = %self.name, "SASL authentication succeeded");
                    self.send(protocol::CAP_END).await?;
                }
                "902" | "904" | "905" | "906" => return Err(refused("SASL authentication failed", &msg)),
                "433" => {
                    attempt += 1;
                    let Some(next) = nicks.get(attempt) else {
                        return Err(refused("no free nickname", &msg));
                    };
                    tracing::warn!(adapter = %self.name, nick = %next, "Nickname in use, retrying");
                    self.send(&protocol::nick(next)).await?;
                }
                "464" | "465" | "ERROR" => return Err(refused("registration refused", &msg)),
                _ => {}
            }
        }
    }

    async fn on_cap(&self, msg: &Message) -> Result<(), AdapterError> {
        let granted: Vec<&str> = msg
            .params
            .last()
            .map(|caps| caps.split_whitespace().collect())
            .unwrap_or_default();
        match msg.param(1) {
            Some("ACK") => {
                tracing::info!(adapter = %self.name, capabilities = ?granted, "Capabilities granted");
                if self.config.sasl.is_some() && granted.contains(&SASL_CAP) {
                    self.send(protocol::AUTHENTICATE_PLAIN).await
                } else {
                    self.send(protocol::CAP_END).await
                }
            }
            Some("NAK") => {
                if self.config.sasl.is_some() {
                    return Err(refused("server refused SASL", msg));
                }
                tracing::info!(adapter = %self.name, capabilities = ?granted, "Capabilities refused");
                self.send(protocol::CAP_END).await
            }
            _ => Ok(()),
        }
    }

    /// Post-login commands, the autojoin delay, then JOIN for channel destinations.
    async fn join_destinations(&self) -> Result<(), AdapterError> {
        for command in &self.config.login_commands {
            self.send(command).await?;
        }

        if self.config.autojoin_delay_ms > 0 {
            tracing::debug!(
                adapter = %self.name,
                delay_ms = self.config.autojoin_delay_ms,
                "Waiting before joining"
            );
            tokio::time::sleep(Duration::from_millis(self.config.autojoin_delay_ms)).await;
        }

        for destination in self.destinations.iter().filter(|d| protocol::is_channel(d)) {
            self.send(&protocol::join(destination)).await?;
        }
        Ok(())
    }

    async fn notice_all(&self, destinations: &[String], lines: &[String]) -> Result<(), AdapterError> {
        for destination in destinations {
            for line in lines {
                self.send(&protocol::notice(destination, line))
                    .await
                    .map_err(|err| match err {
                        AdapterError::NotConnected => AdapterError::NotConnected,
                        other => AdapterError::Delivery {
                            destination: destination.clone(),
                            reason: other.to_string(),
                        },
                    })?;
            }
        }
        Ok(())
    }

    fn spawn_command(&self, commands: &CommandDispatch, msg: &Message) {
        let (Some(target), Some(text), Some(nick)) = (msg.param(0), msg.param(1), msg.source_nick())
        else {
            return;
        };
        if text.starts_with('\x01') {
            return;
        }

        let (reply_to, command_text) = if protocol::is_channel(target) {
            match text.strip_prefix(self.config.command_prefix.as_str()) {
                Some(stripped) if !self.config.command_prefix.is_empty() => (target, stripped),
                _ => return,
            }
        } else {
            (nick, text)
        };

        let sender = SenderIdentity::new(nick, msg.tag("account").map(str::to_string));
        let reply_to = reply_to.to_string();
        let command_text = command_text.to_string();
        let adapter = self.name.clone();
        let gate = self.gate.clone();
        let commands = commands.clone();
        let writer = Arc::clone(&self.writer);

        tokio::spawn(async move {
            let Some(lines) = commands
                .handle_inbound_command(&adapter, &gate, &sender, &command_text)
                .await
            else {
                return;
            };
            for line in lines {
                if let Err(err) = send_line(&adapter, &writer, &protocol::notice(&reply_to, &line)).await {
                    tracing::warn!(adapter = %adapter, error = %err, "Failed to send command reply");
                    return;
                }
            }
        });
    }
}

fn refused(what: &str, msg: &Message) -> AdapterError {
    AdapterError::Connect {
        reason: format!(
            "{}: {} {}",
            what,
            msg.command,
            msg.params.last().map(String::as_str).unwrap_or_default()
        ),
    }
}

async fn read_line(reader: &mut LineReader) -> Result<String, AdapterError> {
    match reader.next_line().await {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err(AdapterError::TransportLost {
            reason: "connection closed by server".to_string(),
        }),
        Err(err) => Err(AdapterError::TransportLost {
            reason: err.to_string(),
        }),
    }
}

async fn send_line(adapter: &str, writer: &SharedWriter, line: &str) -> Result<(), AdapterError> {
    let mut guard = writer.lock().await;
    let stream = guard.as_mut().ok_or(AdapterError::NotConnected)?;
    tracing::trace!(adapter, line = %protocol::redact(line), "->");

    let mut end = line.len().min(protocol::MAX_LINE_BYTES - 2);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    let mut bytes = Vec::with_capacity(end + 2);
    bytes.extend_from_slice(&line.as_bytes()[..end]);
    bytes.extend_from_slice(b"\r\n");

    let result = match stream.write_all(&bytes).await {
        Ok(()) => stream.flush().await,
        Err(err) => Err(err),
    };
    result.map_err(|err| AdapterError::TransportLost {
        reason: err.to_string(),
    })
}

#[async_trait]
impl ChannelAdapter for IrcAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "irc"
    }

    async fn connect(&self) -> Result<(), AdapterError> {
        let address = (self.config.server.as_str(), self.config.port);
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);

        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| AdapterError::Timeout {
                op: "connect".to_string(),
            })?
            .map_err(|err| AdapterError::Connect {
                reason: format!("{}:{}: {}", self.config.server, self.config.port, err),
            })?;

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half).lines();
        *self.writer.lock().await = Some(write_half);

        tokio::time::timeout(timeout, self.register(&mut reader))
            .await
            .map_err(|_| AdapterError::Timeout {
                op: "registration".to_string(),
            })??;
        tracing::info!(adapter = %self.name, server = %self.config.server, "Registered with server");

        self.join_destinations().await?;
        *self.reader.lock().await = Some(reader);
        Ok(())
    }

    async fn serve(&self, commands: CommandDispatch) -> Result<(), AdapterError> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or(AdapterError::NotConnected)?;

        loop {
            let line = read_line(&mut reader).await?;
            tracing::trace!(adapter = %self.name, line = %line, "<-");
            let Some(msg) = Message::parse(&line) else {
                continue;
            };

            match msg.command.as_str() {
                "PING" => {
                    self.send(&protocol::pong(msg.param(0).unwrap_or_default()))
                        .await?
                }
                "PRIVMSG" => self.spawn_command(&commands, &msg),
                "ERROR" => {
                    return Err(AdapterError::TransportLost {
                        reason: msg.params.last().cloned().unwrap_or_default(),
                    })
                }
                _ => {}
            }
        }
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), AdapterError> {
        let Some(view) = delivery.report_view() else {
            return Ok(());
        };
        self.notice_all(&delivery.destinations, &format::format_report(&view))
            .await
    }

    async fn deliver_alert(&self, alert: &Alert) -> Result<(), AdapterError> {
        self.notice_all(&alert.destinations, &[format::format_alert(&alert.text)])
            .await
    }

    async fn disconnect(&self) {
        self.reader.lock().await.take();
        let writer = self.writer.lock().await.take();
        if let Some(mut stream) = writer {
            let quit = format!("{}\r\n", protocol::quit("Shutting down"));
            if stream.write_all(quit.as_bytes()).await.is_ok() {
                let _ = stream.shutdown().await;
            }
        }
    }
}
