//! IRC line codec: IRCv3 message tags, prefix, command, parameters.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Longest line the server accepts, CRLF included
pub const MAX_LINE_BYTES: usize = 512;

/// Longest AUTHENTICATE payload chunk
const SASL_CHUNK: usize = 400;

/// One parsed protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tags: Vec<(String, String)>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line without its trailing CRLF. `None` for a line with no command.
    pub fn parse(line: &str) -> Option<Message> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = Vec::new();
        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw_tags, remainder) = tagged.split_once(' ')?;
            tags = raw_tags
                .split(';')
                .filter(|t| !t.is_empty())
                .map(|t| match t.split_once('=') {
                    Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
                    None => (t.to_string(), String::new()),
                })
                .collect();
            rest = remainder.trim_start_matches(' ');
        }

        let mut prefix = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (source, remainder) = prefixed.split_once(' ')?;
            prefix = Some(source.to_string());
            rest = remainder.trim_start_matches(' ');
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, remainder)) => (command, remainder),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, remainder)) => {
                    params.push(param.to_string());
                    rest = remainder;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Message {
            tags,
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Nickname part of the prefix
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Line with credentials masked, for debug logging
pub fn redact(line: &str) -> Cow<'_, str> {
    let upper = line.to_ascii_uppercase();
    if upper.starts_with("PASS ") {
        Cow::Owned("PASS ***".to_string())
    } else if upper.starts_with("AUTHENTICATE ")
        && !matches!(&upper["AUTHENTICATE ".len()..], "PLAIN" | "+" | "*")
    {
        Cow::Owned("AUTHENTICATE ***".to_string())
    } else {
        Cow::Borrowed(line)
    }
}

/// Strip line breaks so user text cannot inject extra commands
fn sanitize(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

pub fn pass(password: &str) -> String {
    format!("PASS {}", sanitize(password))
}

pub fn nick(nick: &str) -> String {
    format!("NICK {}", sanitize(nick))
}

pub fn user(username: &str, realname: &str) -> String {
    format!("USER {} 0 * :{}", sanitize(username), sanitize(realname))
}

pub fn join(channel: &str) -> String {
    format!("JOIN {}", sanitize(channel))
}

pub fn pong(token: &str) -> String {
    format!("PONG :{}", sanitize(token))
}

pub fn notice(target: &str, text: &str) -> String {
    format!("NOTICE {} :{}", sanitize(target), sanitize(text))
}

pub fn quit(reason: &str) -> String {
    format!("QUIT :{}", sanitize(reason))
}

pub const CAP_END: &str = "CAP END";

pub fn cap_req(capabilities: &str) -> String {
    format!("CAP REQ :{}", sanitize(capabilities))
}

pub const AUTHENTICATE_PLAIN: &str = "AUTHENTICATE PLAIN";

/// AUTHENTICATE lines carrying a SASL PLAIN response.
///
/// The payload is split into 400 byte chunks; a payload that ends exactly
/// on a chunk boundary is terminated by `AUTHENTICATE +`.
pub fn sasl_plain(username: &str, password: &str) -> Vec<String> {
    let encoded = STANDARD.encode(format!("\0{username}\0{password}"));
    let mut lines: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK)
        .map(|chunk| format!("AUTHENTICATE {}", String::from_utf8_lossy(chunk)))
        .collect();
    if encoded.len() % SASL_CHUNK == 0 {
        lines.push("AUTHENTICATE +".to_string());
    }
    lines
}

/// Whether a channel name (as opposed to a nickname)
pub fn is_channel(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}
