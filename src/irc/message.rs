//! Inbound line classification.
//!
//! The bot only cares about two shapes of server line: keepalive PINGs and
//! `PRIVMSG`. Everything else is reported as [`Incoming::Other`] and dropped
//! by the read loop.

/// Channel-name sigil.
pub const CHANNEL_SIGIL: char = '#';

/// Out-of-band control-message (CTCP) delimiter.
pub const CTCP_DELIM: char = '\x01';

const PING: &str = "PING";
const PONG: &str = "PONG";
const PRIVMSG: &str = "PRIVMSG";

/// A chat message addressed to a channel or to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Sender nickname.
    pub sender: String,
    /// Channel name, or `sender` when the message was private.
    pub source: String,
    /// Message text.
    pub body: String,
    /// Full `nick!user@host` of the sender.
    pub origin: String,
    pub is_channel: bool,
}

impl ChatEvent {
    /// `user@host` part of the origin, i.e. the identity without the nickname.
    pub fn host_identity(&self) -> &str {
        self.origin
            .split_once('!')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.origin)
    }

    /// Whether the body is an out-of-band control message.
    pub fn is_ctcp(&self) -> bool {
        self.body.starts_with(CTCP_DELIM)
    }
}

/// What the read loop should do with one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Keepalive PING; carries the ready-made acknowledgement line.
    Ping { reply: String },
    Chat(ChatEvent),
    Other,
}

/// Classify one raw line (terminator already stripped).
pub fn classify(line: &str) -> Incoming {
    if line.starts_with(PING) {
        return Incoming::Ping {
            reply: line.replacen(PING, PONG, 1),
        };
    }
    match parse_privmsg(line) {
        Some(event) => Incoming::Chat(event),
        None => Incoming::Other,
    }
}

/// Parse `:nick!user@host PRIVMSG <target> :<body>` into a [`ChatEvent`].
///
/// Returns `None` for any line that is not a well-formed `PRIVMSG`.
pub fn parse_privmsg(line: &str) -> Option<ChatEvent> {
    let (prefix, rest) = line.split_once(' ')?;
    let (command, params) = rest.split_once(' ')?;
    if command != PRIVMSG {
        return None;
    }

    let origin = prefix.strip_prefix(':')?;
    let sender = origin.split('!').next().filter(|n| !n.is_empty())?;

    // Only the first colon after the command marks the trailing parameter.
    let (targets, body) = params.split_once(':')?;
    let target = targets.split_whitespace().next()?;

    let is_channel = target.starts_with(CHANNEL_SIGIL);
    let source = if is_channel { target } else { sender };

    Some(ChatEvent {
        sender: sender.to_string(),
        source: source.to_string(),
        body: body.to_string(),
        origin: origin.to_string(),
        is_channel,
    })
}
