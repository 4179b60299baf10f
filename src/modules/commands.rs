//! Dot-command parser.
//!
//! Parses `.command arg ...` message bodies into typed [`BotCommand`]
//! values that command modules match on.

/// A parsed bot command. Each variant corresponds to a `.command`.
#[derive(Debug, PartialEq, Eq)]
pub enum BotCommand {
    Rot13 { text: String },
    Reverse { text: String },
    Spaced { text: String },
    Ping { host: String },
}

/// Parse a message body into a [`BotCommand`].
///
/// Returns `None` if the body does not start with `.`, names an unknown
/// command, or lacks the argument the command needs. Command names are
/// case-sensitive, matching how users type them in channels.
pub fn parse_command(body: &str) -> Option<BotCommand> {
    let rest = body.strip_prefix('.')?;
    let (cmd, arg) = rest.split_once(' ')?;
    if arg.is_empty() {
        return None;
    }

    match cmd {
        "rot13" => Some(BotCommand::Rot13 { text: arg.to_string() }),
        "rev" => Some(BotCommand::Reverse { text: arg.to_string() }),
        "spaced" | "deavmicomedy" => Some(BotCommand::Spaced { text: arg.to_string() }),
        "ping" => {
            let host = arg.split(' ').next()?.to_string();
            if host.is_empty() {
                return None;
            }
            Some(BotCommand::Ping { host })
        }
        _ => None,
    }
}
