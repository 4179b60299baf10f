//! Outbound message splitting.
//!
//! A reply may be longer than one frame or span several lines. Each line is
//! cut into chunks that fit the 512-byte limit after the command prefix,
//! the terminator and the prefix the server prepends on relay
//! (`:nick!user@host `) are accounted for. Cuts prefer the last space in
//! the chunk and never land inside a multi-byte character.

use super::codec::{floor_char_boundary, CRLF, MAX_FRAME_LEN};
use super::transport::{LineSender, TransportError};

/// Room kept for `:` `!` `@` and the trailing space of the relay prefix,
/// plus a 10-byte username and a 63-byte hostname. The nickname length is
/// added on top since it is known locally.
pub const HOSTMASK_ALLOWANCE: usize = 4 + 10 + 63;

/// Bytes available for text in one `<command> <target> :<text>` frame.
pub fn payload_budget(command: &str, target: &str, allowance: usize) -> usize {
    // "<command> <target> :"
    let overhead = command.len() + 1 + target.len() + 2 + CRLF.len() + allowance;
    MAX_FRAME_LEN.saturating_sub(overhead).max(1)
}

/// Split one line into chunks of at most `budget` bytes.
///
/// When a chunk would end mid-word it is shortened to the last space inside
/// it and that single space is dropped. A chunk with no space is cut at the
/// byte limit, rounded down to a char boundary.
pub fn chunk_line(line: &str, budget: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = line;

    while rest.len() > budget {
        let mut cut = floor_char_boundary(rest, budget);
        if cut == 0 {
            // Budget smaller than one char: send the char alone.
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let head = &rest[..cut];

        if rest[cut..].starts_with(' ') {
            chunks.push(head);
            rest = &rest[cut + 1..];
            continue;
        }
        match head.rfind(' ') {
            Some(pos) if pos > 0 => {
                chunks.push(&head[..pos]);
                rest = &rest[pos + 1..];
            }
            _ => {
                chunks.push(head);
                rest = &rest[cut..];
            }
        }
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Every frame needed to deliver `text` to `target`, in order.
/// CR and LF both end a line; empty lines are skipped.
pub fn frames(command: &str, target: &str, text: &str, allowance: usize) -> Vec<String> {
    let budget = payload_budget(command, target, allowance);
    text.split(['\r', '\n'])
        .flat_map(|line| chunk_line(line, budget))
        .map(|chunk| format!("{} {} :{}", command, target, chunk))
        .collect()
}

/// Reply path handed to modules: chunks text and sends each frame through
/// the shared [`LineSender`].
///
/// Frames of one reply go out in order, but a reply is not atomic: another
/// task's frames may land between two of them, and a dropped connection
/// may cut a reply short.
#[derive(Clone)]
pub struct Outbound {
    sender: LineSender,
    allowance: usize,
}

impl Outbound {
    pub fn new(sender: LineSender, nickname: &str) -> Self {
        Self {
            sender,
            allowance: nickname.len() + HOSTMASK_ALLOWANCE,
        }
    }

    /// Send `text` to `target` as one or more `PRIVMSG` frames.
    pub async fn reply(&self, text: &str, target: &str) -> Result<(), TransportError> {
        self.send("PRIVMSG", text, target).await
    }

    /// Send `text` to `target` as one or more `NOTICE` frames.
    pub async fn notice(&self, text: &str, target: &str) -> Result<(), TransportError> {
        self.send("NOTICE", text, target).await
    }

    async fn send(&self, command: &str, text: &str, target: &str) -> Result<(), TransportError> {
        for frame in frames(command, target, text, self.allowance) {
            self.sender.send_line(&frame).await?;
        }
        Ok(())
    }
}
