//! Pure text-transform commands: `.rot13`, `.rev` and `.spaced`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::commands::{parse_command, BotCommand};
use super::{address, Module, ModuleError, Outcome};
use crate::irc::message::ChatEvent;
use crate::irc::outbound::Outbound;

/// mIRC bold/colour/underline/reverse/reset codes, with colour arguments.
fn formatting_codes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1f|\x01|\x02|\x12|\x1d|\x16|\x0f|\x03(?:\d{1,2}(?:,\d{1,2})?)?")
            .expect("formatting regex is valid")
    })
}

pub fn strip_formatting(text: &str) -> String {
    formatting_codes().replace_all(text, "").into_owned()
}

pub fn rot13(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

pub fn spaced(text: &str) -> String {
    let chars: Vec<String> = strip_formatting(text).chars().map(String::from).collect();
    chars.join(" ")
}

pub struct Rot13;
pub struct Reverse;
pub struct Spaced;

#[async_trait]
impl Module for Rot13 {
    fn name(&self) -> &'static str {
        "rot13"
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError> {
        let Some(BotCommand::Rot13 { text }) = parse_command(&event.body) else {
            return Ok(Outcome::Declined);
        };
        out.reply(&address(event, &rot13(&text)), &event.source).await?;
        Ok(Outcome::Handled)
    }
}

#[async_trait]
impl Module for Reverse {
    fn name(&self) -> &'static str {
        "reverse"
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError> {
        let Some(BotCommand::Reverse { text }) = parse_command(&event.body) else {
            return Ok(Outcome::Declined);
        };
        out.reply(&address(event, &reverse(&text)), &event.source).await?;
        Ok(Outcome::Handled)
    }
}

#[async_trait]
impl Module for Spaced {
    fn name(&self) -> &'static str {
        "spaced"
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError> {
        let Some(BotCommand::Spaced { text }) = parse_command(&event.body) else {
            return Ok(Outcome::Declined);
        };
        out.reply(&address(event, &spaced(&text)), &event.source).await?;
        Ok(Outcome::Handled)
    }
}
