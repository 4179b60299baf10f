//! Find/replace edits of a user's previous channel message.
//!
//! Every ordinary channel message is remembered per (channel, `user@host`).
//! A message of the form `s/find/replace/flags` rewrites the remembered text
//! and echoes the result to the channel. Edits never refresh the cache, so
//! repeated edits always apply to the last original message.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{Module, ModuleError, Outcome};
use crate::irc::message::ChatEvent;
use crate::irc::outbound::Outbound;

const TRIGGER: &str = "s/";
const DELIM: char = '/';
const ELLIPSIS: &str = "...";

/// Compiled-regex size cap; user patterns are untrusted.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A parsed `s/find/replace/flags` edit.
#[derive(Debug)]
pub struct Substitution {
    pattern: Regex,
    replacement: String,
    global: bool,
}

impl Substitution {
    /// Parse an edit trigger. `None` for anything malformed: a missing
    /// replacement field, an empty pattern, an unknown flag, or a pattern
    /// the regex engine rejects.
    pub fn parse(body: &str) -> Option<Self> {
        let fields = split_fields(body.strip_prefix(TRIGGER)?);
        let (pattern, replacement, flags) = match fields.as_slice() {
            [p, r] => (p, r, ""),
            [p, r, f] => (p, r, f.as_str()),
            _ => return None,
        };
        if pattern.is_empty() {
            return None;
        }

        let (mut global, mut insensitive, mut multi_line) = (false, false, false);
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => insensitive = true,
                'm' => multi_line = true,
                _ => return None,
            }
        }

        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(insensitive)
            .multi_line(multi_line)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .ok()?;

        Some(Self {
            pattern,
            replacement: translate_replacement(replacement),
            global,
        })
    }

    /// Replace the first match, or every match with the `g` flag.
    pub fn apply(&self, text: &str) -> String {
        let limit = if self.global { 0 } else { 1 };
        self.pattern
            .replacen(text, limit, self.replacement.as_str())
            .into_owned()
    }
}

/// Split on unescaped `/`. `\/` becomes a literal `/`; every other escape
/// is passed through untouched for the regex engine.
fn split_fields(edit: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = edit.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(DELIM) => field.push(DELIM),
                Some(next) => {
                    field.push('\\');
                    field.push(next);
                }
                None => field.push('\\'),
            },
            DELIM => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);

    // A trailing delimiter with no flags after it.
    if fields.len() == 3 && fields[2].is_empty() {
        fields.pop();
    }
    fields
}

/// Turn a sed-style replacement into `regex` syntax: `\1` and `\g<name>`
/// become group references, `$` is literal, `\n` is a newline and any
/// other escaped char stands for itself.
fn translate_replacement(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.next() {
                Some(d @ '0'..='9') => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('g') if chars.peek() == Some(&'<') => {
                    chars.next();
                    let name: String = chars.by_ref().take_while(|&ch| ch != '>').collect();
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
                Some('n') => out.push('\n'),
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Cut `text` to `limit` chars, backing off to the last space when there is
/// one, and mark the cut with an ellipsis.
pub fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    let head = match head.rfind(' ') {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head.as_str(),
    };
    format!("{}{}", head, ELLIPSIS)
}

/// The edit module. One instance owns the cache for the process lifetime;
/// entries are never evicted.
pub struct SedModule {
    // channel -> user@host -> last message
    messages: DashMap<String, HashMap<String, String>>,
    max_length: usize,
}

impl SedModule {
    pub fn new(max_length: usize) -> Self {
        Self {
            messages: DashMap::new(),
            max_length,
        }
    }

    fn remember(&self, channel: &str, identity: &str, text: &str) {
        self.messages
            .entry(channel.to_string())
            .or_default()
            .insert(identity.to_string(), text.to_string());
    }

    fn recall(&self, channel: &str, identity: &str) -> Option<String> {
        self.messages
            .get(channel)
            .and_then(|by_identity| by_identity.get(identity).cloned())
    }
}

#[async_trait]
impl Module for SedModule {
    fn name(&self) -> &'static str {
        "sed"
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError> {
        if !event.is_channel {
            return Ok(Outcome::Declined);
        }

        let identity = event.host_identity();
        if !event.body.starts_with(TRIGGER) {
            self.remember(&event.source, identity, &event.body);
            return Ok(Outcome::Declined);
        }

        let Some(previous) = self.recall(&event.source, identity) else {
            return Ok(Outcome::Handled);
        };
        let Some(substitution) = Substitution::parse(&event.body) else {
            debug!(body = %event.body, "ignoring malformed edit");
            return Ok(Outcome::Handled);
        };

        let edited = substitution.apply(&previous);
        out.reply(&shorten(&edited, self.max_length), &event.source)
            .await?;
        Ok(Outcome::Handled)
    }
}
