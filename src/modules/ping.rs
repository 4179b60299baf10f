//! `.ping <host>`: runs the system `ping` and reports its summary line.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::commands::{parse_command, BotCommand};
use super::{Module, ModuleError, Outcome};
use crate::irc::message::ChatEvent;
use crate::irc::outbound::Outbound;

pub struct PingModule;

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Pick the line to report from a finished `ping` run.
pub fn summarize(success: bool, stdout: &str, stderr: &str) -> Option<String> {
    let line = if success {
        last_line(stdout)
    } else {
        last_line(stderr).or_else(|| last_line(stdout))
    };
    line.map(String::from)
}

#[async_trait]
impl Module for PingModule {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn handle(&self, event: &ChatEvent, out: &Outbound) -> Result<Outcome, ModuleError> {
        let Some(BotCommand::Ping { host }) = parse_command(&event.body) else {
            return Ok(Outcome::Declined);
        };
        // Never let user input become a flag.
        if host.starts_with('-') {
            return Ok(Outcome::Handled);
        }

        debug!(host = %host, "running ping");
        let output = Command::new("ping")
            .args(["-c", "4", "-i", "0.2", host.as_str()])
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(line) = summarize(output.status.success(), &stdout, &stderr) {
            out.reply(&line, &event.source).await?;
        }
        Ok(Outcome::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::{event, pipe, written};

    #[test]
    fn success_reports_last_stdout_line() {
        let stdout = "PING x (1.2.3.4)\n64 bytes\n\n--- x ping statistics ---\nrtt min/avg/max = 1/2/3 ms\n\n";
        assert_eq!(
            summarize(true, stdout, "").as_deref(),
            Some("rtt min/avg/max = 1/2/3 ms")
        );
    }

    #[test]
    fn failure_prefers_stderr_then_stdout() {
        assert_eq!(
            summarize(false, "partial", "ping: unknown host\n").as_deref(),
            Some("ping: unknown host")
        );
        assert_eq!(
            summarize(false, "100% packet loss\n", "  \n").as_deref(),
            Some("100% packet loss")
        );
        assert_eq!(summarize(false, "", ""), None);
    }

    #[tokio::test]
    async fn flag_like_hosts_are_refused_silently() {
        let (out, transport, server) = pipe();
        let outcome = PingModule
            .handle(&event(":ann!a@h PRIVMSG #c :.ping -f"), &out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Handled);
        assert!(written(out, transport, server).await.is_empty());
    }
}
