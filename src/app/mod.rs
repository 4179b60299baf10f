//! Steady-state operation: the read loop and event dispatch.

pub mod dispatch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::irc::message::{classify, Incoming};
use crate::irc::transport::LineTransport;
use dispatch::Dispatcher;

/// Drain the connection until it fails.
///
/// This is the only reader of the socket and it waits on nothing else.
/// Keepalive PINGs are answered inline; each chat message is handed to its
/// own task when a dispatch slot is free and dropped when none is. Returns
/// only with the error that ended the connection.
pub async fn run(mut transport: LineTransport, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let sender = transport.sender();
    loop {
        let line = transport.recv_line().await.context("connection lost")?;

        match classify(&line.text()) {
            Incoming::Ping { reply } => {
                sender
                    .send_line(&reply)
                    .await
                    .context("failed to answer keepalive")?;
            }
            Incoming::Chat(event) => {
                let Some(permit) = dispatcher.try_acquire() else {
                    warn!(
                        source = %event.source,
                        sender = %event.sender,
                        "dispatch saturated, dropping message"
                    );
                    continue;
                };
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher.dispatch(event).await;
                    drop(permit);
                });
            }
            Incoming::Other => {
                debug!("ignoring line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::dispatch::tests::{recorder, Behavior, Log};
    use super::*;
    use crate::config::CtcpConfig;
    use crate::irc::outbound::Outbound;
    use crate::irc::transport::TransportError;
    use crate::modules::{ModuleKind, Outcome};

    #[tokio::test]
    async fn answers_keepalive_dispatches_chat_and_stops_on_disconnect() {
        let (client, server) = tokio::io::duplex(1 << 16);
        let transport = LineTransport::new(client);
        let out = Outbound::new(transport.sender(), "bot");
        let log = Log::default();
        let dispatcher = Arc::new(Dispatcher::new(
            vec![recorder("seen", ModuleKind::Command, Behavior::Reply(Outcome::Declined), &log)],
            CtcpConfig::default(),
            out,
            Duration::from_secs(1),
            4,
        ));

        let loop_task = tokio::spawn(run(transport, Arc::clone(&dispatcher)));

        let (read_half, mut write_half) = tokio::io::split(server);
        let mut lines = BufReader::new(read_half).lines();

        write_half
            .write_all(b":srv 001 bot :welcome\r\nPING :abc123\r\n:x!u@h PRIVMSG #c :hello\r\n")
            .await
            .unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("PONG :abc123"));

        // Let the spawned dispatch finish before hanging up.
        tokio::time::timeout(Duration::from_secs(1), async {
            while log.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        drop(write_half);
        drop(lines);
        let err = loop_task.await.unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::Closed)
        ));
        // Only the chat line reached the chain.
        assert_eq!(log.lock().unwrap().as_slice(), ["seen"]);
    }

    #[tokio::test]
    async fn keepalive_is_answered_while_dispatch_is_saturated() {
        let (client, server) = tokio::io::duplex(1 << 16);
        let transport = LineTransport::new(client);
        let out = Outbound::new(transport.sender(), "bot");
        let log = Log::default();
        let dispatcher = Arc::new(Dispatcher::new(
            vec![recorder("slow", ModuleKind::Command, Behavior::Hang, &log)],
            CtcpConfig::default(),
            out,
            Duration::from_secs(60),
            1,
        ));

        let loop_task = tokio::spawn(run(transport, Arc::clone(&dispatcher)));

        let (read_half, mut write_half) = tokio::io::split(server);
        let mut lines = BufReader::new(read_half).lines();
        write_half
            .write_all(b":x!u@h PRIVMSG #c :one\r\n:x!u@h PRIVMSG #c :two\r\nPING :busy\r\n")
            .await
            .unwrap();

        let pong = tokio::time::timeout(Duration::from_secs(1), lines.next_line())
            .await
            .expect("PONG while saturated")
            .unwrap();
        assert_eq!(pong.as_deref(), Some("PONG :busy"));

        // The first message holds the only slot; the second was dropped.
        tokio::time::timeout(Duration::from_secs(1), async {
            while log.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(log.lock().unwrap().as_slice(), ["slow"]);

        loop_task.abort();
    }
}
