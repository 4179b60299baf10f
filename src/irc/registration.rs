//! Connect-time handshake.
//!
//! The sequence is fixed-cadence: every command goes out first, then exactly
//! one line is drained from the server before the next command. `USER` is
//! followed by a second drain for the welcome burst. Server replies are not
//! inspected, except that a keepalive PING drained along the way is still
//! answered. A server that stays quiet only delays a step by the drain
//! timeout; it never stalls the handshake.

use std::time::Duration;

use tracing::{debug, info};

use super::message::{classify, Incoming};
use super::transport::{LineTransport, TransportError};
use crate::config::ServerConfig;

const NICKSERV: &str = "NickServ";

/// Sent with `PASS` when no server password is configured.
const NO_PASSWORD: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Connected,
    PasswordSent,
    IdentitySent,
    ProfileSent,
    Authenticated,
    Joining,
    Ready,
}

/// Drives one connection from `Connected` to `Ready`. Any I/O error is
/// returned as-is; there is no retry.
pub struct Registration<'a> {
    transport: &'a mut LineTransport,
    server: &'a ServerConfig,
    drain_timeout: Duration,
    state: RegistrationState,
}

impl<'a> Registration<'a> {
    pub fn new(transport: &'a mut LineTransport, server: &'a ServerConfig) -> Self {
        Self {
            transport,
            server,
            drain_timeout: Duration::from_millis(server.drain_timeout_ms),
            state: RegistrationState::Connected,
        }
    }

    /// Last state reached; after a failed [`run`](Self::run) this is the
    /// step that was in progress.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Run the whole handshake.
    pub async fn run(&mut self) -> Result<RegistrationState, TransportError> {
        let server = self.server;

        let password = server.password.as_deref().unwrap_or(NO_PASSWORD);
        self.step(&format!("PASS {}", password), RegistrationState::PasswordSent)
            .await?;

        let nick = &server.nickname;
        self.step(&format!("NICK {}", nick), RegistrationState::IdentitySent)
            .await?;
        self.step(
            &format!("USER {} 0 * :{}", server.username(), server.realname()),
            RegistrationState::ProfileSent,
        )
        .await?;
        // Welcome burst.
        self.drain().await?;

        if let Some(secret) = &server.nickserv_password {
            self.step(
                &format!("PRIVMSG {} :IDENTIFY {} {}", NICKSERV, secret, nick),
                RegistrationState::Authenticated,
            )
            .await?;
        }

        self.state = RegistrationState::Joining;
        for channel in &server.channels {
            self.transport.send_line(&format!("JOIN {}", channel)).await?;
        }

        self.state = RegistrationState::Ready;
        info!(nick = %nick, channels = server.channels.len(), "registration complete");
        Ok(self.state)
    }

    async fn step(&mut self, line: &str, next: RegistrationState) -> Result<(), TransportError> {
        self.transport.send_line(line).await?;
        self.state = next;
        self.drain().await
    }

    async fn drain(&mut self) -> Result<(), TransportError> {
        let line = match tokio::time::timeout(self.drain_timeout, self.transport.recv_line()).await {
            Ok(line) => line?,
            Err(_) => {
                debug!(state = ?self.state, "no reply from server, continuing");
                return Ok(());
            }
        };
        if let Incoming::Ping { reply } = classify(&line.text()) {
            self.transport.send_line(&reply).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    fn server_config(password: Option<&str>, nickserv: Option<&str>) -> ServerConfig {
        ServerConfig {
            password: password.map(String::from),
            nickname: "bot".into(),
            nickserv_password: nickserv.map(String::from),
            channels: vec!["#one".into(), "#two".into()],
            ..ServerConfig::default()
        }
    }

    /// Plays a server that never speaks first: each client line gets one
    /// reply, `USER` gets two. Records `total` client lines, then sends a
    /// marker line the bot has not been waiting for.
    async fn fake_server(stream: DuplexStream, total: usize) -> Vec<String> {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut seen = Vec::new();

        for _ in 0..total {
            let line = lines.next_line().await.unwrap().unwrap();
            if !line.starts_with("JOIN") {
                write.write_all(b":srv NOTICE * :ok\r\n").await.unwrap();
            }
            if line.starts_with("USER") {
                write.write_all(b":srv 001 bot :Welcome\r\n").await.unwrap();
            }
            seen.push(line);
        }
        write.write_all(b":srv NOTICE * :after registration\r\n").await.unwrap();
        // Keep the pipe open until the bot has read the marker.
        let _ = lines.next_line().await;
        seen
    }

    #[tokio::test]
    async fn full_handshake_with_password_and_nickserv() {
        let (client, server) = tokio::io::duplex(4096);
        let srv = tokio::spawn(fake_server(server, 6));

        let cfg = server_config(Some("letmein"), Some("s3cret"));
        let mut transport = LineTransport::new(client);
        let state = Registration::new(&mut transport, &cfg).run().await.unwrap();
        assert_eq!(state, RegistrationState::Ready);

        // Every server reply was drained: the next line is the marker.
        let next = transport.recv_line().await.unwrap();
        assert_eq!(next.text(), ":srv NOTICE * :after registration");
        drop(transport);

        let seen = srv.await.unwrap();
        assert_eq!(
            seen,
            vec![
                "PASS letmein",
                "NICK bot",
                "USER bot 0 * :bot",
                "PRIVMSG NickServ :IDENTIFY s3cret bot",
                "JOIN #one",
                "JOIN #two",
            ]
        );
    }

    #[tokio::test]
    async fn handshake_without_password_takes_four_round_trips() {
        let (client, server) = tokio::io::duplex(4096);
        let srv = tokio::spawn(fake_server(server, 5));

        let cfg = server_config(None, None);
        let mut transport = LineTransport::new(client);
        tokio::time::timeout(
            Duration::from_secs(2),
            Registration::new(&mut transport, &cfg).run(),
        )
        .await
        .expect("handshake finished")
        .unwrap();

        // PASS, NICK, USER and the welcome burst: four replies consumed.
        let next = transport.recv_line().await.unwrap();
        assert_eq!(next.text(), ":srv NOTICE * :after registration");
        drop(transport);

        let seen = srv.await.unwrap();
        assert_eq!(
            seen,
            vec!["PASS none", "NICK bot", "USER bot 0 * :bot", "JOIN #one", "JOIN #two"]
        );
    }

    #[tokio::test]
    async fn silent_server_does_not_stall_the_handshake() {
        let (client, server) = tokio::io::duplex(4096);
        let srv = tokio::spawn(async move {
            let mut lines = BufReader::new(server).lines();
            let mut seen = Vec::new();
            for _ in 0..4 {
                seen.push(lines.next_line().await.unwrap().unwrap());
            }
            seen
        });

        let cfg = ServerConfig {
            nickname: "bot".into(),
            channels: vec!["#one".into()],
            drain_timeout_ms: 20,
            ..ServerConfig::default()
        };
        let mut transport = LineTransport::new(client);
        let state = tokio::time::timeout(
            Duration::from_secs(2),
            Registration::new(&mut transport, &cfg).run(),
        )
        .await
        .expect("handshake finished")
        .unwrap();
        assert_eq!(state, RegistrationState::Ready);

        let seen = srv.await.unwrap();
        assert_eq!(seen, vec!["PASS none", "NICK bot", "USER bot 0 * :bot", "JOIN #one"]);
    }

    #[tokio::test]
    async fn ping_while_registering_is_answered() {
        let (client, server) = tokio::io::duplex(4096);
        let srv = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            let mut seen = Vec::new();

            // PASS is answered with a keepalive PING.
            seen.push(lines.next_line().await.unwrap().unwrap());
            write.write_all(b"PING :early\r\n").await.unwrap();
            seen.push(lines.next_line().await.unwrap().unwrap());
            // NICK, then USER with its welcome burst.
            seen.push(lines.next_line().await.unwrap().unwrap());
            write.write_all(b":srv NOTICE * :ok\r\n").await.unwrap();
            seen.push(lines.next_line().await.unwrap().unwrap());
            write
                .write_all(b":srv NOTICE * :ok\r\n:srv 001 bot :Welcome\r\n")
                .await
                .unwrap();
            seen
        });

        let cfg = ServerConfig {
            nickname: "bot".into(),
            ..ServerConfig::default()
        };
        let mut transport = LineTransport::new(client);
        Registration::new(&mut transport, &cfg).run().await.unwrap();

        let seen = srv.await.unwrap();
        assert_eq!(
            seen,
            vec!["PASS none", "PONG :early", "NICK bot", "USER bot 0 * :bot"]
        );
    }

    #[tokio::test]
    async fn disconnect_mid_handshake_is_fatal() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut lines = BufReader::new(read).lines();
            lines.next_line().await.unwrap();
            write.write_all(b":srv NOTICE * :hi\r\n").await.unwrap();
            // Dropping both halves closes the pipe before NICK is answered.
        });

        let cfg = server_config(None, None);
        let mut transport = LineTransport::new(client);
        let mut registration = Registration::new(&mut transport, &cfg);
        let err = registration.run().await.unwrap_err();
        // Either the read sees EOF or the write hits the closed pipe first.
        assert!(matches!(
            err,
            TransportError::Closed | TransportError::Codec(_)
        ));
        assert!(matches!(
            registration.state(),
            RegistrationState::PasswordSent | RegistrationState::IdentitySent
        ));
    }

    #[test]
    fn starts_connected() {
        let (client, _server) = tokio::io::duplex(64);
        let mut transport = LineTransport::new(client);
        let cfg = ServerConfig::default();
        let reg = Registration::new(&mut transport, &cfg);
        assert_eq!(reg.state(), RegistrationState::Connected);
    }
}
