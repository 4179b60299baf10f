//! Line transport: the bot's single connection to the IRC server.
//!
//! Reading stays with the owner of the [`LineTransport`] (the read loop is
//! the only reader of the socket). Writing goes through cloneable
//! [`LineSender`] handles that share one lock, so frames sent from many
//! concurrent tasks are never interleaved mid-line.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use super::codec::{frame_payload, CodecError, LineCodec, RawLine};
use crate::logging::WIRE_TARGET;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection closed by server")]
    Closed,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Cloneable write half. All clones serialize on the same lock.
#[derive(Clone)]
pub struct LineSender {
    writer: Arc<Mutex<FramedWrite<BoxedWriter, LineCodec>>>,
    loud: bool,
}

impl LineSender {
    /// Send one protocol line. The payload is truncated to the frame limit
    /// before the terminator is appended.
    pub async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let payload = frame_payload(line);
        let mut writer = self.writer.lock().await;
        log_wire(self.loud, '>', payload);
        writer.send(payload).await?;
        Ok(())
    }
}

/// The connection: a framed reader plus a shared [`LineSender`].
pub struct LineTransport {
    reader: FramedRead<BoxedReader, LineCodec>,
    sender: LineSender,
}

impl LineTransport {
    /// Open a TCP connection to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: format!("{}:{}", host, port),
                source,
            })?;
        info!("connected to {}:{}", host, port);
        Ok(Self::new(stream))
    }

    /// Wrap any byte stream (a socket, or an in-memory pipe in tests).
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: BoxedReader = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);
        Self {
            reader: FramedRead::new(reader, LineCodec),
            sender: LineSender {
                writer: Arc::new(Mutex::new(FramedWrite::new(writer, LineCodec))),
                loud: true,
            },
        }
    }

    /// Log wire traffic at `info` (`true`) or `debug` (`false`).
    pub fn with_wire_logging(mut self, loud: bool) -> Self {
        self.sender.loud = loud;
        self
    }

    pub fn sender(&self) -> LineSender {
        self.sender.clone()
    }

    pub async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        self.sender.send_line(line).await
    }

    /// Wait for the next complete line. End of stream is [`TransportError::Closed`].
    pub async fn recv_line(&mut self) -> Result<RawLine, TransportError> {
        match self.reader.next().await {
            Some(Ok(line)) => {
                log_wire(self.sender.loud, '<', &line.text());
                Ok(line)
            }
            Some(Err(e)) => Err(e.into()),
            None => Err(TransportError::Closed),
        }
    }
}

fn log_wire(loud: bool, direction: char, line: &str) {
    if loud {
        info!(target: WIRE_TARGET, "{} {}", direction, line);
    } else {
        debug!(target: WIRE_TARGET, "{} {}", direction, line);
    }
}
