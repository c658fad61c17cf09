// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Line-oriented stream connection shared by the RFCOMM and TCP transports.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[cfg(feature = "bluetooth")]
use super::bluetooth::RfcommConnector;
use super::protocol::{decode_line, frame_line};
use super::tcp::TcpConnector;
use super::Variant;
use crate::error::TransportError;
use crate::state::{ConnectionStatus, LinkState};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Events emitted by a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection established.
    Connected { endpoint: String },
    /// One decoded line from the device.
    MessageReceived(String),
    /// Connection closed by the device.
    Disconnected,
    /// Error occurred.
    Error(String),
}

/// Result of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// No live connection; the command was discarded.
    Dropped,
}

/// How a stream connection reaches the device.
#[derive(Debug, Clone)]
pub enum Connector {
    Tcp(TcpConnector),
    #[cfg(feature = "bluetooth")]
    Rfcomm(RfcommConnector),
}

impl Connector {
    pub fn endpoint(&self) -> String {
        match self {
            Connector::Tcp(tcp) => tcp.endpoint(),
            #[cfg(feature = "bluetooth")]
            Connector::Rfcomm(rfcomm) => rfcomm.endpoint(),
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Connector::Tcp(_) => Variant::Tcp,
            #[cfg(feature = "bluetooth")]
            Connector::Rfcomm(_) => Variant::Bluetooth,
        }
    }
}

/// The single session to a streaming device.
///
/// One connect attempt is made; when the stream ends the connection stays
/// down and sends become no-ops.
pub struct StreamConnection {
    connector: Connector,
    state: Arc<LinkState>,
    writer: Arc<Mutex<Option<BoxedWriter>>>,
    reader_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    event_tx: mpsc::Sender<LinkEvent>,
    event_rx: Option<mpsc::Receiver<LinkEvent>>,
}

impl StreamConnection {
    /// Create an unconnected session.
    pub fn new(connector: Connector) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            connector,
            state: LinkState::new(),
            writer: Arc::new(Mutex::new(None)),
            reader_task: parking_lot::Mutex::new(None),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn variant(&self) -> Variant {
        self.connector.variant()
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// Take the event receiver (can only be called once).
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<LinkEvent>> {
        self.event_rx.take()
    }

    /// Make the single connection attempt.
    ///
    /// Failure is reported through the returned status and an `Error` event.
    pub async fn connect(&self) -> ConnectionStatus {
        if self.state.is_connected() {
            debug!("Already connected to {}", self.endpoint());
            return self.state.status();
        }

        let endpoint = self.endpoint();
        info!("Connecting to {}...", endpoint);
        self.state.set_connecting();

        let result = match &self.connector {
            Connector::Tcp(tcp) => match tcp.connect().await {
                Ok(stream) => {
                    self.attach(stream).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            #[cfg(feature = "bluetooth")]
            Connector::Rfcomm(rfcomm) => match rfcomm.connect().await {
                Ok(stream) => {
                    self.attach(stream).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            self.fail(&endpoint, e).await;
        }

        self.state.status()
    }

    async fn fail(&self, endpoint: &str, e: TransportError) {
        error!("Connection to {} failed: {}", endpoint, e);
        self.state.set_failed(e.to_string());
        let _ = self.event_tx.send(LinkEvent::Error(e.to_string())).await;
    }

    /// Adopt an established stream and start reading from it.
    pub async fn attach<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let endpoint = self.endpoint();
        let (reader, writer) = tokio::io::split(stream);
        let writer: BoxedWriter = Box::new(writer);

        *self.writer.lock().await = Some(writer);
        self.state.set_connected();
        info!("Connected to {}", endpoint);

        let _ = self.event_tx.send(LinkEvent::Connected { endpoint }).await;

        let task = tokio::spawn(run_reader(
            reader,
            self.state.clone(),
            self.writer.clone(),
            self.event_tx.clone(),
        ));
        if let Some(previous) = self.reader_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Send one command line. Dropped silently when not connected.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            debug!("Not connected, dropping command: {}", text.trim());
            return SendOutcome::Dropped;
        };

        let line = frame_line(text);
        match write_line(writer, &line).await {
            Ok(()) => {
                debug!("Sent: {}", line.trim_end());
                SendOutcome::Sent
            }
            Err(e) => {
                warn!("Write failed, connection invalidated: {}", e);
                guard.take();
                self.state.set_failed(e.to_string());
                let _ = self.event_tx.try_send(LinkEvent::Error(e.to_string()));
                SendOutcome::Dropped
            }
        }
    }

    /// Release the connection. Later sends are no-ops.
    pub async fn close(&self) {
        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
            info!("Connection to {} closed", self.endpoint());
        }
        self.state.set_disconnected();
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.get_mut().take() {
            task.abort();
        }
    }
}

async fn write_line(writer: &mut BoxedWriter, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

/// Read newline-delimited messages until the stream ends.
async fn run_reader<R>(
    reader: R,
    state: Arc<LinkState>,
    writer: Arc<Mutex<Option<BoxedWriter>>>,
    event_tx: mpsc::Sender<LinkEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();

        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Connection closed by remote");
                writer.lock().await.take();
                state.set_disconnected();
                let _ = event_tx.send(LinkEvent::Disconnected).await;
                break;
            }
            Ok(_) => {
                if let Some(line) = decode_line(&buf) {
                    debug!("Received: {}", line);
                    let _ = event_tx.send(LinkEvent::MessageReceived(line)).await;
                }
            }
            Err(e) => {
                error!("Read error: {}", e);
                writer.lock().await.take();
                state.set_failed(e.to_string());
                let _ = event_tx.send(LinkEvent::Error(e.to_string())).await;
                let _ = event_tx.send(LinkEvent::Disconnected).await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, ReadBuf};
    use tokio::net::TcpListener;

    /// Stream that never yields data and fails every write.
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn listener() -> (TcpListener, TcpConnector) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, TcpConnector::new(addr.ip().to_string(), addr.port()))
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_dropped() {
        let connection = StreamConnection::new(Connector::Tcp(TcpConnector::new("127.0.0.1", 9)));
        assert_eq!(connection.send("CMD:AWAY_ON").await, SendOutcome::Dropped);
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_write_error_invalidates_connection() {
        let connector = TcpConnector::new("127.0.0.1", 9);
        let mut connection = StreamConnection::new(Connector::Tcp(connector));
        let mut events = connection.take_events().unwrap();

        connection.attach(BrokenPipe).await;
        assert!(connection.status().is_connected());
        assert!(matches!(events.recv().await, Some(LinkEvent::Connected { .. })));

        assert_eq!(connection.send("CMD:SEC_ON").await, SendOutcome::Dropped);
        assert!(matches!(connection.status(), ConnectionStatus::Failed(_)));
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::Error("broken pipe".to_string()))
        );

        // Writer was released; later sends are no-ops.
        assert_eq!(connection.send("CMD:SEC_ON").await, SendOutcome::Dropped);
        assert!(matches!(connection.status(), ConnectionStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let (listener, connector) = listener().await;
        drop(listener);

        let mut connection = StreamConnection::new(Connector::Tcp(connector));
        let mut events = connection.take_events().unwrap();
        assert!(connection.take_events().is_none());

        let status = connection.connect().await;
        assert!(matches!(status, ConnectionStatus::Failed(_)));
        assert!(matches!(events.recv().await, Some(LinkEvent::Error(_))));
        assert_eq!(connection.send("CMD:SEC_ON").await, SendOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_send_writes_terminated_line() {
        let (listener, connector) = listener().await;
        let connection = StreamConnection::new(Connector::Tcp(connector));

        let (status, accepted) = tokio::join!(connection.connect(), listener.accept());
        assert_eq!(status, ConnectionStatus::Connected);
        let (mut peer, _) = accepted.unwrap();

        assert_eq!(connection.send("CMD:AWAY_ON").await, SendOutcome::Sent);
        connection.close().await;

        let mut received = String::new();
        peer.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "CMD:AWAY_ON\n");
    }

    #[tokio::test]
    async fn test_chunk_with_several_lines_is_split() {
        let (listener, connector) = listener().await;
        let mut connection = StreamConnection::new(Connector::Tcp(connector));
        let mut events = connection.take_events().unwrap();

        let (_, accepted) = tokio::join!(connection.connect(), listener.accept());
        let (mut peer, _) = accepted.unwrap();
        peer.write_all(b"Away mode armed\r\n\nMotion detected\nDoor")
            .await
            .unwrap();
        drop(peer);

        let endpoint = connection.endpoint();
        assert_eq!(events.recv().await, Some(LinkEvent::Connected { endpoint }));
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::MessageReceived("Away mode armed".to_string()))
        );
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::MessageReceived("Motion detected".to_string()))
        );
        assert_eq!(
            events.recv().await,
            Some(LinkEvent::MessageReceived("Door".to_string()))
        );
        assert_eq!(events.recv().await, Some(LinkEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_remote_close_invalidates_connection() {
        let (listener, connector) = listener().await;
        let mut connection = StreamConnection::new(Connector::Tcp(connector));
        let mut events = connection.take_events().unwrap();

        let (_, accepted) = tokio::join!(connection.connect(), listener.accept());
        drop(accepted.unwrap());

        while let Some(event) = events.recv().await {
            if event == LinkEvent::Disconnected {
                break;
            }
        }

        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
        assert_eq!(connection.send("CMD:AWAY_OFF").await, SendOutcome::Dropped);

        // No automatic reconnection.
        assert_eq!(connection.status(), ConnectionStatus::Disconnected);
    }
}
