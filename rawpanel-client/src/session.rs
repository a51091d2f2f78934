//! Reconnecting session loop.
//!
//! One [`Session`] owns one TCP connection's lifecycle: dial, negotiate,
//! pump messages in both directions, detect disconnects, retry. The caller
//! exchanges messages through two queues and must keep draining the inbound
//! one; while disconnected the session drains and discards the outbound
//! queue itself so nothing piles up between retries.

use crate::negotiate;
use rawpanel_protocol::ascii;
use rawpanel_protocol::message::{InboundMessage, OutboundFlow, OutboundMessage};
use rawpanel_protocol::{Encoder, MAX_FRAME_PAYLOAD};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Window within which a binary frame's payload must follow its header.
/// Guards against hanging forever on a partially written frame.
const PAYLOAD_TIMEOUT: Duration = Duration::from_secs(2);

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait between dial attempts while the panel is unreachable.
    pub no_connection_retry: Duration,
    /// Wait before redialing after an established connection drops.
    pub reconnection_retry: Duration,
    /// Interval between keepalive PINGs originated by the writer.
    pub keepalive_interval: Duration,
    /// Optional address-family restriction: `"tcp4"` or `"tcp6"`.
    pub network: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            no_connection_retry: Duration::from_secs(3),
            reconnection_retry: Duration::from_secs(1),
            keepalive_interval: Duration::from_millis(1000),
            network: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_no_connection_retry(mut self, period: Duration) -> Self {
        self.no_connection_retry = period;
        self
    }

    pub fn with_reconnection_retry(mut self, period: Duration) -> Self {
        self.reconnection_retry = period;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }
}

/// Called on entering the active state, with any error text the panel sent
/// during negotiation and the negotiated mode (true = binary).
pub type ConnectObserver = Box<dyn Fn(Option<&str>, bool) + Send + Sync>;
/// Called on leaving the active state; the flag is true when the disconnect
/// was requested by the caller rather than caused by the peer or network.
pub type DisconnectObserver = Box<dyn Fn(bool) + Send + Sync>;

/// A reconnecting session against one panel address.
pub struct Session {
    addr: String,
    config: SessionConfig,
    on_connect: Option<ConnectObserver>,
    on_disconnect: Option<DisconnectObserver>,
    shutdown: broadcast::Sender<()>,
    caller_shutdown: Arc<AtomicBool>,
}

impl Session {
    pub fn new(addr: impl Into<String>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            addr: addr.into(),
            config: SessionConfig::default(),
            on_connect: None,
            on_disconnect: None,
            shutdown,
            caller_shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_connect(mut self, callback: impl Fn(Option<&str>, bool) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(callback));
        self
    }

    pub fn on_disconnect(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Box::new(callback));
        self
    }

    /// Requests a permanent shutdown. [`run`](Session::run) returns after the
    /// current connection (if any) is torn down.
    pub fn shutdown(&self) {
        self.caller_shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(());
    }

    /// Drives the session until [`shutdown`](Session::shutdown) is called or
    /// the caller closes its end of either queue.
    ///
    /// `outbound_rx` supplies message batches to send; `inbound_tx` receives
    /// decoded batches from the panel. The caller must keep draining the
    /// inbound queue, otherwise the reader (and with it ping handling) stalls.
    pub async fn run(
        &self,
        mut outbound_rx: mpsc::Receiver<Vec<InboundMessage>>,
        inbound_tx: mpsc::Sender<Vec<OutboundMessage>>,
    ) {
        loop {
            if self.caller_shutdown.load(Ordering::SeqCst) {
                return;
            }
            tracing::debug!(addr = %self.addr, "trying to connect to panel");

            let mut stream = match self.dial().await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(%err, addr = %self.addr, "connect failed");
                    if !self
                        .wait_retry(self.config.no_connection_retry, &mut outbound_rx)
                        .await
                    {
                        return;
                    }
                    continue;
                }
            };
            tracing::debug!("TCP connection established");
            stream.set_nodelay(true).ok();

            let negotiation = match negotiate::detect_binary(&mut stream).await {
                Ok(negotiation) => negotiation,
                Err(err) => {
                    tracing::debug!(%err, "negotiation failed");
                    if !self
                        .wait_retry(self.config.reconnection_retry, &mut outbound_rx)
                        .await
                    {
                        return;
                    }
                    continue;
                }
            };
            let binary = negotiation.binary;
            if let Some(callback) = &self.on_connect {
                callback(negotiation.error_message.as_deref(), binary);
            }

            let (read_half, write_half) = stream.into_split();
            let (internal_tx, internal_rx) = mpsc::channel(8);
            let (quit_tx, quit_rx) = watch::channel(false);

            let writer = tokio::spawn(write_loop(
                write_half,
                outbound_rx,
                internal_rx,
                quit_rx,
                self.shutdown.subscribe(),
                self.caller_shutdown.clone(),
                binary,
                self.config.keepalive_interval,
            ));

            if binary {
                self.read_binary(read_half, &inbound_tx, &internal_tx).await;
            } else {
                self.read_ascii(read_half, &inbound_tx, &internal_tx).await;
            }

            // Reader is done; stop the writer and take the queue back so the
            // next connection reuses it.
            let _ = quit_tx.send(true);
            drop(internal_tx);
            outbound_rx = match writer.await {
                Ok(rx) => rx,
                Err(err) => {
                    tracing::warn!(%err, "writer task failed");
                    return;
                }
            };

            let caller_requested = self.caller_shutdown.load(Ordering::SeqCst);
            tracing::debug!(caller_requested, addr = %self.addr, "connection closed");
            if let Some(callback) = &self.on_disconnect {
                callback(caller_requested);
            }
            if caller_requested {
                return;
            }
            if !self
                .wait_retry(self.config.reconnection_retry, &mut outbound_rx)
                .await
            {
                return;
            }
        }
    }

    async fn dial(&self) -> std::io::Result<TcpStream> {
        let mut last_err = None;
        for addr in lookup_host(self.addr.as_str()).await? {
            let family_ok = match self.config.network.as_deref() {
                Some("tcp4") => addr.is_ipv4(),
                Some("tcp6") => addr.is_ipv6(),
                _ => true,
            };
            if !family_ok {
                continue;
            }
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no usable address")
        }))
    }

    /// Sleeps for `period`, discarding anything the caller enqueues while the
    /// session is disconnected. Returns false when shutdown was requested or
    /// the caller closed the outbound queue.
    async fn wait_retry(
        &self,
        period: Duration,
        outbound_rx: &mut mpsc::Receiver<Vec<InboundMessage>>,
    ) -> bool {
        let mut shutdown_rx = self.shutdown.subscribe();
        if self.caller_shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let sleep = tokio::time::sleep(period);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return false,
                batch = outbound_rx.recv() => match batch {
                    Some(_) => {} // discard while disconnected
                    None => return false,
                },
                _ = &mut sleep => return true,
            }
        }
    }

    async fn read_binary(
        &self,
        mut reader: OwnedReadHalf,
        inbound_tx: &mpsc::Sender<Vec<OutboundMessage>>,
        internal_tx: &mpsc::Sender<Vec<InboundMessage>>,
    ) {
        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            if self.caller_shutdown.load(Ordering::SeqCst) {
                return;
            }

            // Waiting for the next header is the one intentionally unbounded
            // read; keepalives plus TCP's own dead-peer detection provide
            // liveness.
            let mut header = [0u8; 4];
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                result = reader.read_exact(&mut header) => {
                    if let Err(err) = result {
                        tracing::debug!(%err, "binary read ended");
                        return;
                    }
                }
            }

            let length = u32::from_le_bytes(header);
            if length >= MAX_FRAME_PAYLOAD {
                tracing::warn!(length, "declared payload exceeds limit, dropping connection");
                return;
            }

            let mut payload = vec![0u8; length as usize];
            match tokio::time::timeout(PAYLOAD_TIMEOUT, reader.read_exact(&mut payload)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    tracing::debug!(%err, "binary read ended");
                    return;
                }
                Err(_) => {
                    tracing::debug!("timed out waiting for frame payload");
                    return;
                }
            }

            let msg: OutboundMessage = match serde_json::from_slice(&payload) {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::debug!(%err, "dropping undecodable frame");
                    continue;
                }
            };

            // Answer pings on the spot, bypassing the caller's queues.
            if msg.flow == OutboundFlow::Ping {
                let _ = internal_tx.send(vec![InboundMessage::ack()]).await;
            }
            if inbound_tx.send(vec![msg]).await.is_err() {
                self.caller_shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }
    }

    async fn read_ascii(
        &self,
        reader: OwnedReadHalf,
        inbound_tx: &mpsc::Sender<Vec<OutboundMessage>>,
        internal_tx: &mpsc::Sender<Vec<InboundMessage>>,
    ) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        loop {
            if self.caller_shutdown.load(Ordering::SeqCst) {
                return;
            }

            line.clear();
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                result = reader.read_line(&mut line) => match result {
                    Ok(0) => {
                        tracing::debug!("panel disconnected");
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(%err, "ASCII read ended");
                        return;
                    }
                }
            }

            let msgs = ascii::decode_outbound(&[line.trim()]);
            if msgs.is_empty() {
                continue;
            }
            if msgs.iter().any(|msg| msg.flow == OutboundFlow::Ping) {
                let _ = internal_tx.send(vec![InboundMessage::ack()]).await;
            }
            if inbound_tx.send(msgs).await.is_err() {
                self.caller_shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

/// Writer side of one connection. Owns the caller's outbound queue for the
/// connection's lifetime and hands it back on exit.
#[allow(clippy::too_many_arguments)]
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<Vec<InboundMessage>>,
    mut internal_rx: mpsc::Receiver<Vec<InboundMessage>>,
    mut quit_rx: watch::Receiver<bool>,
    mut shutdown_rx: broadcast::Receiver<()>,
    caller_shutdown: Arc<AtomicBool>,
    binary: bool,
    keepalive: Duration,
) -> mpsc::Receiver<Vec<InboundMessage>> {
    let mut keepalive_ticks = interval_at(Instant::now() + keepalive, keepalive);
    keepalive_ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                // Send FIN so a peer that only writes notices the teardown;
                // our reader exits through its own shutdown signal.
                let _ = writer.shutdown().await;
                return outbound_rx;
            }
            _ = quit_rx.changed() => return outbound_rx,
            batch = outbound_rx.recv() => match batch {
                Some(batch) => write_batch(&mut writer, &batch, binary).await,
                None => {
                    // Caller dropped its sender; treat like a shutdown
                    // request.
                    caller_shutdown.store(true, Ordering::SeqCst);
                    let _ = writer.shutdown().await;
                    return outbound_rx;
                }
            },
            batch = internal_rx.recv() => match batch {
                Some(batch) => write_batch(&mut writer, &batch, binary).await,
                None => return outbound_rx, // reader gone, teardown follows
            },
            _ = keepalive_ticks.tick() => {
                write_batch(&mut writer, &[InboundMessage::ping()], binary).await;
            }
        }
    }
}

/// Writes one batch in the negotiated encoding. Write errors are logged and
/// swallowed; the reader notices the dead connection and drives teardown.
async fn write_batch(writer: &mut OwnedWriteHalf, batch: &[InboundMessage], binary: bool) {
    if binary {
        for msg in batch {
            match Encoder::encode_inbound(msg) {
                Ok(frame) => {
                    if let Err(err) = writer.write_all(&frame).await {
                        tracing::debug!(%err, "write failed");
                        return;
                    }
                }
                Err(err) => tracing::warn!(%err, "dropping unencodable message"),
            }
        }
    } else {
        for line in ascii::encode_inbound(batch) {
            if let Err(err) = writer.write_all(format!("{line}\n").as_bytes()).await {
                tracing::debug!(%err, "write failed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawpanel_protocol::message::{Command, InboundFlow};
    use rawpanel_protocol::Decoder;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    fn test_config() -> SessionConfig {
        SessionConfig::new()
            .with_no_connection_retry(Duration::from_millis(50))
            .with_reconnection_retry(Duration::from_millis(50))
            .with_keepalive_interval(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_ascii_session_pumps_both_directions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 512];
            // Binary probe arrives; answer with a short ASCII line so the
            // client settles on ASCII mode without waiting out the deadline.
            sock.read(&mut buf).await.unwrap();
            sock.write_all(b"ack\n").await.unwrap();
            // Wait for the client's flush newline before sending more, so
            // the negotiation read cannot swallow the identity lines.
            sock.read(&mut buf).await.unwrap();

            // Panel identity, then a button event.
            sock.write_all(b"_serial=4029\n").await.unwrap();
            sock.write_all(b"HWC#3=Down\n").await.unwrap();

            // The client enqueued a command; it must arrive as a line,
            // possibly with keepalive pings in between.
            let mut reader = BufReader::new(sock);
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    panic!("connection closed before command arrived");
                }
                match line.trim() {
                    "" | "ping" => continue,
                    other => {
                        assert_eq!(other, "list");
                        break;
                    }
                }
            }
            let _ = seen_tx.send(());

            // Keep the connection open until the client shuts down, so the
            // disconnect is attributed to the caller, not the peer.
            loop {
                line.clear();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    return;
                }
            }
        });

        let (to_tx, to_rx) = mpsc::channel(8);
        let (from_tx, mut from_rx) = mpsc::channel(8);

        let connects = Arc::new(AtomicUsize::new(0));
        let disconnect_flag = Arc::new(Mutex::new(None));
        let session = {
            let connects = connects.clone();
            let disconnect_flag = disconnect_flag.clone();
            Arc::new(
                Session::new(addr)
                    .with_config(test_config())
                    .on_connect(move |error, binary| {
                        assert!(error.is_none());
                        assert!(!binary);
                        connects.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_disconnect(move |caller| {
                        *disconnect_flag.lock().unwrap() = Some(caller);
                    }),
            )
        };

        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run(to_rx, from_tx).await })
        };

        // First inbound batch carries the serial.
        let msgs = tokio::time::timeout(Duration::from_secs(5), from_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msgs[0].panel_info.as_ref().unwrap().serial, "4029");

        // Second carries the event.
        let msgs = tokio::time::timeout(Duration::from_secs(5), from_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msgs[0].events.len(), 1);

        to_tx
            .send(vec![InboundMessage::command(Command::SendPanelInfo)])
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), seen_rx)
            .await
            .unwrap()
            .unwrap();

        session.shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(*disconnect_flag.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_binary_session_answers_ping_with_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 512];
            sock.read(&mut buf).await.unwrap();
            let ack = Encoder::encode_outbound(&OutboundMessage::ack()).unwrap();
            sock.write_all(&ack).await.unwrap();
            // Wait for the client's first keepalive so the negotiation read
            // has definitely consumed only the ACK frame. The bytes are fed
            // to the frame decoder below.
            let leftover = sock.read(&mut buf).await.unwrap();

            // Deliver a record, then ping the client.
            let msg = OutboundMessage {
                sleep_timeout: Some(rawpanel_protocol::message::SleepTimeout { value: 42 }),
                ..Default::default()
            };
            sock.write_all(&Encoder::encode_outbound(&msg).unwrap())
                .await
                .unwrap();
            sock.write_all(&Encoder::encode_outbound(&OutboundMessage::ping()).unwrap())
                .await
                .unwrap();

            // Expect an ACK frame back within the keepalive chatter.
            let mut decoder = Decoder::new();
            decoder.extend(&buf[..leftover]);
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before ACK arrived");
                decoder.extend(&buf[..n]);
                while let Some(msg) = decoder.decode_inbound().unwrap() {
                    match msg.flow {
                        InboundFlow::Ack => return,
                        InboundFlow::Ping | InboundFlow::None => {}
                        other => panic!("unexpected flow {other:?}"),
                    }
                }
            }
        });

        let (_to_tx, to_rx) = mpsc::channel(8);
        let (from_tx, mut from_rx) = mpsc::channel(8);
        let session = Arc::new(Session::new(addr).with_config(test_config()));
        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run(to_rx, from_tx).await })
        };

        let msgs = tokio::time::timeout(Duration::from_secs(5), from_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msgs[0].sleep_timeout.unwrap().value, 42);

        server.await.unwrap();
        session.shutdown();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_oversized_frame_drops_connection_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            let (mut sock, _) = listener.accept().await.unwrap();
            sock.read(&mut buf).await.unwrap();
            let ack = Encoder::encode_outbound(&OutboundMessage::ack()).unwrap();
            sock.write_all(&ack).await.unwrap();
            // Let negotiation finish (first keepalive) before the garbage,
            // so the ACK reply is read on its own.
            sock.read(&mut buf).await.unwrap();
            // Garbage framing: a header declaring 600,000 bytes.
            sock.write_all(&600_000u32.to_le_bytes()).await.unwrap();

            // The client must drop the connection and dial again.
            let (mut sock2, _) = listener.accept().await.unwrap();
            sock2.read(&mut buf).await.unwrap();
            sock2.write_all(&ack).await.unwrap();
        });

        let (_to_tx, to_rx) = mpsc::channel(8);
        let (from_tx, _from_rx) = mpsc::channel(8);

        let connects = Arc::new(AtomicUsize::new(0));
        let peer_disconnects = Arc::new(AtomicUsize::new(0));
        let session = {
            let connects = connects.clone();
            let peer_disconnects = peer_disconnects.clone();
            Arc::new(
                Session::new(addr)
                    .with_config(test_config())
                    .on_connect(move |_, _| {
                        connects.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_disconnect(move |caller| {
                        if !caller {
                            peer_disconnects.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
            )
        };
        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run(to_rx, from_tx).await })
        };

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();

        session.shutdown();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert!(peer_disconnects.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_outbound_drained_while_disconnected() {
        // A port with nothing listening: dials fail immediately.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (to_tx, to_rx) = mpsc::channel(1);
        let (from_tx, _from_rx) = mpsc::channel(8);
        let session = Arc::new(Session::new(addr).with_config(test_config()));
        let runner = {
            let session = session.clone();
            tokio::spawn(async move { session.run(to_rx, from_tx).await })
        };

        // With a capacity-1 queue, these sends only succeed because the
        // session keeps discarding while disconnected.
        for _ in 0..5 {
            tokio::time::timeout(
                Duration::from_secs(2),
                to_tx.send(vec![InboundMessage::ping()]),
            )
            .await
            .expect("send should not block while disconnected")
            .unwrap();
        }

        session.shutdown();
        tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .unwrap()
            .unwrap();
    }
}
