//! High-level panel handle.
//!
//! [`Panel::connect`] wires up a [`Session`], requests the panel's identity
//! and topology, and waits for initialization before handing the panel to
//! the caller. Hardware events fan out on a broadcast channel; everything
//! else is reachable through the cached [`PanelState`] and the raw message
//! queue.

use crate::error::ClientError;
use crate::session::{Session, SessionConfig};
use crate::state::PanelState;
use rawpanel_protocol::message::{
    Command, HwcColor, HwcEvent, HwcMode, HwcState, HwcText, InboundMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// How long the panel gets to deliver its identity after connecting.
pub const INIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Heartbeat interval requested from the panel at initialization.
pub const DEFAULT_HEARTBEAT_MS: u32 = 3000;

const QUEUE_CAPACITY: usize = 16;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A connected, initialized panel.
pub struct Panel {
    session: Arc<Session>,
    to_panel: mpsc::Sender<Vec<InboundMessage>>,
    state: Arc<PanelState>,
    events: broadcast::Sender<HwcEvent>,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel").finish_non_exhaustive()
    }
}

impl Panel {
    /// Connects with default session configuration.
    pub async fn connect(addr: impl Into<String>) -> Result<Self, ClientError> {
        Self::connect_with(addr, SessionConfig::default()).await
    }

    /// Connects, requests panel identity/topology/availability, and waits up
    /// to [`INIT_TIMEOUT`] for the panel to respond. A panel that connects
    /// but never identifies itself yields [`ClientError::InitTimeout`].
    pub async fn connect_with(
        addr: impl Into<String>,
        config: SessionConfig,
    ) -> Result<Self, ClientError> {
        let (to_tx, to_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (from_tx, from_rx) = mpsc::channel(QUEUE_CAPACITY);

        let session = Arc::new(Session::new(addr).with_config(config));
        let state = Arc::new(PanelState::default());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (init_tx, mut init_rx) = watch::channel(false);

        {
            let session = session.clone();
            tokio::spawn(async move { session.run(to_rx, from_tx).await });
        }
        {
            let state = state.clone();
            let events_tx = events_tx.clone();
            tokio::spawn(dispatch(from_rx, state, events_tx, init_tx));
        }

        // Everything considered mandatory for initialization, in one batch.
        let init_request = InboundMessage {
            commands: vec![
                Command::SendPanelInfo,
                Command::SendPanelTopology,
                Command::ReportHwcAvailability,
                Command::SetHeartBeatTimer(DEFAULT_HEARTBEAT_MS),
            ],
            ..Default::default()
        };
        to_tx
            .send(vec![init_request])
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;

        match tokio::time::timeout(INIT_TIMEOUT, init_rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => {
                session.shutdown();
                return Err(ClientError::ConnectionClosed);
            }
            Err(_) => {
                session.shutdown();
                return Err(ClientError::InitTimeout);
            }
        }

        Ok(Self {
            session,
            to_panel: to_tx,
            state,
            events: events_tx,
        })
    }

    /// The cached panel identity and availability.
    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Subscribes to hardware events. Only events arriving after the call
    /// are delivered.
    pub fn events(&self) -> broadcast::Receiver<HwcEvent> {
        self.events.subscribe()
    }

    /// Enqueues raw messages for the panel.
    pub async fn send(&self, msgs: Vec<InboundMessage>) -> Result<(), ClientError> {
        self.to_panel
            .send(msgs)
            .await
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Sets LED and display brightness to the same level (0-8).
    pub async fn set_brightness(&self, brightness: u32) -> Result<(), ClientError> {
        self.send(vec![InboundMessage::command(Command::PanelBrightness {
            leds: brightness,
            oleds: brightness,
        })])
        .await
    }

    /// Sets the color and intensity state of a single component.
    pub async fn set_led_color(
        &self,
        hwc: u32,
        color: HwcColor,
        state: u32,
    ) -> Result<(), ClientError> {
        self.send(vec![InboundMessage::state(HwcState {
            ids: vec![hwc],
            mode: Some(HwcMode {
                state,
                ..Default::default()
            }),
            color: Some(color),
            ..Default::default()
        })])
        .await
    }

    /// Puts a plain title on a display component.
    pub async fn set_title(&self, hwc: u32, title: impl Into<String>) -> Result<(), ClientError> {
        self.send(vec![InboundMessage::state(HwcState {
            ids: vec![hwc],
            text: Some(HwcText {
                title: title.into(),
                formatting: HwcText::FMT_HIDE,
                ..Default::default()
            }),
            ..Default::default()
        })])
        .await
    }

    /// Shuts the session down. The panel handle is unusable afterwards.
    pub fn close(&self) {
        self.session.shutdown();
    }
}

/// Applies inbound batches to the state cache and fans events out.
async fn dispatch(
    mut from_rx: mpsc::Receiver<Vec<rawpanel_protocol::message::OutboundMessage>>,
    state: Arc<PanelState>,
    events_tx: broadcast::Sender<HwcEvent>,
    init_tx: watch::Sender<bool>,
) {
    while let Some(batch) = from_rx.recv().await {
        for msg in &batch {
            state.apply(msg);
            for event in &msg.events {
                let _ = events_tx.send(event.clone());
            }
        }
        if state.is_initialized() {
            let _ = init_tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, steers negotiation to ASCII, then plays the
    /// given lines once the client's flush newline confirms negotiation is
    /// over. Holds the socket open until the client hangs up.
    async fn mock_ascii_panel(listener: TcpListener, lines: &'static [&'static str]) {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 1024];
        sock.read(&mut buf).await.unwrap();
        sock.write_all(b"ack\n").await.unwrap();
        sock.read(&mut buf).await.unwrap();

        for line in lines {
            sock.write_all(format!("{line}\n").as_bytes()).await.unwrap();
        }
        while sock.read(&mut buf).await.unwrap_or(0) > 0 {}
    }

    #[tokio::test]
    async fn test_connect_initializes_from_identity_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(mock_ascii_panel(
            listener,
            &[
                "_model=Mock Panel",
                "_serial=4029",
                "_name=Unit",
                "map=1:1",
                "_panelTopology_svgbase=<svg/>",
                "_panelTopology_HWC={\"HWc\":[]}",
            ],
        ));

        let panel = Panel::connect(addr).await.unwrap();
        assert_eq!(panel.state().model(), "Mock Panel");
        assert_eq!(panel.state().serial(), "4029");
        assert_eq!(panel.state().name(), "Unit");
        assert_eq!(panel.state().topology_svg(), "<svg/>");
        assert_eq!(panel.state().hwc_availability().get(&1), Some(&1));

        panel.close();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_times_out_without_identity() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // The mock answers negotiation but never identifies itself.
        let server = tokio::spawn(mock_ascii_panel(listener, &[]));

        let err = Panel::connect(addr).await.unwrap_err();
        assert!(matches!(err, ClientError::InitTimeout));
        drop(server);
    }
}
