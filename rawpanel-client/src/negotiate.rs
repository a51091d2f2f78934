//! Binary/ASCII protocol auto-negotiation.
//!
//! Run once, immediately after TCP connect. The probe is a binary-framed
//! PING: a panel that auto-detects its own protocol mode would settle on the
//! less capable ASCII mode if probed with an ASCII-looking line first, so
//! probing binary-first biases toward the richer protocol when both ends
//! support it.

use crate::error::ClientError;
use rawpanel_protocol::message::{InboundMessage, OutboundFlow, OutboundMessage};
use rawpanel_protocol::Encoder;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How long to wait for the probe reply. An ASCII panel typically never
/// answers a binary PING, so the timeout is the common ASCII path.
pub const NEGOTIATION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Outcome of the negotiation handshake.
#[derive(Debug, Clone, Default)]
pub struct Negotiation {
    /// True if the peer speaks binary framing.
    pub binary: bool,
    /// An `ErrorMsg=` line the panel sent instead of a binary reply, e.g.
    /// when it rejects the connection. Informational; not a failure.
    pub error_message: Option<String>,
}

/// Probes the peer and decides the framing mode for this connection.
///
/// Any reply that passes the length-prefix check is taken as binary, even if
/// the payload does not parse as an ACK: a peer that answers a binary probe
/// at all is assumed binary-capable. Everything else (short reply, bad
/// header, timeout, read error) concludes ASCII, and a bare newline is sent
/// to flush the panel's line buffer of the binary probe bytes.
pub async fn detect_binary(stream: &mut TcpStream) -> Result<Negotiation, ClientError> {
    let probe = Encoder::encode_inbound(&InboundMessage::ping())?;
    stream.write_all(&probe).await?;
    tracing::debug!("sent binary ping probe, awaiting reply");

    let mut buf = vec![0u8; 1000];
    let read = tokio::time::timeout(NEGOTIATION_TIMEOUT, stream.read(&mut buf)).await;

    let count = match read {
        Ok(Ok(n)) => n,
        Ok(Err(err)) => {
            tracing::debug!(%err, "probe read failed, assuming ASCII mode");
            0
        }
        Err(_) => {
            tracing::debug!("probe timed out, assuming ASCII mode");
            0
        }
    };

    if count > 4 {
        let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if declared as usize + 4 == count {
            match serde_json::from_slice::<OutboundMessage>(&buf[4..count]) {
                Ok(reply) if reply.flow == OutboundFlow::Ack => {
                    tracing::debug!("received ACK, using binary protocol mode");
                }
                _ => {
                    tracing::debug!(
                        "reply was not an ACK, staying with binary protocol mode"
                    );
                }
            }
            return Ok(Negotiation {
                binary: true,
                error_message: None,
            });
        }
        tracing::debug!("reply length did not match header, assuming ASCII mode");
    }

    // ASCII conclusion. The panel may have answered our binary bytes with an
    // error line; surface it to the connect observer.
    let error_message = String::from_utf8_lossy(&buf[..count])
        .split('\n')
        .next()
        .and_then(|first| first.strip_prefix("ErrorMsg="))
        .map(str::to_string);

    // The panel buffered our binary probe as a garbage line; terminate it.
    stream.write_all(b"\n").await?;
    tracing::debug!("using ASCII protocol mode");

    Ok(Negotiation {
        binary: false,
        error_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawpanel_protocol::Decoder;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_binary_peer_with_ack_reply() {
        let (mut client, mut server) = pair().await;

        let peer = tokio::spawn(async move {
            // Read the probe frame and check it is a PING.
            let mut buf = vec![0u8; 256];
            let n = server.read(&mut buf).await.unwrap();
            let mut decoder = Decoder::new();
            decoder.extend(&buf[..n]);
            let probe = decoder.decode_inbound().unwrap().unwrap();
            assert_eq!(
                probe.flow,
                rawpanel_protocol::message::InboundFlow::Ping
            );

            let reply = Encoder::encode_outbound(&OutboundMessage::ack()).unwrap();
            server.write_all(&reply).await.unwrap();
            server
        });

        let negotiation = detect_binary(&mut client).await.unwrap();
        assert!(negotiation.binary);
        assert!(negotiation.error_message.is_none());
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_binary_peer_with_non_ack_reply() {
        let (mut client, mut server) = pair().await;

        tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            server.read(&mut buf).await.unwrap();
            // A correctly framed reply that is not an ACK still means binary.
            let reply = Encoder::encode_outbound(&OutboundMessage::ping()).unwrap();
            server.write_all(&reply).await.unwrap();
            // Keep the socket open until negotiation finishes.
            let _ = server.read(&mut buf).await;
        });

        let negotiation = detect_binary(&mut client).await.unwrap();
        assert!(negotiation.binary);
    }

    #[tokio::test]
    async fn test_silent_peer_concludes_ascii_and_flushes() {
        let (mut client, mut server) = pair().await;

        let peer = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            // Consume the probe but never answer.
            let n = server.read(&mut buf).await.unwrap();
            // After the timeout the negotiator must send the flush newline.
            let m = server.read(&mut buf[n..]).await.unwrap();
            assert_eq!(&buf[n..n + m], b"\n");
        });

        let negotiation = detect_binary(&mut client).await.unwrap();
        assert!(!negotiation.binary);
        assert!(negotiation.error_message.is_none());
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_ascii_error_reply_is_surfaced() {
        let (mut client, mut server) = pair().await;

        tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            server.read(&mut buf).await.unwrap();
            server.write_all(b"ErrorMsg=Panel is locked\n").await.unwrap();
            let _ = server.read(&mut buf).await;
        });

        let negotiation = detect_binary(&mut client).await.unwrap();
        assert!(!negotiation.binary);
        assert_eq!(
            negotiation.error_message.as_deref(),
            Some("Panel is locked")
        );
    }
}
