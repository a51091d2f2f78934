//! # rawpanel
//!
//! Bidirectional translator and transport for the Raw Panel wire protocol,
//! the line-oriented ASCII/binary format hardware control panels (buttons,
//! encoders, faders, small displays) use to exchange state and events with
//! a controlling system.
//!
//! The workspace splits into:
//! - [`protocol`] - message model, ASCII line codec, binary framing
//! - [`client`] - reconnecting TCP session loop, protocol negotiation, and
//!   the high-level [`Panel`] handle
//!
//! ## Quick start
//!
//! ```no_run
//! use rawpanel::client::Panel;
//!
//! # async fn run() -> Result<(), rawpanel::client::ClientError> {
//! let panel = Panel::connect("10.0.0.42:9923").await?;
//! println!("connected to {}", panel.state().model());
//!
//! let mut events = panel.events();
//! while let Ok(event) = events.recv().await {
//!     println!("HWC {} fired: {:?}", event.id, event.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub use rawpanel_client as client;
pub use rawpanel_protocol as protocol;

pub use rawpanel_client::{ClientError, Panel, PanelState, Session, SessionConfig};
pub use rawpanel_protocol::{InboundMessage, OutboundMessage};
