//! # rawpanel-client
//!
//! Client library for Raw Panel devices.
//!
//! This crate provides:
//! - A reconnecting TCP session loop pumping messages in both directions
//! - Binary/ASCII protocol auto-negotiation
//! - A high-level [`Panel`] handle with cached panel identity
//!
//! The session loop owns one connection's full lifecycle: dial, negotiate,
//! spawn a writer task, read until disconnect, retry. The caller talks to it
//! through two message queues and must keep draining the inbound one.

pub mod error;
pub mod negotiate;
pub mod panel;
pub mod session;
pub mod state;

pub use error::ClientError;
pub use negotiate::Negotiation;
pub use panel::Panel;
pub use session::{Session, SessionConfig};
pub use state::PanelState;
