//! Client transport bridge.
//!
//! The observation loop runs server-side; the student's browser owns the
//! microphone, camera, and whiteboard. When a tool handler needs any of
//! those it goes through this crate:
//!
//! - [`messages`] — the typed wire protocol (both directions).
//! - [`pending`] — the correlation-id table mapping in-flight requests to
//!   suspended handlers.
//! - [`client`] — the per-session handle handlers use to request data or
//!   push notifications.

pub mod client;
pub mod messages;
pub mod pending;

pub use client::{ClientHandle, DEFAULT_REQUEST_TIMEOUT};
pub use messages::{ClientMessage, ServerMessage};
pub use pending::PendingRequests;
