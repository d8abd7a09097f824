//! Typed messages between preview agents and the host.

pub mod dispatch;
pub mod handlers;
pub mod message;

pub use dispatch::{dispatch, Dispatch};
pub use message::{
    BridgeError, BridgeMessage, ContentUpdateEvent, Envelope, FrameId, Point, SelectionEvent,
    PROTOCOL_VERSION,
};
