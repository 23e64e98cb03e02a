//! Listen key backed user data streams
//!
//! `session` holds the pure state machine; `manager` runs it on a tokio task
//! that owns the socket, the keep-alive interval and the reconnect timer.

pub mod manager;
pub mod session;

pub use manager::{UserStreamHandle, UserStreamManager};
pub use session::{
    SessionAction, SessionEvent, SessionState, SessionTimings, UserSession,
    DEFAULT_KEEP_ALIVE_INTERVAL, DEFAULT_RECONNECT_DELAY,
};
