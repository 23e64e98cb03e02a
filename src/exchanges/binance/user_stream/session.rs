use crate::core::errors::ExchangeError;
use crate::core::kernel::CloseOptions;
use crate::exchanges::binance::data_stream::ListenKey;
use std::time::Duration;

pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(50);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Timer settings for a user data stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Period of listen key renewals; the first scheduled renewal happens one
    /// full period after the immediate one sent when the socket opens
    pub keep_alive_interval: Duration,
    /// Wait between a failed renewal (or failed reacquisition) and the next
    /// acquisition attempt
    pub reconnect_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Acquiring { reconnecting: bool },
    Live,
    ReconnectPending,
    Closed,
}

#[derive(Debug)]
pub enum SessionEvent {
    Start,
    ReconnectDue,
    Acquired(ListenKey),
    AcquireFailed(ExchangeError),
    KeepAliveTick,
    KeepAliveSucceeded(ListenKey),
    KeepAliveFailed { key: ListenKey, error: ExchangeError },
    /// The socket opened for this key ended without a close request
    SocketDropped(ListenKey),
    CloseRequested(CloseOptions),
}

/// Side effects requested by a transition, executed in order by the driver
#[derive(Debug)]
pub enum SessionAction {
    AcquireListenKey,
    OpenSocket(ListenKey),
    StartKeepAlive,
    StopKeepAlive,
    SendKeepAlive(ListenKey),
    CloseListenKey { key: ListenKey, suppress_errors: bool },
    CloseSocket(CloseOptions),
    ScheduleReconnect(Duration),
    CancelReconnect,
    Fail(ExchangeError),
}

/// Listen key session state machine
///
/// Pure: `handle` only updates bookkeeping and returns the actions to run.
/// At most one listen key and one socket are live at any time; a reconnect
/// retires both before asking for a new key.
#[derive(Debug)]
pub struct UserSession {
    state: SessionState,
    timings: SessionTimings,
    listen_key: Option<ListenKey>,
    socket_open: bool,
    keep_alive_armed: bool,
    reconnect_scheduled: bool,
    acquire_in_flight: bool,
}

impl UserSession {
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            state: SessionState::Idle,
            timings,
            listen_key: None,
            socket_open: false,
            keep_alive_armed: false,
            reconnect_scheduled: false,
            acquire_in_flight: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timings(&self) -> SessionTimings {
        self.timings
    }

    pub fn listen_key(&self) -> Option<&ListenKey> {
        self.listen_key.as_ref()
    }

    pub fn is_socket_open(&self) -> bool {
        self.socket_open
    }

    pub fn is_keep_alive_armed(&self) -> bool {
        self.keep_alive_armed
    }

    pub fn is_reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    /// Closed with no acquisition left whose key would need releasing
    pub fn is_settled(&self) -> bool {
        self.state == SessionState::Closed && !self.acquire_in_flight
    }

    fn is_current(&self, key: &ListenKey) -> bool {
        self.listen_key.as_ref() == Some(key)
    }

    fn acquire(&mut self, reconnecting: bool) -> Vec<SessionAction> {
        self.state = SessionState::Acquiring { reconnecting };
        self.reconnect_scheduled = false;
        self.acquire_in_flight = true;
        vec![SessionAction::AcquireListenKey]
    }

    /// Stop the timer, release the key and close the socket
    fn retire(&mut self, options: CloseOptions, suppress_errors: bool) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.keep_alive_armed {
            self.keep_alive_armed = false;
            actions.push(SessionAction::StopKeepAlive);
        }
        if let Some(key) = self.listen_key.take() {
            actions.push(SessionAction::CloseListenKey {
                key,
                suppress_errors,
            });
        }
        if self.socket_open {
            self.socket_open = false;
            actions.push(SessionAction::CloseSocket(options));
        }
        actions
    }

    /// Tear everything down quietly and retry after the reconnect delay
    fn reconnect_later(&mut self) -> Vec<SessionAction> {
        let mut actions = self.retire(CloseOptions::default(), true);
        self.state = SessionState::ReconnectPending;
        self.reconnect_scheduled = true;
        actions.push(SessionAction::ScheduleReconnect(
            self.timings.reconnect_delay,
        ));
        actions
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match (self.state, event) {
            (SessionState::Idle, SessionEvent::Start) => self.acquire(false),

            (SessionState::ReconnectPending, SessionEvent::ReconnectDue) => self.acquire(true),

            (SessionState::Acquiring { .. }, SessionEvent::Acquired(key)) => {
                self.acquire_in_flight = false;
                self.state = SessionState::Live;
                self.listen_key = Some(key.clone());
                self.socket_open = true;
                self.keep_alive_armed = true;
                vec![
                    SessionAction::OpenSocket(key.clone()),
                    SessionAction::StartKeepAlive,
                    SessionAction::SendKeepAlive(key),
                ]
            }

            (SessionState::Acquiring { reconnecting: false }, SessionEvent::AcquireFailed(error)) => {
                self.acquire_in_flight = false;
                self.state = SessionState::Closed;
                vec![SessionAction::Fail(error)]
            }

            (SessionState::Acquiring { reconnecting: true }, SessionEvent::AcquireFailed(_)) => {
                self.acquire_in_flight = false;
                self.state = SessionState::ReconnectPending;
                self.reconnect_scheduled = true;
                vec![SessionAction::ScheduleReconnect(self.timings.reconnect_delay)]
            }

            (SessionState::Live, SessionEvent::KeepAliveTick) => match &self.listen_key {
                Some(key) => vec![SessionAction::SendKeepAlive(key.clone())],
                None => Vec::new(),
            },

            (SessionState::Live, SessionEvent::KeepAliveFailed { key, .. })
                if self.is_current(&key) =>
            {
                self.reconnect_later()
            }

            (SessionState::Live, SessionEvent::SocketDropped(key)) if self.is_current(&key) => {
                self.reconnect_later()
            }

            (SessionState::Live, SessionEvent::CloseRequested(options)) => {
                let actions = self.retire(options, false);
                self.state = SessionState::Closed;
                actions
            }

            (SessionState::ReconnectPending, SessionEvent::CloseRequested(_)) => {
                self.state = SessionState::Closed;
                self.reconnect_scheduled = false;
                vec![SessionAction::CancelReconnect]
            }

            (
                SessionState::Idle | SessionState::Acquiring { .. },
                SessionEvent::CloseRequested(_),
            ) => {
                self.state = SessionState::Closed;
                Vec::new()
            }

            // Closed while the key was being fetched: release it, open nothing
            (SessionState::Closed, SessionEvent::Acquired(key)) if self.acquire_in_flight => {
                self.acquire_in_flight = false;
                vec![SessionAction::CloseListenKey {
                    key,
                    suppress_errors: true,
                }]
            }

            (SessionState::Closed, SessionEvent::AcquireFailed(_)) => {
                self.acquire_in_flight = false;
                Vec::new()
            }

            // Stale results, duplicate closes, ticks after teardown
            _ => Vec::new(),
        }
    }
}
