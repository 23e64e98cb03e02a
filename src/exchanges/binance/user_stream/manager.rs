use super::session::{SessionAction, SessionEvent, SessionState, SessionTimings, UserSession};
use crate::core::errors::{DecodeError, ExchangeError};
use crate::core::kernel::{CloseOptions, DropHandler, StreamHandle, Transport, NORMAL_CLOSURE};
use crate::exchanges::binance::channel::{ChannelPath, ChannelSocketFactory, CLOSE_REASON};
use crate::exchanges::binance::codec::{BinanceCodec, StreamKind};
use crate::exchanges::binance::data_stream::{DataStreamOperations, DataStreamVariant, ListenKey};
use crate::exchanges::binance::events::{MessageHandler, StreamMessage};
use serde_json::Value;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, instrument, warn};

/// Opens user data streams backed by a listen key
///
/// Each `make_stream` call runs its own session: one listen key, one socket,
/// a keep-alive timer and transparent reconnection after renewal failures
/// or a dropped socket.
pub struct UserStreamManager<T: Transport, O: DataStreamOperations> {
    factory: ChannelSocketFactory<T>,
    ops: Arc<O>,
    timings: SessionTimings,
    variant: DataStreamVariant,
}

impl<T: Transport, O: DataStreamOperations> Clone for UserStreamManager<T, O> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            ops: Arc::clone(&self.ops),
            timings: self.timings,
            variant: self.variant,
        }
    }
}

impl<T: Transport, O: DataStreamOperations> UserStreamManager<T, O> {
    pub fn new(
        factory: ChannelSocketFactory<T>,
        ops: Arc<O>,
        timings: SessionTimings,
        variant: DataStreamVariant,
    ) -> Self {
        Self {
            factory,
            ops,
            timings,
            variant,
        }
    }

    pub fn variant(&self) -> DataStreamVariant {
        self.variant
    }

    pub fn timings(&self) -> SessionTimings {
        self.timings
    }

    /// Acquire a listen key, open the user socket and keep both alive
    ///
    /// Fails only if the first listen key cannot be obtained. A later renewal
    /// failure or socket drop tears the session down and retries after the
    /// reconnect delay, for as long as the stream stays open.
    #[instrument(skip_all, fields(exchange = "binance", variant = self.variant.label()))]
    pub async fn make_stream<F>(
        &self,
        handler: F,
        transform: bool,
    ) -> Result<UserStreamHandle, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        let mut session = UserSession::new(self.timings);
        session.handle(SessionEvent::Start);

        let event = match self.ops.get_data_stream().await {
            Ok(key) => SessionEvent::Acquired(key),
            Err(error) => SessionEvent::AcquireFailed(error),
        };
        let mut actions = session.handle(event);
        if let Some(index) = actions
            .iter()
            .position(|action| matches!(action, SessionAction::Fail(_)))
        {
            if let SessionAction::Fail(error) = actions.swap_remove(index) {
                warn!("Could not obtain a listen key: {}", error);
                return Err(error);
            }
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(session.state());

        let mut driver = SessionDriver {
            session,
            factory: self.factory.clone(),
            ops: Arc::clone(&self.ops),
            handler: Arc::new(handler),
            transform,
            variant: self.variant,
            socket: None,
            keep_alive: None,
            reconnect: None,
            inputs_tx,
            inputs_rx,
            state_tx,
        };
        if let Err(error) = driver.execute(actions).await {
            warn!("Failed to start user data stream: {}", error);
        }
        info!("User data stream live");

        tokio::spawn(driver.run(commands_rx));

        Ok(UserStreamHandle {
            commands: commands_tx,
            state: state_rx,
        })
    }
}

enum SessionCommand {
    Close {
        options: CloseOptions,
        reply: oneshot::Sender<Result<(), ExchangeError>>,
    },
}

/// Handle to a running user data stream
///
/// Clones share the same session. Once every clone is dropped the session
/// closes on its own and any listen key release error is only logged.
#[derive(Debug, Clone)]
#[must_use = "dropping every handle closes the user data stream"]
pub struct UserStreamHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl UserStreamHandle {
    /// Stop renewals, release the listen key and close the socket
    ///
    /// Returns the listen key release result. Closing a stream that is
    /// already closed does nothing and returns `Ok(())`.
    pub async fn close(&self, options: CloseOptions) -> Result<(), ExchangeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = SessionCommand::Close {
            options,
            reply: reply_tx,
        };
        if self.commands.send(command).is_err() {
            return Ok(());
        }
        reply_rx.await.unwrap_or(Ok(()))
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }
}

/// Owns the live resources of one session and executes its actions
struct SessionDriver<T: Transport, O: DataStreamOperations> {
    session: UserSession,
    factory: ChannelSocketFactory<T>,
    ops: Arc<O>,
    handler: MessageHandler,
    transform: bool,
    variant: DataStreamVariant,
    socket: Option<T::Handle>,
    keep_alive: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,
    inputs_tx: mpsc::UnboundedSender<SessionEvent>,
    inputs_rx: mpsc::UnboundedReceiver<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
}

async fn next_tick(keep_alive: &mut Option<Interval>) {
    match keep_alive {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn reconnect_due(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    match reconnect {
        Some(delay) => delay.as_mut().await,
        None => pending().await,
    }
}

fn is_listen_key_expired(message: &Result<StreamMessage, DecodeError>) -> bool {
    let event_type = match message {
        Ok(StreamMessage::Event(event)) => event.event_type(),
        Ok(StreamMessage::Raw(payload)) => payload.get("type").and_then(Value::as_str),
        _ => None,
    };
    event_type == Some("listenKeyExpired")
}

impl<T: Transport, O: DataStreamOperations> SessionDriver<T, O> {
    #[instrument(skip_all, fields(exchange = "binance", variant = self.variant.label()))]
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let mut handles_dropped = false;

        while !self.session.is_settled() {
            tokio::select! {
                command = commands.recv(), if !handles_dropped => match command {
                    Some(SessionCommand::Close { options, reply }) => {
                        let result = self.dispatch(SessionEvent::CloseRequested(options)).await;
                        let _ = reply.send(result);
                    }
                    None => {
                        handles_dropped = true;
                        debug!("All stream handles dropped, closing session");
                        let event = SessionEvent::CloseRequested(CloseOptions::default());
                        if let Err(e) = self.dispatch(event).await {
                            warn!("Failed to release listen key: {}", e);
                        }
                    }
                },
                Some(event) = self.inputs_rx.recv() => {
                    if let Err(e) = self.dispatch(event).await {
                        warn!("User data stream action failed: {}", e);
                    }
                }
                () = next_tick(&mut self.keep_alive) => {
                    if let Err(e) = self.dispatch(SessionEvent::KeepAliveTick).await {
                        warn!("User data stream action failed: {}", e);
                    }
                }
                () = reconnect_due(&mut self.reconnect) => {
                    self.reconnect = None;
                    info!("Reconnecting user data stream");
                    if let Err(e) = self.dispatch(SessionEvent::ReconnectDue).await {
                        warn!("User data stream action failed: {}", e);
                    }
                }
            }
        }

        debug!("User data stream session finished");
    }

    async fn dispatch(&mut self, event: SessionEvent) -> Result<(), ExchangeError> {
        match &event {
            SessionEvent::KeepAliveFailed { key, error } => {
                warn!(listen_key = %key, "Listen key renewal failed: {}", error);
            }
            SessionEvent::AcquireFailed(error) => {
                warn!("Listen key reacquisition failed: {}", error);
            }
            SessionEvent::SocketDropped(key) => {
                warn!(listen_key = %key, "User data socket dropped");
            }
            _ => {}
        }

        let actions = self.session.handle(event);
        let result = self.execute(actions).await;
        self.state_tx.send_replace(self.session.state());
        result
    }

    /// Run actions in order; returns the first non-suppressed failure
    async fn execute(&mut self, actions: Vec<SessionAction>) -> Result<(), ExchangeError> {
        let mut result = Ok(());

        for action in actions {
            match action {
                SessionAction::AcquireListenKey => {
                    let ops = Arc::clone(&self.ops);
                    let inputs = self.inputs_tx.clone();
                    tokio::spawn(async move {
                        let event = match ops.get_data_stream().await {
                            Ok(key) => SessionEvent::Acquired(key),
                            Err(error) => SessionEvent::AcquireFailed(error),
                        };
                        let _ = inputs.send(event);
                    });
                }
                SessionAction::OpenSocket(key) => {
                    debug!(listen_key = %key, "Opening user data socket");
                    self.socket = Some(self.open_socket(&key));
                }
                SessionAction::StartKeepAlive => {
                    let period = self.session.timings().keep_alive_interval;
                    let mut interval = interval_at(Instant::now() + period, period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.keep_alive = Some(interval);
                }
                SessionAction::StopKeepAlive => {
                    self.keep_alive = None;
                }
                SessionAction::SendKeepAlive(key) => {
                    let ops = Arc::clone(&self.ops);
                    let inputs = self.inputs_tx.clone();
                    tokio::spawn(async move {
                        let event = match ops.keep_data_stream(&key).await {
                            Ok(()) => SessionEvent::KeepAliveSucceeded(key),
                            Err(error) => SessionEvent::KeepAliveFailed { key, error },
                        };
                        let _ = inputs.send(event);
                    });
                }
                SessionAction::CloseListenKey {
                    key,
                    suppress_errors: true,
                } => {
                    let ops = Arc::clone(&self.ops);
                    tokio::spawn(async move {
                        if let Err(e) = ops.close_data_stream(&key).await {
                            debug!(listen_key = %key, "Ignoring listen key release failure: {}", e);
                        }
                    });
                }
                SessionAction::CloseListenKey {
                    key,
                    suppress_errors: false,
                } => {
                    if let Err(e) = self.ops.close_data_stream(&key).await {
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
                SessionAction::CloseSocket(options) => {
                    if let Some(mut socket) = self.socket.take() {
                        socket.close(NORMAL_CLOSURE, CLOSE_REASON, options);
                    }
                }
                SessionAction::ScheduleReconnect(delay) => {
                    info!(delay_secs = delay.as_secs(), "Scheduling user data stream reconnect");
                    self.reconnect = Some(Box::pin(sleep(delay)));
                }
                SessionAction::CancelReconnect => {
                    self.reconnect = None;
                }
                SessionAction::Fail(error) => {
                    if result.is_ok() {
                        result = Err(error);
                    }
                }
            }
        }

        result
    }

    fn open_socket(&self, key: &ListenKey) -> T::Handle {
        let handler = Arc::clone(&self.handler);
        let inputs = self.inputs_tx.clone();
        let dropped_key = key.clone();
        let on_drop: DropHandler = Arc::new(move || {
            let _ = inputs.send(SessionEvent::SocketDropped(dropped_key.clone()));
        });

        self.factory.open_watched(
            &ChannelPath::user(key),
            BinanceCodec::new(StreamKind::User, self.transform),
            move |message| {
                if is_listen_key_expired(&message) {
                    warn!("Server reported the listen key as expired");
                }
                handler(message);
            },
            on_drop,
        )
    }
}
