use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tracing::{debug, instrument, warn};

/// Close code used for every caller-initiated close ("normal closure")
pub const NORMAL_CLOSURE: u16 = 1000;

/// Callback receiving each inbound text frame, in arrival order
pub type FrameHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Callback invoked once when a socket ends without a close request
/// (server close, network error, failed connect)
pub type DropHandler = Arc<dyn Fn() + Send + Sync>;

/// Options accompanying a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOptions {
    /// When false the transport reopens the socket after closing it; the
    /// handle stays valid and can be closed again later.
    pub keep_closed: bool,
    /// Skip waiting for the server to acknowledge the close frame
    pub fast_close: bool,
}

impl Default for CloseOptions {
    fn default() -> Self {
        Self {
            keep_closed: true,
            fast_close: false,
        }
    }
}

/// A live socket for one channel
pub trait StreamHandle: Send + 'static {
    /// The full URL the socket was opened for
    fn url(&self) -> &str;

    /// Request the socket to close with the given code and reason
    fn close(&mut self, code: u16, reason: &str, options: CloseOptions);
}

/// Socket transport primitive
///
/// `open` returns immediately; connecting happens in the background and
/// frames are pushed to `on_frame` as they arrive. The transport never
/// reconnects on its own; `on_drop` is how the owner finds out.
pub trait Transport: Send + Sync + 'static {
    type Handle: StreamHandle;

    fn open(
        &self,
        url: &str,
        on_frame: FrameHandler,
        on_drop: Option<DropHandler>,
    ) -> Self::Handle;
}

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// How long to wait for the server's close acknowledgement
    pub close_timeout_ms: u64,
    /// Delay before reopening a socket closed with `keep_closed = false`
    pub reopen_delay_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            close_timeout_ms: 2_000,
            reopen_delay_ms: 1_000,
        }
    }
}

/// tokio-tungstenite transport: one background task per socket
#[derive(Debug, Clone, Default)]
pub struct TungsteniteTransport {
    config: WsConfig,
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }
}

impl Transport for TungsteniteTransport {
    type Handle = TungsteniteHandle;

    fn open(
        &self,
        url: &str,
        on_frame: FrameHandler,
        on_drop: Option<DropHandler>,
    ) -> Self::Handle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(
            url.to_string(),
            self.config.clone(),
            on_frame,
            on_drop,
            commands_rx,
        ));

        TungsteniteHandle {
            url: url.to_string(),
            commands: commands_tx,
            task,
        }
    }
}

#[derive(Debug)]
struct CloseCommand {
    code: u16,
    reason: String,
    options: CloseOptions,
}

/// Handle to a socket driven by `TungsteniteTransport`
///
/// Dropping the handle closes the socket.
#[derive(Debug)]
pub struct TungsteniteHandle {
    url: String,
    commands: mpsc::UnboundedSender<CloseCommand>,
    task: JoinHandle<()>,
}

impl TungsteniteHandle {
    /// Whether the socket task is still running (connecting, open or reopening)
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl StreamHandle for TungsteniteHandle {
    fn url(&self) -> &str {
        &self.url
    }

    fn close(&mut self, code: u16, reason: &str, options: CloseOptions) {
        let command = CloseCommand {
            code,
            reason: reason.to_string(),
            options,
        };
        if self.commands.send(command).is_err() {
            debug!(url = %self.url, "Close requested on a socket that already ended");
        }
    }
}

enum SocketOutcome {
    /// Closed on request; the flag is `keep_closed`
    Closed(bool),
    /// The server or the network ended the connection
    Dropped,
}

#[instrument(skip_all, fields(exchange = "binance", url = %url))]
async fn run_socket(
    url: String,
    config: WsConfig,
    on_frame: FrameHandler,
    on_drop: Option<DropHandler>,
    mut commands: mpsc::UnboundedReceiver<CloseCommand>,
) {
    let dropped = || {
        if let Some(on_drop) = &on_drop {
            on_drop();
        }
    };

    loop {
        let connect = timeout(
            Duration::from_millis(config.connect_timeout_ms),
            connect_async(url.as_str()),
        );

        let ws_stream = tokio::select! {
            result = connect => match result {
                Ok(Ok((ws_stream, _))) => ws_stream,
                Ok(Err(e)) => {
                    warn!("WebSocket connection failed: {}", e);
                    dropped();
                    return;
                }
                Err(_) => {
                    warn!("WebSocket connection timeout");
                    dropped();
                    return;
                }
            },
            _ = commands.recv() => {
                debug!("Socket closed before the connection was established");
                return;
            }
        };

        debug!("WebSocket connected");
        let (mut write, mut read) = ws_stream.split();

        let outcome = loop {
            tokio::select! {
                command = commands.recv() => {
                    let command = command.unwrap_or(CloseCommand {
                        code: NORMAL_CLOSURE,
                        reason: "Handle dropped".to_string(),
                        options: CloseOptions::default(),
                    });
                    let frame = CloseFrame {
                        code: CloseCode::from(command.code),
                        reason: Cow::Owned(command.reason),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        debug!("Failed to send close frame: {}", e);
                    } else if !command.options.fast_close {
                        // Wait for the server's close frame so the handshake completes
                        let drain = async {
                            while let Some(Ok(message)) = read.next().await {
                                if matches!(message, Message::Close(_)) {
                                    break;
                                }
                            }
                        };
                        let _ = timeout(Duration::from_millis(config.close_timeout_ms), drain).await;
                    }
                    break SocketOutcome::Closed(command.options.keep_closed);
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => on_frame(text),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => on_frame(text),
                        Err(e) => warn!("Dropping non UTF-8 binary frame: {}", e),
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(e) = write.send(Message::Pong(payload)).await {
                            warn!("Failed to send pong response: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Server closed the connection");
                        break SocketOutcome::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break SocketOutcome::Dropped;
                    }
                    None => break SocketOutcome::Dropped,
                }
            }
        };

        match outcome {
            SocketOutcome::Closed(false) => {
                debug!("Reopening socket after close");
                sleep(Duration::from_millis(config.reopen_delay_ms)).await;
            }
            SocketOutcome::Closed(true) => return,
            SocketOutcome::Dropped => {
                warn!("WebSocket connection ended");
                dropped();
                return;
            }
        }
    }
}
