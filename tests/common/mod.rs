#![allow(dead_code)]

use async_trait::async_trait;
use binance_ws_streams::core::errors::ExchangeError;
use binance_ws_streams::core::kernel::{
    CloseOptions, DropHandler, FrameHandler, StreamHandle, Transport,
};
use binance_ws_streams::exchanges::binance::{
    BinanceWs, ChannelSocketFactory, DataStreamOperations, DataStreamVariant, ListenKey,
    SessionTimings, UserStreamManager,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const TEST_WS_BASE: &str = "wss://stream.test.invalid:9443/ws";

/// Let spawned tasks run without moving the paused clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClose {
    pub code: u16,
    pub reason: String,
    pub options: CloseOptions,
}

/// One socket opened through `MockTransport`
pub struct MockSocket {
    pub url: String,
    on_frame: FrameHandler,
    on_drop: Option<DropHandler>,
    closes: Mutex<Vec<RecordedClose>>,
    dropped: AtomicBool,
    ended_by_server: AtomicBool,
}

impl MockSocket {
    /// Deliver a text frame as if the server had sent it
    pub fn push(&self, frame: &str) {
        (self.on_frame)(frame.to_string());
    }

    /// End the connection as if the server had closed it
    pub fn server_drop(&self) {
        self.ended_by_server.store(true, Ordering::SeqCst);
        if let Some(on_drop) = &self.on_drop {
            on_drop();
        }
    }

    pub fn is_watched(&self) -> bool {
        self.on_drop.is_some()
    }

    pub fn closes(&self) -> Vec<RecordedClose> {
        self.closes.lock().unwrap().clone()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.closes.lock().unwrap().is_empty()
            && !self.is_dropped()
            && !self.ended_by_server.load(Ordering::SeqCst)
    }
}

pub struct MockHandle {
    socket: Arc<MockSocket>,
}

impl StreamHandle for MockHandle {
    fn url(&self) -> &str {
        &self.socket.url
    }

    fn close(&mut self, code: u16, reason: &str, options: CloseOptions) {
        self.socket.closes.lock().unwrap().push(RecordedClose {
            code,
            reason: reason.to_string(),
            options,
        });
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.socket.dropped.store(true, Ordering::SeqCst);
    }
}

/// Records every socket it is asked to open
#[derive(Default)]
pub struct MockTransport {
    sockets: Mutex<Vec<Arc<MockSocket>>>,
}

impl MockTransport {
    pub fn sockets(&self) -> Vec<Arc<MockSocket>> {
        self.sockets.lock().unwrap().clone()
    }

    pub fn socket(&self, index: usize) -> Arc<MockSocket> {
        Arc::clone(&self.sockets.lock().unwrap()[index])
    }

    pub fn urls(&self) -> Vec<String> {
        self.sockets().iter().map(|s| s.url.clone()).collect()
    }

    pub fn open_count(&self) -> usize {
        self.sockets().iter().filter(|s| s.is_open()).count()
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(
        &self,
        url: &str,
        on_frame: FrameHandler,
        on_drop: Option<DropHandler>,
    ) -> Self::Handle {
        let socket = Arc::new(MockSocket {
            url: url.to_string(),
            on_frame,
            on_drop,
            closes: Mutex::new(Vec::new()),
            dropped: AtomicBool::new(false),
            ended_by_server: AtomicBool::new(false),
        });
        self.sockets.lock().unwrap().push(Arc::clone(&socket));
        MockHandle { socket }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get,
    Keep(String),
    Close(String),
}

/// Scripted listen key operations; every call is timestamped on the tokio clock
#[derive(Default)]
pub struct MockDataStreamOps {
    issued: AtomicUsize,
    get_failures: Mutex<VecDeque<ExchangeError>>,
    keep_failures: Mutex<VecDeque<bool>>,
    fail_closes: AtomicBool,
    calls: Mutex<Vec<(Call, Instant)>>,
}

impl MockDataStreamOps {
    /// The next `count` acquisitions fail
    pub fn fail_next_gets(&self, count: usize) {
        let mut failures = self.get_failures.lock().unwrap();
        for _ in 0..count {
            failures.push_back(ExchangeError::NetworkError("connection refused".to_string()));
        }
    }

    pub fn fail_next_get_with(&self, error: ExchangeError) {
        self.get_failures.lock().unwrap().push_back(error);
    }

    /// Script keep-alive outcomes in call order (`true` = fail); unscripted calls succeed
    pub fn script_keep_alives(&self, failures: &[bool]) {
        self.keep_failures.lock().unwrap().extend(failures.iter().copied());
    }

    pub fn fail_closes(&self, fail: bool) {
        self.fail_closes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_times(&self) -> Vec<Instant> {
        self.times_of(|call| matches!(call, Call::Get))
    }

    pub fn keep_times(&self) -> Vec<Instant> {
        self.times_of(|call| matches!(call, Call::Keep(_)))
    }

    pub fn closed_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|(call, _)| match call {
                Call::Close(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn times_of(&self, filter: impl Fn(&Call) -> bool) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(call, _)| filter(call))
            .map(|(_, at)| at)
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

#[async_trait]
impl DataStreamOperations for MockDataStreamOps {
    async fn get_data_stream(&self) -> Result<ListenKey, ExchangeError> {
        self.record(Call::Get);
        if let Some(error) = self.get_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ListenKey::new(format!("listen-key-{}", n)))
    }

    async fn keep_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError> {
        self.record(Call::Keep(listen_key.expose().to_string()));
        if self.keep_failures.lock().unwrap().pop_front().unwrap_or(false) {
            return Err(ExchangeError::ApiError {
                code: 400,
                message: "This listenKey does not exist.".to_string(),
            });
        }
        Ok(())
    }

    async fn close_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError> {
        self.record(Call::Close(listen_key.expose().to_string()));
        if self.fail_closes.load(Ordering::SeqCst) {
            return Err(ExchangeError::NetworkError("connection reset".to_string()));
        }
        Ok(())
    }
}

pub fn test_timings() -> SessionTimings {
    SessionTimings {
        keep_alive_interval: Duration::from_secs(50),
        reconnect_delay: Duration::from_secs(30),
    }
}

pub fn user_manager(
    transport: &Arc<MockTransport>,
    ops: &Arc<MockDataStreamOps>,
) -> UserStreamManager<MockTransport, MockDataStreamOps> {
    UserStreamManager::new(
        ChannelSocketFactory::new(Arc::clone(transport), TEST_WS_BASE),
        Arc::clone(ops),
        test_timings(),
        DataStreamVariant::Spot,
    )
}

pub fn test_client(
    transport: &Arc<MockTransport>,
) -> BinanceWs<MockTransport, MockDataStreamOps> {
    test_client_with_ops(
        transport,
        &Arc::new(MockDataStreamOps::default()),
        &Arc::new(MockDataStreamOps::default()),
    )
}

pub fn test_client_with_ops(
    transport: &Arc<MockTransport>,
    spot: &Arc<MockDataStreamOps>,
    margin: &Arc<MockDataStreamOps>,
) -> BinanceWs<MockTransport, MockDataStreamOps> {
    BinanceWs::new(
        Arc::clone(transport),
        TEST_WS_BASE,
        Arc::clone(spot),
        Arc::clone(margin),
        test_timings(),
    )
}

/// Collects everything a stream handler receives
pub fn collector<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static)
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |item| sink.lock().unwrap().push(item))
}
