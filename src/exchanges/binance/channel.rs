use super::data_stream::ListenKey;
use crate::core::errors::DecodeError;
use crate::core::kernel::{
    CloseOptions, DropHandler, FrameHandler, StreamHandle, Transport, WsCodec, NORMAL_CLOSURE,
};
use crate::core::types::KlineInterval;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Reason sent with every caller-initiated close
pub const CLOSE_REASON: &str = "Close handle was called";

/// Name of one raw stream, appended to the socket base URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelPath(String);

/// Lower-case `SYMBOL@speed` and split off the optional speed
fn split_symbol(symbol: &str) -> (String, Option<String>) {
    let symbol = symbol.to_lowercase();
    if let Some((base, speed)) = symbol.split_once('@') {
        return (base.to_string(), Some(speed.to_string()));
    }
    (symbol, None)
}

fn with_speed(path: String, speed: Option<String>) -> String {
    match speed {
        Some(speed) => format!("{}@{}", path, speed),
        None => path,
    }
}

impl ChannelPath {
    /// `<symbol>@depth[@speed]`; the symbol may be given as `BTCUSDT@100ms`
    pub fn depth(symbol: &str) -> Self {
        let (symbol, speed) = split_symbol(symbol);
        Self(with_speed(format!("{}@depth", symbol), speed))
    }

    /// `<symbol>@depth<level>[@speed]`
    pub fn partial_depth(symbol: &str, level: u16) -> Self {
        let (symbol, speed) = split_symbol(symbol);
        Self(with_speed(format!("{}@depth{}", symbol, level), speed))
    }

    pub fn candles(symbol: &str, interval: KlineInterval) -> Self {
        Self(format!(
            "{}@kline_{}",
            symbol.to_lowercase(),
            interval.as_binance_str()
        ))
    }

    pub fn ticker(symbol: &str) -> Self {
        Self(format!("{}@ticker", symbol.to_lowercase()))
    }

    pub fn all_tickers() -> Self {
        Self("!ticker@arr".to_string())
    }

    pub fn agg_trades(symbol: &str) -> Self {
        Self(format!("{}@aggTrade", symbol.to_lowercase()))
    }

    pub fn trades(symbol: &str) -> Self {
        Self(format!("{}@trade", symbol.to_lowercase()))
    }

    pub fn user(listen_key: &ListenKey) -> Self {
        Self(listen_key.expose().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full socket URL under `base`
    pub fn url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.0)
    }
}

impl fmt::Display for ChannelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opens one socket per channel and routes its frames through a codec
pub struct ChannelSocketFactory<T: Transport> {
    transport: Arc<T>,
    base_url: String,
}

impl<T: Transport> Clone for ChannelSocketFactory<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            base_url: self.base_url.clone(),
        }
    }
}

impl<T: Transport> ChannelSocketFactory<T> {
    pub fn new(transport: Arc<T>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open `{base}/{path}`; the handler runs exactly once per inbound frame
    ///
    /// A frame that fails to decode reaches the handler as `Err` and the
    /// socket keeps going.
    pub fn open<C, F>(&self, path: &ChannelPath, codec: C, handler: F) -> T::Handle
    where
        C: WsCodec,
        F: Fn(Result<C::Message, DecodeError>) + Send + Sync + 'static,
    {
        self.open_socket(path, codec, handler, None)
    }

    /// Like `open`, and `on_drop` fires once if the connection ends without
    /// a close request
    pub fn open_watched<C, F>(
        &self,
        path: &ChannelPath,
        codec: C,
        handler: F,
        on_drop: DropHandler,
    ) -> T::Handle
    where
        C: WsCodec,
        F: Fn(Result<C::Message, DecodeError>) + Send + Sync + 'static,
    {
        self.open_socket(path, codec, handler, Some(on_drop))
    }

    fn open_socket<C, F>(
        &self,
        path: &ChannelPath,
        codec: C,
        handler: F,
        on_drop: Option<DropHandler>,
    ) -> T::Handle
    where
        C: WsCodec,
        F: Fn(Result<C::Message, DecodeError>) + Send + Sync + 'static,
    {
        let url = path.url(&self.base_url);
        debug!(exchange = "binance", channel = %log_name(path), "Opening channel socket");

        let on_frame: FrameHandler = Arc::new(move |frame: String| {
            handler(codec.decode_frame(&frame));
        });
        self.transport.open(&url, on_frame, on_drop)
    }
}

// User channel paths are listen keys; keep them out of logs
fn log_name(path: &ChannelPath) -> String {
    if path.0.contains('@') || path.0.starts_with('!') {
        path.0.clone()
    } else {
        let prefix: String = path.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

/// Owns the sockets opened by one constructor call
///
/// Dropping the disposer drops every handle, which shuts the sockets down.
pub struct StreamDisposer<H: StreamHandle> {
    handles: Vec<H>,
}

impl<H: StreamHandle> StreamDisposer<H> {
    pub fn new(handles: Vec<H>) -> Self {
        Self { handles }
    }

    /// Close every socket with code 1000 and the default options
    pub fn close(&mut self) {
        self.close_with(CloseOptions::default());
    }

    /// Close every socket with code 1000
    ///
    /// Handles are retained: with `keep_closed = false` the transport reopens
    /// each socket and a later close still reaches it.
    pub fn close_with(&mut self, options: CloseOptions) {
        for handle in &mut self.handles {
            handle.close(NORMAL_CLOSURE, CLOSE_REASON, options);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Socket URLs, in subscription order
    pub fn urls(&self) -> Vec<&str> {
        self.handles.iter().map(StreamHandle::url).collect()
    }

    pub fn handles(&self) -> &[H] {
        &self.handles
    }
}

impl<H: StreamHandle + fmt::Debug> fmt::Debug for StreamDisposer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDisposer")
            .field("sockets", &self.handles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_path_lowercases_and_keeps_speed() {
        assert_eq!(ChannelPath::depth("BTCUSDT").as_str(), "btcusdt@depth");
        assert_eq!(
            ChannelPath::depth("BTCUSDT@100ms").as_str(),
            "btcusdt@depth@100ms"
        );
        assert_eq!(
            ChannelPath::depth("BTCUSDT@100MS").as_str(),
            "btcusdt@depth@100ms"
        );
    }

    #[test]
    fn test_partial_depth_path() {
        assert_eq!(
            ChannelPath::partial_depth("ETHBTC", 10).as_str(),
            "ethbtc@depth10"
        );
        assert_eq!(
            ChannelPath::partial_depth("ETHBTC@100ms", 5).as_str(),
            "ethbtc@depth5@100ms"
        );
    }

    #[test]
    fn test_stream_paths() {
        assert_eq!(
            ChannelPath::candles("BNBBTC", KlineInterval::Minutes1).as_str(),
            "bnbbtc@kline_1m"
        );
        assert_eq!(ChannelPath::ticker("BNBBTC").as_str(), "bnbbtc@ticker");
        assert_eq!(ChannelPath::all_tickers().as_str(), "!ticker@arr");
        assert_eq!(ChannelPath::agg_trades("BNBBTC").as_str(), "bnbbtc@aggTrade");
        assert_eq!(ChannelPath::trades("BNBBTC").as_str(), "bnbbtc@trade");
        assert_eq!(
            ChannelPath::user(&ListenKey::new("abcDEF123")).as_str(),
            "abcDEF123"
        );
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let path = ChannelPath::trades("BTCUSDT");
        assert_eq!(
            path.url("wss://stream.binance.us:9443/ws"),
            "wss://stream.binance.us:9443/ws/btcusdt@trade"
        );
        assert_eq!(
            path.url("wss://stream.binance.us:9443/ws/"),
            "wss://stream.binance.us:9443/ws/btcusdt@trade"
        );
    }

    #[test]
    fn test_user_path_is_redacted_in_logs() {
        let path = ChannelPath::user(&ListenKey::new("pqia91ma19a5s61cv6a81va65sdf19v8a65a1"));
        assert_eq!(log_name(&path), "pqia91…");
        assert_eq!(log_name(&ChannelPath::all_tickers()), "!ticker@arr");
    }
}
