use super::channel::{ChannelPath, ChannelSocketFactory, StreamDisposer};
use super::codec::{BinanceCodec, StreamKind};
use super::events::{MessageHandler, StreamMessage};
use crate::core::errors::{DecodeError, ExchangeError};
use crate::core::kernel::Transport;
use crate::core::types::{validate_depth_symbol, validate_symbol, KlineInterval};
use std::sync::Arc;
use tracing::{info, instrument};

/// One subscription or an ordered batch of them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriptions<T>(Vec<T>);

impl<T> Subscriptions<T> {
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<T>> for Subscriptions<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T: Clone> From<&[T]> for Subscriptions<T> {
    fn from(items: &[T]) -> Self {
        Self(items.to_vec())
    }
}

impl<T, const N: usize> From<[T; N]> for Subscriptions<T> {
    fn from(items: [T; N]) -> Self {
        Self(items.into())
    }
}

impl From<&str> for Subscriptions<String> {
    fn from(symbol: &str) -> Self {
        Self(vec![symbol.to_string()])
    }
}

impl From<String> for Subscriptions<String> {
    fn from(symbol: String) -> Self {
        Self(vec![symbol])
    }
}

impl From<Vec<&str>> for Subscriptions<String> {
    fn from(symbols: Vec<&str>) -> Self {
        Self(symbols.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Subscriptions<String> {
    fn from(symbols: &[&str]) -> Self {
        Self(symbols.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Subscriptions<String> {
    fn from(symbols: [&str; N]) -> Self {
        Self(symbols.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<PartialDepthSubscription> for Subscriptions<PartialDepthSubscription> {
    fn from(subscription: PartialDepthSubscription) -> Self {
        Self(vec![subscription])
    }
}

/// Top `level` book entries for `symbol` (optionally `SYMBOL@speed`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDepthSubscription {
    pub symbol: String,
    pub level: u16,
}

impl PartialDepthSubscription {
    pub fn new(symbol: impl Into<String>, level: u16) -> Self {
        Self {
            symbol: symbol.into(),
            level,
        }
    }
}

/// Reject the whole batch on the first bad symbol; `@speed` is only allowed on depth channels
fn check_symbols(symbols: &[String], allow_speed: bool) -> Result<(), ExchangeError> {
    let validate = if allow_speed {
        validate_depth_symbol
    } else {
        validate_symbol
    };
    for symbol in symbols {
        validate(symbol).map_err(|e| ExchangeError::InvalidParameters(e.to_string()))?;
    }
    Ok(())
}

/// Public market data streams, one socket per subscription
pub struct MarketStreams<T: Transport> {
    factory: ChannelSocketFactory<T>,
}

impl<T: Transport> Clone for MarketStreams<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
        }
    }
}

impl<T: Transport> MarketStreams<T> {
    pub fn new(factory: ChannelSocketFactory<T>) -> Self {
        Self { factory }
    }

    fn open_all(
        &self,
        channels: Vec<(ChannelPath, StreamKind)>,
        handler: MessageHandler,
        transform: bool,
    ) -> StreamDisposer<T::Handle> {
        let handles = channels
            .into_iter()
            .map(|(path, kind)| {
                let handler = Arc::clone(&handler);
                self.factory.open(
                    &path,
                    BinanceCodec::new(kind, transform),
                    move |message| handler(message),
                )
            })
            .collect();
        StreamDisposer::new(handles)
    }

    fn open_symbols<F>(
        &self,
        symbols: Subscriptions<String>,
        allow_speed: bool,
        transform: bool,
        handler: F,
        channel: impl Fn(&str) -> (ChannelPath, StreamKind),
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        let symbols = symbols.into_vec();
        check_symbols(&symbols, allow_speed)?;
        let channels = symbols.iter().map(|symbol| channel(symbol)).collect();
        Ok(self.open_all(channels, Arc::new(handler), transform))
    }

    /// Diff depth updates (`<symbol>@depth[@speed]`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn depth<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.open_symbols(symbols.into(), true, transform, handler, |symbol| {
            (ChannelPath::depth(symbol), StreamKind::Depth)
        })
    }

    /// Top-N book snapshots (`<symbol>@depth<level>[@speed]`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn partial_depth<F>(
        &self,
        subscriptions: impl Into<Subscriptions<PartialDepthSubscription>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        let subscriptions = subscriptions.into().into_vec();
        let symbols: Vec<String> = subscriptions.iter().map(|s| s.symbol.clone()).collect();
        check_symbols(&symbols, true)?;
        if let Some(bad) = subscriptions.iter().find(|s| s.level == 0) {
            return Err(ExchangeError::InvalidParameters(format!(
                "Partial depth level must be positive for {}",
                bad.symbol
            )));
        }

        let channels = subscriptions
            .into_iter()
            .map(|subscription| {
                (
                    ChannelPath::partial_depth(&subscription.symbol, subscription.level),
                    StreamKind::PartialDepth {
                        symbol: subscription.symbol,
                        level: subscription.level,
                    },
                )
            })
            .collect();
        Ok(self.open_all(channels, Arc::new(handler), transform))
    }

    /// Candlesticks (`<symbol>@kline_<interval>`)
    #[instrument(skip_all, fields(exchange = "binance", interval = %interval))]
    pub fn candles<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        interval: KlineInterval,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.open_symbols(symbols.into(), false, transform, handler, |symbol| {
            (ChannelPath::candles(symbol, interval), StreamKind::Candles)
        })
    }

    /// Raw trades (`<symbol>@trade`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn trades<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.open_symbols(symbols.into(), false, transform, handler, |symbol| {
            (ChannelPath::trades(symbol), StreamKind::Trades)
        })
    }

    /// Aggregated trades (`<symbol>@aggTrade`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn agg_trades<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.open_symbols(symbols.into(), false, transform, handler, |symbol| {
            (ChannelPath::agg_trades(symbol), StreamKind::AggTrades)
        })
    }

    /// 24hr rolling ticker (`<symbol>@ticker`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn ticker<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.open_symbols(symbols.into(), false, transform, handler, |symbol| {
            (ChannelPath::ticker(symbol), StreamKind::Ticker)
        })
    }

    /// Every symbol's ticker in one array frame (`!ticker@arr`)
    #[instrument(skip_all, fields(exchange = "binance"))]
    pub fn all_tickers<F>(&self, handler: F, transform: bool) -> StreamDisposer<T::Handle>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        info!("Subscribing to all market tickers");
        self.open_all(
            vec![(ChannelPath::all_tickers(), StreamKind::AllTickers)],
            Arc::new(handler),
            transform,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriptions_from_single_and_batches() {
        assert_eq!(
            Subscriptions::<String>::from("BTCUSDT").into_vec(),
            vec!["BTCUSDT"]
        );
        assert_eq!(
            Subscriptions::<String>::from(vec!["BTCUSDT", "ETHUSDT"]).into_vec(),
            vec!["BTCUSDT", "ETHUSDT"]
        );
        assert_eq!(Subscriptions::<String>::from(["A", "B", "C"]).len(), 3);

        let owned = vec!["BNBBTC".to_string()];
        assert_eq!(
            Subscriptions::<String>::from(owned.as_slice()).into_vec(),
            owned
        );
    }

    #[test]
    fn test_partial_depth_subscriptions() {
        let single: Subscriptions<PartialDepthSubscription> =
            PartialDepthSubscription::new("ETHBTC", 5).into();
        assert_eq!(single.len(), 1);

        let batch = Subscriptions::<PartialDepthSubscription>::from(vec![
            PartialDepthSubscription::new("ETHBTC", 5),
            PartialDepthSubscription::new("BNBBTC", 10),
        ]);
        assert_eq!(batch.into_vec()[1].level, 10);
    }

    #[test]
    fn test_check_symbols_rejects_empty() {
        assert!(check_symbols(&["BTCUSDT".to_string()], false).is_ok());
        assert!(matches!(
            check_symbols(&["BTCUSDT".to_string(), String::new()], false),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_check_symbols_speed_only_for_depth() {
        let symbols = ["BTCUSDT@100ms".to_string()];
        assert!(check_symbols(&symbols, true).is_ok());
        assert!(matches!(
            check_symbols(&symbols, false),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }
}
