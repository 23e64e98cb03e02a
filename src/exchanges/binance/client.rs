use super::channel::{ChannelSocketFactory, StreamDisposer};
use super::data_stream::{DataStreamOperations, DataStreamVariant};
use super::events::StreamMessage;
use super::market_data::{MarketStreams, PartialDepthSubscription, Subscriptions};
use super::user_stream::{SessionTimings, UserStreamManager};
use crate::core::errors::{DecodeError, ExchangeError};
use crate::core::kernel::Transport;
use crate::core::types::KlineInterval;
use std::sync::Arc;

/// Binance WebSocket streams: public market data plus spot and margin user
/// data streams sharing one transport
pub struct BinanceWs<T: Transport, O: DataStreamOperations> {
    market: MarketStreams<T>,
    user: UserStreamManager<T, O>,
    margin_user: UserStreamManager<T, O>,
}

impl<T: Transport, O: DataStreamOperations> BinanceWs<T, O> {
    /// Assemble a client from its parts
    ///
    /// `spot_ops` and `margin_ops` should target the spot and margin listen
    /// key endpoints respectively.
    pub fn new(
        transport: Arc<T>,
        ws_base_url: impl Into<String>,
        spot_ops: Arc<O>,
        margin_ops: Arc<O>,
        timings: SessionTimings,
    ) -> Self {
        let factory = ChannelSocketFactory::new(transport, ws_base_url);
        Self {
            market: MarketStreams::new(factory.clone()),
            user: UserStreamManager::new(
                factory.clone(),
                spot_ops,
                timings,
                DataStreamVariant::Spot,
            ),
            margin_user: UserStreamManager::new(
                factory,
                margin_ops,
                timings,
                DataStreamVariant::Margin,
            ),
        }
    }

    pub fn market(&self) -> &MarketStreams<T> {
        &self.market
    }

    /// Spot account user data streams
    pub fn user(&self) -> &UserStreamManager<T, O> {
        &self.user
    }

    /// Margin account user data streams
    pub fn margin_user(&self) -> &UserStreamManager<T, O> {
        &self.margin_user
    }

    pub fn depth<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.depth(symbols, handler, transform)
    }

    pub fn partial_depth<F>(
        &self,
        subscriptions: impl Into<Subscriptions<PartialDepthSubscription>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.partial_depth(subscriptions, handler, transform)
    }

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
        self.market.candles(symbols, interval, handler, transform)
    }

    pub fn trades<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.trades(symbols, handler, transform)
    }

    pub fn agg_trades<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.agg_trades(symbols, handler, transform)
    }

    pub fn ticker<F>(
        &self,
        symbols: impl Into<Subscriptions<String>>,
        handler: F,
        transform: bool,
    ) -> Result<StreamDisposer<T::Handle>, ExchangeError>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.ticker(symbols, handler, transform)
    }

    pub fn all_tickers<F>(&self, handler: F, transform: bool) -> StreamDisposer<T::Handle>
    where
        F: Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static,
    {
        self.market.all_tickers(handler, transform)
    }
}
