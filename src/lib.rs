pub mod core;
pub mod exchanges;

pub use core::{
    config::StreamConfig,
    errors::{DecodeError, ExchangeError},
    kernel::CloseOptions,
    types::KlineInterval,
};
pub use exchanges::binance::{
    BinanceWs, BinanceWsClient, NormalizedEvent, PartialDepthSubscription, StreamMessage,
    UserStreamHandle,
};
