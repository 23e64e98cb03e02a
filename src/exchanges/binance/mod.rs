pub mod builder;
pub mod channel;
pub mod client;
pub mod codec;
pub mod converters;
pub mod data_stream;
pub mod events;
pub mod market_data;
pub mod types;
pub mod user_stream;

// Re-export main types for easier importing
pub use builder::{build_client, BinanceWsClient};
pub use channel::{ChannelPath, ChannelSocketFactory, StreamDisposer, CLOSE_REASON};
pub use client::BinanceWs;
pub use codec::{BinanceCodec, StreamKind};
pub use data_stream::{BinanceDataStreamRest, DataStreamOperations, DataStreamVariant, ListenKey};
pub use events::{MessageHandler, NormalizedEvent, StreamMessage};
pub use market_data::{MarketStreams, PartialDepthSubscription, Subscriptions};
pub use user_stream::{
    SessionState, SessionTimings, UserSession, UserStreamHandle, UserStreamManager,
};
