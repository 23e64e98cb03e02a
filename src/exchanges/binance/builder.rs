use super::client::BinanceWs;
use super::data_stream::{BinanceDataStreamRest, DataStreamVariant};
use super::user_stream::SessionTimings;
use crate::core::config::StreamConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{
    ApiKeySigner, ReqwestRest, RestClientBuilder, RestClientConfig, TungsteniteTransport,
};
use secrecy::Secret;
use std::sync::Arc;
use tracing::{debug, info};

/// Production client: tokio-tungstenite sockets and reqwest listen key calls
pub type BinanceWsClient = BinanceWs<TungsteniteTransport, BinanceDataStreamRest<ReqwestRest>>;

/// Build the REST client used for listen key operations
pub fn build_rest_client(config: &StreamConfig) -> Result<ReqwestRest, ExchangeError> {
    let rest_config = RestClientConfig::new(config.resolved_rest_base_url(), "binance".to_string())
        .with_timeout(30)
        .with_max_retries(3);

    let mut rest_builder = RestClientBuilder::new(rest_config);

    // Listen key endpoints only need the API key header
    if config.has_credentials() {
        let signer = Arc::new(ApiKeySigner::new(Secret::new(config.api_key().to_string())));
        rest_builder = rest_builder.with_signer(signer);
    } else {
        debug!("No API key configured, user data streams will be rejected");
    }

    rest_builder.build()
}

/// Build the production client from configuration
pub fn build_client(config: StreamConfig) -> Result<BinanceWsClient, ExchangeError> {
    config.validate()?;

    let rest = build_rest_client(&config)?;
    let ws_base_url = config.resolved_ws_base_url();
    info!(
        exchange = "binance",
        ws = %ws_base_url,
        testnet = config.testnet,
        "Building stream client"
    );

    let timings = SessionTimings {
        keep_alive_interval: config.keep_alive_interval(),
        reconnect_delay: config.reconnect_delay(),
    };

    Ok(BinanceWs::new(
        Arc::new(TungsteniteTransport::new()),
        ws_base_url,
        Arc::new(BinanceDataStreamRest::new(rest.clone(), DataStreamVariant::Spot)),
        Arc::new(BinanceDataStreamRest::new(rest, DataStreamVariant::Margin)),
        timings,
    ))
}

impl BinanceWsClient {
    pub fn from_config(config: StreamConfig) -> Result<Self, ExchangeError> {
        build_client(config)
    }
}
