/// Kernel - exchange-agnostic transport layer
///
/// Contains only transport logic and generic interfaces; everything that knows
/// about Binance lives under `exchanges::binance`.
///
/// ## Transport Layer
/// - `RestClient`: HTTP client interface, `ReqwestRest` implementation with retries
/// - `Transport` / `StreamHandle`: one socket per channel, frames pushed to a callback
/// - `TungsteniteTransport`: tokio-tungstenite implementation
///
/// ## Authentication
/// - `Signer`: pluggable request authentication
/// - `ApiKeySigner`: API key header for listen key endpoints
///
/// ## Message Handling
/// - `WsCodec`: stream-specific frame decoding
///
/// # Example
/// ```rust,no_run
/// use binance_ws_streams::core::kernel::*;
/// use secrecy::Secret;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rest_config = RestClientConfig::new("https://api.binance.us".to_string(), "binance".to_string());
/// let signer = Arc::new(ApiKeySigner::new(Secret::new("api_key".to_string())));
/// let _rest = RestClientBuilder::new(rest_config).with_signer(signer).build()?;
///
/// let transport = TungsteniteTransport::new();
/// # let _ = transport;
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{ApiKeySigner, SignatureResult, Signer};
pub use ws::{
    CloseOptions, DropHandler, FrameHandler, StreamHandle, Transport, TungsteniteHandle,
    TungsteniteTransport, WsConfig, NORMAL_CLOSURE,
};
