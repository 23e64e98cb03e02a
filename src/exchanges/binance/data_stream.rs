use super::types::BinanceListenKeyResponse;
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use async_trait::async_trait;
use std::fmt;
use tracing::instrument;

/// Server-issued token authorizing one user data stream
///
/// Expires about 60 minutes after the last keep-alive. `Debug` and
/// `Display` only show the first characters so keys stay out of logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ListenKey(String);

impl ListenKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The full key, for building URLs and request parameters
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn abbreviated(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for ListenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenKey").field(&self.abbreviated()).finish()
    }
}

impl fmt::Display for ListenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.abbreviated())
    }
}

/// Endpoint family for listen key operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStreamVariant {
    Spot,
    Margin,
}

impl DataStreamVariant {
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Spot => "/api/v3/userDataStream",
            Self::Margin => "/sapi/v1/userDataStream",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
        }
    }
}

/// Listen key lifecycle operations
#[async_trait]
pub trait DataStreamOperations: Send + Sync + 'static {
    /// Create (or fetch the current) listen key
    async fn get_data_stream(&self) -> Result<ListenKey, ExchangeError>;

    /// Extend the key's validity
    async fn keep_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError>;

    /// Invalidate the key
    async fn close_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError>;
}

/// REST implementation of `DataStreamOperations`
///
/// Requests are authenticated with the API key header only; these endpoints
/// take no signature.
#[derive(Debug, Clone)]
pub struct BinanceDataStreamRest<R: RestClient> {
    rest: R,
    variant: DataStreamVariant,
}

impl<R: RestClient> BinanceDataStreamRest<R> {
    pub fn new(rest: R, variant: DataStreamVariant) -> Self {
        Self { rest, variant }
    }

    pub fn variant(&self) -> DataStreamVariant {
        self.variant
    }
}

#[async_trait]
impl<R: RestClient + 'static> DataStreamOperations for BinanceDataStreamRest<R> {
    #[instrument(skip(self), fields(exchange = "binance", variant = self.variant.label()))]
    async fn get_data_stream(&self) -> Result<ListenKey, ExchangeError> {
        let response: BinanceListenKeyResponse =
            self.rest.post_json(self.variant.endpoint(), &[], true).await?;
        Ok(ListenKey::new(response.listen_key))
    }

    #[instrument(skip(self), fields(exchange = "binance", variant = self.variant.label()))]
    async fn keep_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError> {
        self.rest
            .put(
                self.variant.endpoint(),
                &[("listenKey", listen_key.expose())],
                true,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = "binance", variant = self.variant.label()))]
    async fn close_data_stream(&self, listen_key: &ListenKey) -> Result<(), ExchangeError> {
        self.rest
            .delete(
                self.variant.endpoint(),
                &[("listenKey", listen_key.expose())],
                true,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_key_debug_is_abbreviated() {
        let key = ListenKey::new("pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1");
        let debug = format!("{:?}", key);
        assert_eq!(debug, "ListenKey(\"pqia91…\")");
        assert_eq!(key.to_string(), "pqia91…");
        assert!(key.expose().ends_with("a65a1"));
    }

    #[test]
    fn test_variant_endpoints() {
        assert_eq!(DataStreamVariant::Spot.endpoint(), "/api/v3/userDataStream");
        assert_eq!(DataStreamVariant::Margin.endpoint(), "/sapi/v1/userDataStream");
    }
}
