use crate::core::errors::ExchangeError;
use secrecy::{ExposeSecret, Secret};
use std::collections::HashMap;

/// Result type for signing operations: (headers, `query_params`)
pub type SignatureResult = Result<(HashMap<String, String>, Vec<(String, String)>), ExchangeError>;

/// Signer trait for request authentication
///
/// Implementations turn a request description into the headers and query
/// parameters the exchange expects for it.
pub trait Signer: Send + Sync {
    /// Sign a request and return headers and query parameters
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `query_string` - Query string (without leading '?')
    /// * `body` - Raw request body bytes
    ///
    /// # Returns
    /// Tuple of (headers, query_params) to include in the request
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
    ) -> SignatureResult;
}

/// Header-only authentication used by Binance `USER_STREAM` endpoints.
///
/// Listen key management needs the API key but no HMAC signature or timestamp.
pub struct ApiKeySigner {
    api_key: Secret<String>,
}

impl ApiKeySigner {
    pub const HEADER: &'static str = "X-MBX-APIKEY";

    pub fn new(api_key: Secret<String>) -> Self {
        Self { api_key }
    }
}

impl Signer for ApiKeySigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        query_string: &str,
        _body: &[u8],
    ) -> SignatureResult {
        let api_key = self.api_key.expose_secret();
        if api_key.is_empty() {
            return Err(ExchangeError::AuthError(
                "API key required for user data streams".to_string(),
            ));
        }

        let mut headers = HashMap::new();
        headers.insert(Self::HEADER.to_string(), api_key.clone());

        Ok((headers, split_query_string(query_string)))
    }
}

pub(crate) fn split_query_string(query_string: &str) -> Vec<(String, String)> {
    if query_string.is_empty() {
        return Vec::new();
    }
    query_string
        .split('&')
        .filter_map(|param| {
            param
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}
