use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TypesError {
    #[error("Unsupported kline interval: {0}")]
    InvalidInterval(String),
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

/// Candlestick intervals accepted by the `@kline_{interval}` channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineInterval {
    Seconds1,

    Minutes1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,

    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,

    Days1,
    Days3,

    Weeks1,

    Months1,
}

impl KlineInterval {
    /// Wire format used in channel names (e.g., "1m", "1h", "1M")
    pub const fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Seconds1 => "1s",
            Self::Minutes1 => "1m",
            Self::Minutes3 => "3m",
            Self::Minutes5 => "5m",
            Self::Minutes15 => "15m",
            Self::Minutes30 => "30m",
            Self::Hours1 => "1h",
            Self::Hours2 => "2h",
            Self::Hours4 => "4h",
            Self::Hours6 => "6h",
            Self::Hours8 => "8h",
            Self::Hours12 => "12h",
            Self::Days1 => "1d",
            Self::Days3 => "3d",
            Self::Weeks1 => "1w",
            Self::Months1 => "1M",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Seconds1,
            Self::Minutes1,
            Self::Minutes3,
            Self::Minutes5,
            Self::Minutes15,
            Self::Minutes30,
            Self::Hours1,
            Self::Hours2,
            Self::Hours4,
            Self::Hours6,
            Self::Hours8,
            Self::Hours12,
            Self::Days1,
            Self::Days3,
            Self::Weeks1,
            Self::Months1,
        ]
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_binance_str())
    }
}

impl FromStr for KlineInterval {
    type Err = TypesError;

    // Case-sensitive on purpose: "1m" is one minute, "1M" is one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|interval| interval.as_binance_str() == s)
            .ok_or_else(|| TypesError::InvalidInterval(s.to_string()))
    }
}

/// Check a plain stream symbol such as `BTCUSDT`
pub fn validate_symbol(symbol: &str) -> Result<(), TypesError> {
    if !is_symbol(symbol) {
        return Err(TypesError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

/// Check a depth symbol descriptor, which may carry an update speed (`BTCUSDT@100ms`)
pub fn validate_depth_symbol(symbol: &str) -> Result<(), TypesError> {
    let valid = match symbol.split_once('@') {
        Some((base, speed)) => is_symbol(base) && is_symbol(speed),
        None => is_symbol(symbol),
    };
    if !valid {
        return Err(TypesError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

fn is_symbol(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
}
