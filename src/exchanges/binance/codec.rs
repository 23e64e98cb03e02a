use super::converters;
use super::events::StreamMessage;
use crate::core::errors::DecodeError;
use crate::core::kernel::WsCodec;
use serde_json::Value;

/// Which transform applies to a channel's frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Depth,
    PartialDepth { symbol: String, level: u16 },
    Candles,
    Ticker,
    AllTickers,
    AggTrades,
    Trades,
    User,
}

impl StreamKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::PartialDepth { .. } => "partial depth",
            Self::Candles => "candle",
            Self::Ticker => "ticker",
            Self::AllTickers => "all tickers",
            Self::AggTrades => "aggregated trade",
            Self::Trades => "trade",
            Self::User => "user",
        }
    }
}

/// Frame codec for one Binance raw stream
///
/// With `transform` off, frames are handed over as decoded JSON; the user
/// stream still gets its `e` tag renamed to `type`.
#[derive(Debug, Clone)]
pub struct BinanceCodec {
    kind: StreamKind,
    transform: bool,
}

impl BinanceCodec {
    pub fn new(kind: StreamKind, transform: bool) -> Self {
        Self { kind, transform }
    }

    pub fn kind(&self) -> &StreamKind {
        &self.kind
    }
}

impl WsCodec for BinanceCodec {
    type Message = StreamMessage;

    fn decode_frame(&self, frame: &str) -> Result<Self::Message, DecodeError> {
        let value: Value = serde_json::from_str(frame).map_err(DecodeError::Json)?;

        if !self.transform {
            return match self.kind {
                StreamKind::User => converters::user_passthrough(value).map(StreamMessage::Raw),
                _ => Ok(StreamMessage::Raw(value)),
            };
        }

        let event = match &self.kind {
            StreamKind::Depth => converters::normalize_depth(value)?,
            StreamKind::PartialDepth { symbol, level } => {
                converters::normalize_partial_depth(value, symbol, *level)?
            }
            StreamKind::Candles => converters::normalize_candle(value)?,
            StreamKind::Ticker => converters::normalize_ticker(value)?,
            StreamKind::AllTickers => {
                let Value::Array(tickers) = value else {
                    return Err(DecodeError::NotAnArray(self.kind.label()));
                };
                let events = tickers
                    .into_iter()
                    .map(converters::normalize_ticker)
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(StreamMessage::Events(events));
            }
            StreamKind::AggTrades => converters::normalize_agg_trade(value)?,
            StreamKind::Trades => converters::normalize_trade(value)?,
            StreamKind::User => converters::normalize_user_event(value)?,
        };

        Ok(StreamMessage::Event(event))
    }
}
