use crate::core::errors::DecodeError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// Normalized stream records. Field names serialize in camelCase and every
// field is always emitted, so a missing wire value shows up as `null`.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    pub price: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthEvent {
    pub event_type: Option<String>,
    pub event_time: Option<i64>,
    pub symbol: Option<String>,
    pub first_update_id: Option<i64>,
    pub final_update_id: Option<i64>,
    pub bid_depth: Option<Vec<PriceLevel>>,
    pub ask_depth: Option<Vec<PriceLevel>>,
}

/// Top-of-book snapshot; symbol and level come from the subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDepthEvent {
    pub symbol: String,
    pub level: u16,
    pub last_update_id: Option<i64>,
    pub bids: Option<Vec<PriceLevel>>,
    pub asks: Option<Vec<PriceLevel>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleEvent {
    pub event_type: Option<String>,
    pub event_time: Option<i64>,
    pub symbol: Option<String>,
    pub start_time: Option<i64>,
    pub close_time: Option<i64>,
    pub first_trade_id: Option<i64>,
    pub last_trade_id: Option<i64>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub trades: Option<i64>,
    pub interval: Option<String>,
    pub is_final: Option<bool>,
    pub quote_volume: Option<String>,
    pub buy_volume: Option<String>,
    pub quote_buy_volume: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEvent {
    pub event_type: Option<String>,
    pub event_time: Option<i64>,
    pub symbol: Option<String>,
    pub price_change: Option<String>,
    pub price_change_percent: Option<String>,
    pub weighted_avg: Option<String>,
    pub prev_day_close: Option<String>,
    pub cur_day_close: Option<String>,
    pub close_trade_quantity: Option<String>,
    pub best_bid: Option<String>,
    pub best_bid_qnt: Option<String>,
    pub best_ask: Option<String>,
    pub best_ask_qnt: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub volume: Option<String>,
    pub volume_quote: Option<String>,
    pub open_time: Option<i64>,
    pub close_time: Option<i64>,
    pub first_trade_id: Option<i64>,
    pub last_trade_id: Option<i64>,
    pub total_trades: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggTradeEvent {
    pub event_type: Option<String>,
    pub event_time: Option<i64>,
    pub timestamp: Option<i64>,
    pub symbol: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub is_buyer_maker: Option<bool>,
    pub was_best_price: Option<bool>,
    pub agg_id: Option<i64>,
    pub first_id: Option<i64>,
    pub last_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub event_type: Option<String>,
    pub event_time: Option<i64>,
    pub trade_time: Option<i64>,
    pub symbol: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub is_buyer_maker: Option<bool>,
    pub maker: Option<bool>,
    pub trade_id: Option<i64>,
    pub buyer_order_id: Option<i64>,
    pub seller_order_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateEvent {
    pub asset: Option<String>,
    pub balance_delta: Option<String>,
    pub clear_time: Option<i64>,
    pub event_time: Option<i64>,
    pub event_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub available: Option<String>,
    pub locked: Option<String>,
}

/// `outboundAccountInfo`, balances keyed by asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEvent {
    pub event_type: &'static str,
    pub event_time: Option<i64>,
    pub maker_commission_rate: Option<i64>,
    pub taker_commission_rate: Option<i64>,
    pub buyer_commission_rate: Option<i64>,
    pub seller_commission_rate: Option<i64>,
    pub can_trade: Option<bool>,
    pub can_withdraw: Option<bool>,
    pub can_deposit: Option<bool>,
    pub last_account_update: Option<i64>,
    pub balances: BTreeMap<String, AccountBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionBalance {
    pub asset: Option<String>,
    pub free: Option<String>,
    pub locked: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPositionEvent {
    pub balances: Vec<PositionBalance>,
    pub event_time: Option<i64>,
    pub event_type: &'static str,
    pub last_account_update: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReportEvent {
    pub event_type: &'static str,
    pub event_time: Option<i64>,
    pub symbol: Option<String>,
    pub new_client_order_id: Option<String>,
    pub original_client_order_id: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub time_in_force: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub execution_type: Option<String>,
    pub stop_price: Option<String>,
    pub iceberg_quantity: Option<String>,
    pub order_status: Option<String>,
    pub order_reject_reason: Option<String>,
    pub order_id: Option<i64>,
    pub order_time: Option<i64>,
    pub last_trade_quantity: Option<String>,
    pub total_trade_quantity: Option<String>,
    pub price_last_trade: Option<String>,
    pub commission: Option<String>,
    pub commission_asset: Option<String>,
    pub trade_id: Option<i64>,
    pub is_order_working: Option<bool>,
    pub is_buyer_maker: Option<bool>,
    pub creation_time: Option<i64>,
    pub total_quote_trade_quantity: Option<String>,
    pub order_list_id: Option<i64>,
    pub quote_order_quantity: Option<String>,
    pub last_quote_transacted: Option<String>,
}

/// One normalized record
///
/// Serializes as the bare record (no enum tag), so the JSON shape of each
/// variant is exactly its field list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedEvent {
    Depth(DepthEvent),
    PartialDepth(PartialDepthEvent),
    Candle(CandleEvent),
    Ticker(TickerEvent),
    AggTrade(AggTradeEvent),
    Trade(TradeEvent),
    BalanceUpdate(BalanceUpdateEvent),
    Account(AccountEvent),
    AccountPosition(AccountPositionEvent),
    ExecutionReport(ExecutionReportEvent),
    /// User event with an unknown tag: the payload with `e` renamed to `type`
    Unrecognized(Map<String, Value>),
}

impl NormalizedEvent {
    /// The event type tag, when the record carries one
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::Depth(e) => e.event_type.as_deref(),
            Self::PartialDepth(_) => None,
            Self::Candle(e) => e.event_type.as_deref(),
            Self::Ticker(e) => e.event_type.as_deref(),
            Self::AggTrade(e) => e.event_type.as_deref(),
            Self::Trade(e) => e.event_type.as_deref(),
            Self::BalanceUpdate(e) => Some(e.event_type),
            Self::Account(e) => Some(e.event_type),
            Self::AccountPosition(e) => Some(e.event_type),
            Self::ExecutionReport(e) => Some(e.event_type),
            Self::Unrecognized(payload) => payload.get("type").and_then(Value::as_str),
        }
    }
}

/// What a stream handler receives for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Event(NormalizedEvent),
    /// All-tickers frame, in array order
    Events(Vec<NormalizedEvent>),
    /// Decoded JSON, untransformed
    Raw(Value),
}

/// Callback invoked once per inbound frame
pub type MessageHandler = Arc<dyn Fn(Result<StreamMessage, DecodeError>) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serialization_emits_bare_record() {
        let event = NormalizedEvent::BalanceUpdate(BalanceUpdateEvent {
            asset: Some("BTC".to_string()),
            balance_delta: None,
            clear_time: Some(1),
            event_time: Some(2),
            event_type: "balanceUpdate",
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "asset": "BTC",
                "balanceDelta": null,
                "clearTime": 1,
                "eventTime": 2,
                "eventType": "balanceUpdate"
            })
        );
        assert_eq!(event.event_type(), Some("balanceUpdate"));
    }

    #[test]
    fn test_unrecognized_event_type_reads_renamed_tag() {
        let mut payload = Map::new();
        payload.insert("type".to_string(), Value::from("listenKeyExpired"));
        let event = NormalizedEvent::Unrecognized(payload);
        assert_eq!(event.event_type(), Some("listenKeyExpired"));
    }
}
