use super::events::{
    AccountBalance, AccountEvent, AccountPositionEvent, AggTradeEvent, BalanceUpdateEvent,
    CandleEvent, DepthEvent, ExecutionReportEvent, NormalizedEvent, PartialDepthEvent,
    PositionBalance, PriceLevel, TickerEvent, TradeEvent,
};
use super::types as binance_types;
use crate::core::errors::DecodeError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Wire key carrying the user stream event tag
const USER_EVENT_TAG: &str = "e";
/// Key the tag is renamed to in passthrough payloads
const PASSTHROUGH_TAG: &str = "type";

fn decode_as<T: DeserializeOwned>(kind: &'static str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::Shape { kind, source })
}

fn convert_levels(levels: Option<Vec<binance_types::BinanceLevel>>) -> Option<Vec<PriceLevel>> {
    levels.map(|levels| {
        levels
            .into_iter()
            .map(|[price, quantity]| PriceLevel { price, quantity })
            .collect()
    })
}

/// Convert binance diff depth update to normalized depth event
pub fn convert_depth_update(update: binance_types::BinanceDepthUpdate) -> DepthEvent {
    DepthEvent {
        event_type: update.event_type,
        event_time: update.event_time,
        symbol: update.symbol,
        first_update_id: update.first_update_id,
        final_update_id: update.final_update_id,
        bid_depth: convert_levels(update.bids),
        ask_depth: convert_levels(update.asks),
    }
}

/// Convert binance partial book snapshot; the payload carries no symbol, so
/// the subscription supplies it
pub fn convert_partial_depth(
    depth: binance_types::BinancePartialDepth,
    symbol: &str,
    level: u16,
) -> PartialDepthEvent {
    PartialDepthEvent {
        symbol: symbol.to_string(),
        level,
        last_update_id: depth.last_update_id,
        bids: convert_levels(depth.bids),
        asks: convert_levels(depth.asks),
    }
}

pub fn convert_kline_event(event: binance_types::BinanceKlineEvent) -> CandleEvent {
    let kline = event.kline.unwrap_or_default();
    CandleEvent {
        event_type: event.event_type,
        event_time: event.event_time,
        symbol: event.symbol,
        start_time: kline.start_time,
        close_time: kline.close_time,
        first_trade_id: kline.first_trade_id,
        last_trade_id: kline.last_trade_id,
        open: kline.open,
        high: kline.high,
        low: kline.low,
        close: kline.close,
        volume: kline.volume,
        trades: kline.trades,
        interval: kline.interval,
        is_final: kline.is_final,
        quote_volume: kline.quote_volume,
        buy_volume: kline.buy_volume,
        quote_buy_volume: kline.quote_buy_volume,
    }
}

pub fn convert_ticker(ticker: binance_types::BinanceTicker) -> TickerEvent {
    TickerEvent {
        event_type: ticker.event_type,
        event_time: ticker.event_time,
        symbol: ticker.symbol,
        price_change: ticker.price_change,
        price_change_percent: ticker.price_change_percent,
        weighted_avg: ticker.weighted_avg,
        prev_day_close: ticker.prev_day_close,
        cur_day_close: ticker.cur_day_close,
        close_trade_quantity: ticker.close_trade_quantity,
        best_bid: ticker.best_bid,
        best_bid_qnt: ticker.best_bid_qnt,
        best_ask: ticker.best_ask,
        best_ask_qnt: ticker.best_ask_qnt,
        open: ticker.open,
        high: ticker.high,
        low: ticker.low,
        volume: ticker.volume,
        volume_quote: ticker.volume_quote,
        open_time: ticker.open_time,
        close_time: ticker.close_time,
        first_trade_id: ticker.first_trade_id,
        last_trade_id: ticker.last_trade_id,
        total_trades: ticker.total_trades,
    }
}

pub fn convert_agg_trade(trade: binance_types::BinanceAggTrade) -> AggTradeEvent {
    AggTradeEvent {
        event_type: trade.event_type,
        event_time: trade.event_time,
        timestamp: trade.timestamp,
        symbol: trade.symbol,
        price: trade.price,
        quantity: trade.quantity,
        is_buyer_maker: trade.is_buyer_maker,
        was_best_price: trade.was_best_price,
        agg_id: trade.agg_id,
        first_id: trade.first_id,
        last_id: trade.last_id,
    }
}

pub fn convert_trade(trade: binance_types::BinanceTrade) -> TradeEvent {
    TradeEvent {
        event_type: trade.event_type,
        event_time: trade.event_time,
        trade_time: trade.trade_time,
        symbol: trade.symbol,
        price: trade.price,
        quantity: trade.quantity,
        is_buyer_maker: trade.is_buyer_maker,
        maker: trade.maker,
        trade_id: trade.trade_id,
        buyer_order_id: trade.buyer_order_id,
        seller_order_id: trade.seller_order_id,
    }
}

pub fn convert_balance_update(update: binance_types::BinanceBalanceUpdate) -> BalanceUpdateEvent {
    BalanceUpdateEvent {
        asset: update.asset,
        balance_delta: update.balance_delta,
        clear_time: update.clear_time,
        event_time: update.event_time,
        event_type: "balanceUpdate",
    }
}

pub fn convert_account_info(info: binance_types::BinanceAccountInfo) -> AccountEvent {
    let balances = info
        .balances
        .unwrap_or_default()
        .into_iter()
        .map(|balance| {
            (
                balance.asset.unwrap_or_default(),
                AccountBalance {
                    available: balance.free,
                    locked: balance.locked,
                },
            )
        })
        .collect();

    AccountEvent {
        event_type: "account",
        event_time: info.event_time,
        maker_commission_rate: info.maker_commission_rate,
        taker_commission_rate: info.taker_commission_rate,
        buyer_commission_rate: info.buyer_commission_rate,
        seller_commission_rate: info.seller_commission_rate,
        can_trade: info.can_trade,
        can_withdraw: info.can_withdraw,
        can_deposit: info.can_deposit,
        last_account_update: info.last_account_update,
        balances,
    }
}

pub fn convert_account_position(
    position: binance_types::BinanceAccountPosition,
) -> AccountPositionEvent {
    AccountPositionEvent {
        balances: position
            .balances
            .unwrap_or_default()
            .into_iter()
            .map(|balance| PositionBalance {
                asset: balance.asset,
                free: balance.free,
                locked: balance.locked,
            })
            .collect(),
        event_time: position.event_time,
        event_type: "outboundAccountPosition",
        last_account_update: position.last_account_update,
    }
}

pub fn convert_execution_report(
    report: binance_types::BinanceExecutionReport,
) -> ExecutionReportEvent {
    ExecutionReportEvent {
        event_type: "executionReport",
        event_time: report.event_time,
        symbol: report.symbol,
        new_client_order_id: report.new_client_order_id,
        original_client_order_id: report.original_client_order_id,
        side: report.side,
        order_type: report.order_type,
        time_in_force: report.time_in_force,
        quantity: report.quantity,
        price: report.price,
        execution_type: report.execution_type,
        stop_price: report.stop_price,
        iceberg_quantity: report.iceberg_quantity,
        order_status: report.order_status,
        order_reject_reason: report.order_reject_reason,
        order_id: report.order_id,
        order_time: report.order_time,
        last_trade_quantity: report.last_trade_quantity,
        total_trade_quantity: report.total_trade_quantity,
        price_last_trade: report.price_last_trade,
        commission: report.commission,
        commission_asset: report.commission_asset,
        trade_id: report.trade_id,
        is_order_working: report.is_order_working,
        is_buyer_maker: report.is_buyer_maker,
        creation_time: report.creation_time,
        total_quote_trade_quantity: report.total_quote_trade_quantity,
        order_list_id: report.order_list_id,
        quote_order_quantity: report.quote_order_quantity,
        last_quote_transacted: report.last_quote_transacted,
    }
}

// JSON entry points used by the frame codec

pub fn normalize_depth(value: Value) -> Result<NormalizedEvent, DecodeError> {
    decode_as("depth", value)
        .map(convert_depth_update)
        .map(NormalizedEvent::Depth)
}

pub fn normalize_partial_depth(
    value: Value,
    symbol: &str,
    level: u16,
) -> Result<NormalizedEvent, DecodeError> {
    decode_as("partial depth", value)
        .map(|depth| convert_partial_depth(depth, symbol, level))
        .map(NormalizedEvent::PartialDepth)
}

pub fn normalize_candle(value: Value) -> Result<NormalizedEvent, DecodeError> {
    decode_as("candle", value)
        .map(convert_kline_event)
        .map(NormalizedEvent::Candle)
}

pub fn normalize_ticker(value: Value) -> Result<NormalizedEvent, DecodeError> {
    decode_as("ticker", value)
        .map(convert_ticker)
        .map(NormalizedEvent::Ticker)
}

pub fn normalize_agg_trade(value: Value) -> Result<NormalizedEvent, DecodeError> {
    decode_as("aggregated trade", value)
        .map(convert_agg_trade)
        .map(NormalizedEvent::AggTrade)
}

pub fn normalize_trade(value: Value) -> Result<NormalizedEvent, DecodeError> {
    decode_as("trade", value)
        .map(convert_trade)
        .map(NormalizedEvent::Trade)
}

/// Move the `e` tag to `type`; a missing tag becomes `"type": null`
fn rename_event_tag(mut payload: Map<String, Value>) -> Map<String, Value> {
    let tag = payload.remove(USER_EVENT_TAG).unwrap_or(Value::Null);
    payload.insert(PASSTHROUGH_TAG.to_string(), tag);
    payload
}

fn into_object(value: Value) -> Result<Map<String, Value>, DecodeError> {
    match value {
        Value::Object(payload) => Ok(payload),
        _ => Err(DecodeError::NotAnObject("user")),
    }
}

/// Untransformed user payload: the decoded object with `e` renamed to `type`
pub fn user_passthrough(value: Value) -> Result<Value, DecodeError> {
    into_object(value)
        .map(rename_event_tag)
        .map(Value::Object)
}

/// Dispatch a user stream payload on its event tag
///
/// Unknown or missing tags are passed through with the tag renamed, never
/// dropped.
pub fn normalize_user_event(value: Value) -> Result<NormalizedEvent, DecodeError> {
    let payload = into_object(value)?;
    let tag = payload
        .get(USER_EVENT_TAG)
        .and_then(Value::as_str)
        .map(str::to_string);

    match tag.as_deref() {
        Some("balanceUpdate") => decode_as("balanceUpdate", Value::Object(payload))
            .map(convert_balance_update)
            .map(NormalizedEvent::BalanceUpdate),
        Some("outboundAccountInfo") => decode_as("outboundAccountInfo", Value::Object(payload))
            .map(convert_account_info)
            .map(NormalizedEvent::Account),
        Some("outboundAccountPosition") => {
            decode_as("outboundAccountPosition", Value::Object(payload))
                .map(convert_account_position)
                .map(NormalizedEvent::AccountPosition)
        }
        Some("executionReport") => decode_as("executionReport", Value::Object(payload))
            .map(convert_execution_report)
            .map(NormalizedEvent::ExecutionReport),
        _ => Ok(NormalizedEvent::Unrecognized(rename_event_tag(payload))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<String> {
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_depth_levels_become_price_quantity_records() {
        let event = normalize_depth(json!({
            "e": "depthUpdate", "E": 123456789, "s": "BNBBTC", "U": 157, "u": 160,
            "b": [["0.0024", "10"]], "a": [["0.0026", "100"], ["0.0027", "5"]]
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["symbol"], "BNBBTC");
        assert_eq!(json["firstUpdateId"], 157);
        assert_eq!(json["finalUpdateId"], 160);
        assert_eq!(json["bidDepth"], json!([{"price": "0.0024", "quantity": "10"}]));
        assert_eq!(json["askDepth"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_partial_depth_takes_symbol_and_level_from_subscription() {
        let event = normalize_partial_depth(
            json!({"lastUpdateId": 160, "bids": [["0.0024", "10"]], "asks": []}),
            "ETHBTC",
            10,
        )
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            keys(&json),
            vec!["asks", "bids", "lastUpdateId", "level", "symbol"]
        );
        assert_eq!(json["symbol"], "ETHBTC");
        assert_eq!(json["level"], 10);
        assert_eq!(json["asks"], json!([]));
    }

    #[test]
    fn test_candle_flattens_kline_fields() {
        let event = normalize_candle(json!({
            "e": "kline", "E": 1, "s": "BNBBTC",
            "k": {"t": 100, "T": 200, "s": "BNBBTC", "i": "1m", "f": 10, "L": 20,
                  "o": "0.1", "c": "0.2", "h": "0.3", "l": "0.05", "v": "1000", "n": 11,
                  "x": false, "q": "1.0", "V": "500", "Q": "0.5", "B": "0"}
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 18);
        assert_eq!(json["startTime"], 100);
        assert_eq!(json["interval"], "1m");
        assert_eq!(json["isFinal"], false);
        assert_eq!(json["quoteBuyVolume"], "0.5");
    }

    #[test]
    fn test_ticker_missing_fields_serialize_as_null() {
        let event = normalize_ticker(json!({"e": "24hrTicker", "s": "BTCUSDT", "c": "42000.1"}))
            .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 23);
        assert_eq!(json["curDayClose"], "42000.1");
        assert!(json["bestBidQnt"].is_null());
        assert!(json["totalTrades"].is_null());
    }

    #[test]
    fn test_trade_and_agg_trade_field_names() {
        let trade = serde_json::to_value(
            normalize_trade(json!({"e": "trade", "t": 12345, "b": 88, "a": 50, "M": true}))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(trade["tradeId"], 12345);
        assert_eq!(trade["buyerOrderId"], 88);
        assert_eq!(trade["sellerOrderId"], 50);
        assert_eq!(trade["maker"], true);

        let agg = serde_json::to_value(
            normalize_agg_trade(json!({"e": "aggTrade", "a": 7, "f": 100, "l": 105, "M": true}))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(agg["aggId"], 7);
        assert_eq!(agg["lastId"], 105);
        assert_eq!(agg["wasBestPrice"], true);
    }

    #[test]
    fn test_wrong_type_is_shape_error() {
        let err = normalize_trade(json!({"p": 42})).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { kind: "trade", .. }));
    }

    #[test]
    fn test_account_info_balances_keyed_by_asset() {
        let event = normalize_user_event(json!({
            "e": "outboundAccountInfo", "E": 1499405658849_i64, "m": 0, "t": 0, "b": 0, "s": 0,
            "T": true, "W": true, "D": true, "u": 1499405658848_i64,
            "B": [{"a": "LTC", "f": "17366.18538083", "l": "0.00000000"},
                  {"a": "BTC", "f": "10537.85314051", "l": "2.19464093"}]
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "account");
        assert_eq!(json["canWithdraw"], true);
        assert_eq!(
            json["balances"]["BTC"],
            json!({"available": "10537.85314051", "locked": "2.19464093"})
        );
    }

    #[test]
    fn test_account_position_balances_as_list() {
        let event = normalize_user_event(json!({
            "e": "outboundAccountPosition", "E": 1564034571105_i64, "u": 1564034571073_i64,
            "B": [{"a": "ETH", "f": "10000.000000", "l": "0.000000"}]
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            keys(&json),
            vec!["balances", "eventTime", "eventType", "lastAccountUpdate"]
        );
        assert_eq!(
            json["balances"],
            json!([{"asset": "ETH", "free": "10000.000000", "locked": "0.000000"}])
        );
    }

    #[test]
    fn test_execution_report_carries_every_field() {
        let event = normalize_user_event(json!({
            "e": "executionReport", "E": 1499405658658_i64, "s": "ETHBTC",
            "c": "mUvoqJxFIILMdfAW5iGSOW", "S": "BUY", "o": "LIMIT", "f": "GTC",
            "q": "1.00000000", "p": "0.10264410", "P": "0.00000000", "F": "0.00000000",
            "g": -1, "C": "", "x": "NEW", "X": "NEW", "r": "NONE", "i": 4293153,
            "l": "0.00000000", "z": "0.00000000", "L": "0.00000000", "n": "0", "N": null,
            "T": 1499405658657_i64, "t": -1, "I": 8641984, "w": true, "m": false, "M": false,
            "O": 1499405658657_i64, "Z": "0.00000000", "Y": "0.00000000", "Q": "0.00000000"
        }))
        .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 30);
        assert_eq!(json["eventType"], "executionReport");
        assert_eq!(json["newClientOrderId"], "mUvoqJxFIILMdfAW5iGSOW");
        assert_eq!(json["orderListId"], -1);
        assert!(json["commissionAsset"].is_null());
        assert!(json.get("I").is_none());
    }

    #[test]
    fn test_unknown_user_event_renames_tag_only() {
        let payload = json!({"e": "listStatus", "E": 1, "s": "ETHBTC", "extra": {"x": [1, 2]}});
        let event = normalize_user_event(payload).unwrap();

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "listStatus", "E": 1, "s": "ETHBTC", "extra": {"x": [1, 2]}})
        );
    }

    #[test]
    fn test_user_payload_without_tag_passes_through() {
        let event = normalize_user_event(json!({"E": 5})).unwrap();
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": null, "E": 5})
        );
    }

    #[test]
    fn test_user_passthrough_requires_object() {
        assert_eq!(
            user_passthrough(json!({"e": "balanceUpdate", "a": "BTC"})).unwrap(),
            json!({"type": "balanceUpdate", "a": "BTC"})
        );
        assert!(matches!(
            user_passthrough(json!([1, 2])),
            Err(DecodeError::NotAnObject("user"))
        ));
    }
}
