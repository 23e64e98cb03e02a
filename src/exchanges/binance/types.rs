use serde::Deserialize;

// Raw stream payloads. Binance keys are single letters and case-sensitive
// ("e" vs "E"), so every field carries an explicit rename. All fields are
// optional: a missing key decodes to None rather than failing the frame.

/// One `[price, quantity]` book level
pub type BinanceLevel = [String; 2];

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceDepthUpdate {
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "U")]
    pub first_update_id: Option<i64>,
    #[serde(rename = "u")]
    pub final_update_id: Option<i64>,
    #[serde(rename = "b")]
    pub bids: Option<Vec<BinanceLevel>>,
    #[serde(rename = "a")]
    pub asks: Option<Vec<BinanceLevel>>,
}

/// Snapshot pushed on `<symbol>@depth<level>`; carries no symbol of its own
#[derive(Debug, Clone, Deserialize)]
pub struct BinancePartialDepth {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: Option<i64>,
    pub bids: Option<Vec<BinanceLevel>>,
    pub asks: Option<Vec<BinanceLevel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceKlineEvent {
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "k")]
    pub kline: Option<BinanceKline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BinanceKline {
    #[serde(rename = "t")]
    pub start_time: Option<i64>,
    #[serde(rename = "T")]
    pub close_time: Option<i64>,
    #[serde(rename = "f")]
    pub first_trade_id: Option<i64>,
    #[serde(rename = "L")]
    pub last_trade_id: Option<i64>,
    #[serde(rename = "o")]
    pub open: Option<String>,
    #[serde(rename = "h")]
    pub high: Option<String>,
    #[serde(rename = "l")]
    pub low: Option<String>,
    #[serde(rename = "c")]
    pub close: Option<String>,
    #[serde(rename = "v")]
    pub volume: Option<String>,
    #[serde(rename = "n")]
    pub trades: Option<i64>,
    #[serde(rename = "i")]
    pub interval: Option<String>,
    #[serde(rename = "x")]
    pub is_final: Option<bool>,
    #[serde(rename = "q")]
    pub quote_volume: Option<String>,
    #[serde(rename = "V")]
    pub buy_volume: Option<String>,
    #[serde(rename = "Q")]
    pub quote_buy_volume: Option<String>,
}

/// 24hr rolling window ticker
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceTicker {
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "p")]
    pub price_change: Option<String>,
    #[serde(rename = "P")]
    pub price_change_percent: Option<String>,
    #[serde(rename = "w")]
    pub weighted_avg: Option<String>,
    #[serde(rename = "x")]
    pub prev_day_close: Option<String>,
    #[serde(rename = "c")]
    pub cur_day_close: Option<String>,
    #[serde(rename = "Q")]
    pub close_trade_quantity: Option<String>,
    #[serde(rename = "b")]
    pub best_bid: Option<String>,
    #[serde(rename = "B")]
    pub best_bid_qnt: Option<String>,
    #[serde(rename = "a")]
    pub best_ask: Option<String>,
    #[serde(rename = "A")]
    pub best_ask_qnt: Option<String>,
    #[serde(rename = "o")]
    pub open: Option<String>,
    #[serde(rename = "h")]
    pub high: Option<String>,
    #[serde(rename = "l")]
    pub low: Option<String>,
    #[serde(rename = "v")]
    pub volume: Option<String>,
    #[serde(rename = "q")]
    pub volume_quote: Option<String>,
    #[serde(rename = "O")]
    pub open_time: Option<i64>,
    #[serde(rename = "C")]
    pub close_time: Option<i64>,
    #[serde(rename = "F")]
    pub first_trade_id: Option<i64>,
    #[serde(rename = "L")]
    pub last_trade_id: Option<i64>,
    #[serde(rename = "n")]
    pub total_trades: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAggTrade {
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "T")]
    pub timestamp: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "p")]
    pub price: Option<String>,
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    #[serde(rename = "m")]
    pub is_buyer_maker: Option<bool>,
    #[serde(rename = "M")]
    pub was_best_price: Option<bool>,
    #[serde(rename = "a")]
    pub agg_id: Option<i64>,
    #[serde(rename = "f")]
    pub first_id: Option<i64>,
    #[serde(rename = "l")]
    pub last_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceTrade {
    #[serde(rename = "e")]
    pub event_type: Option<String>,
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "T")]
    pub trade_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "p")]
    pub price: Option<String>,
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    #[serde(rename = "m")]
    pub is_buyer_maker: Option<bool>,
    #[serde(rename = "M")]
    pub maker: Option<bool>,
    #[serde(rename = "t")]
    pub trade_id: Option<i64>,
    #[serde(rename = "b")]
    pub buyer_order_id: Option<i64>,
    #[serde(rename = "a")]
    pub seller_order_id: Option<i64>,
}

// User data stream payloads

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceBalanceUpdate {
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "a")]
    pub asset: Option<String>,
    #[serde(rename = "d")]
    pub balance_delta: Option<String>,
    #[serde(rename = "T")]
    pub clear_time: Option<i64>,
}

/// Balance entry shared by the account snapshot events
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceStreamBalance {
    #[serde(rename = "a")]
    pub asset: Option<String>,
    #[serde(rename = "f")]
    pub free: Option<String>,
    #[serde(rename = "l")]
    pub locked: Option<String>,
}

/// Legacy `outboundAccountInfo` account snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAccountInfo {
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "m")]
    pub maker_commission_rate: Option<i64>,
    #[serde(rename = "t")]
    pub taker_commission_rate: Option<i64>,
    #[serde(rename = "b")]
    pub buyer_commission_rate: Option<i64>,
    #[serde(rename = "s")]
    pub seller_commission_rate: Option<i64>,
    #[serde(rename = "T")]
    pub can_trade: Option<bool>,
    #[serde(rename = "W")]
    pub can_withdraw: Option<bool>,
    #[serde(rename = "D")]
    pub can_deposit: Option<bool>,
    #[serde(rename = "u")]
    pub last_account_update: Option<i64>,
    #[serde(rename = "B")]
    pub balances: Option<Vec<BinanceStreamBalance>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAccountPosition {
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "u")]
    pub last_account_update: Option<i64>,
    #[serde(rename = "B")]
    pub balances: Option<Vec<BinanceStreamBalance>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceExecutionReport {
    #[serde(rename = "E")]
    pub event_time: Option<i64>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "c")]
    pub new_client_order_id: Option<String>,
    #[serde(rename = "C")]
    pub original_client_order_id: Option<String>,
    #[serde(rename = "S")]
    pub side: Option<String>,
    #[serde(rename = "o")]
    pub order_type: Option<String>,
    #[serde(rename = "f")]
    pub time_in_force: Option<String>,
    #[serde(rename = "q")]
    pub quantity: Option<String>,
    #[serde(rename = "p")]
    pub price: Option<String>,
    #[serde(rename = "x")]
    pub execution_type: Option<String>,
    #[serde(rename = "P")]
    pub stop_price: Option<String>,
    #[serde(rename = "F")]
    pub iceberg_quantity: Option<String>,
    #[serde(rename = "X")]
    pub order_status: Option<String>,
    #[serde(rename = "r")]
    pub order_reject_reason: Option<String>,
    #[serde(rename = "i")]
    pub order_id: Option<i64>,
    #[serde(rename = "T")]
    pub order_time: Option<i64>,
    #[serde(rename = "l")]
    pub last_trade_quantity: Option<String>,
    #[serde(rename = "z")]
    pub total_trade_quantity: Option<String>,
    #[serde(rename = "L")]
    pub price_last_trade: Option<String>,
    #[serde(rename = "n")]
    pub commission: Option<String>,
    #[serde(rename = "N")]
    pub commission_asset: Option<String>,
    #[serde(rename = "t")]
    pub trade_id: Option<i64>,
    #[serde(rename = "w")]
    pub is_order_working: Option<bool>,
    #[serde(rename = "m")]
    pub is_buyer_maker: Option<bool>,
    #[serde(rename = "O")]
    pub creation_time: Option<i64>,
    #[serde(rename = "Z")]
    pub total_quote_trade_quantity: Option<String>,
    #[serde(rename = "g")]
    pub order_list_id: Option<i64>,
    #[serde(rename = "Q")]
    pub quote_order_quantity: Option<String>,
    #[serde(rename = "Y")]
    pub last_quote_transacted: Option<String>,
}

/// Body returned by `POST userDataStream`
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceListenKeyResponse {
    #[serde(rename = "listenKey")]
    pub listen_key: String,
}
