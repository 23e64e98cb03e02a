use anyhow::Context;
use binance_ws_streams::core::config::StreamConfig;
use binance_ws_streams::{BinanceWsClient, CloseOptions, DecodeError, StreamMessage};
use tracing::{error, info, warn};

fn print_message(
    stream: &'static str,
) -> impl Fn(Result<StreamMessage, DecodeError>) + Send + Sync + 'static {
    move |message| match message {
        Ok(message) => match serde_json::to_string(&message) {
            Ok(json) => println!("[{}] {}", stream, json),
            Err(e) => warn!("Failed to render {} message: {}", stream, e),
        },
        Err(e) => warn!("Dropped malformed {} frame: {}", stream, e),
    }
}

fn load_config() -> StreamConfig {
    #[cfg(feature = "env-file")]
    let loaded = StreamConfig::from_env_file("BINANCE");
    #[cfg(not(feature = "env-file"))]
    let loaded = StreamConfig::from_env("BINANCE");

    loaded.unwrap_or_else(|e| {
        info!("{}; streaming public market data only", e);
        StreamConfig::read_only()
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut symbols: Vec<String> = std::env::args().skip(1).collect();
    if symbols.is_empty() {
        symbols.push("BTCUSDT".to_string());
    }

    let config = load_config();
    let has_credentials = config.has_credentials();
    let client = BinanceWsClient::from_config(config).context("Failed to build stream client")?;

    let mut tickers = client
        .ticker(symbols.clone(), print_message("ticker"), true)
        .context("Failed to subscribe to tickers")?;
    info!("Streaming tickers for {}", symbols.join(", "));

    let user_stream = if has_credentials {
        match client.user().make_stream(print_message("user"), true).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Could not open the user data stream: {}", e);
                None
            }
        }
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    tickers.close();
    if let Some(handle) = user_stream {
        handle
            .close(CloseOptions::default())
            .await
            .context("Failed to close the user data stream")?;
    }

    Ok(())
}
