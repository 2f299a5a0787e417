use std::sync::Arc;
use std::time::Duration;

use candela::{CandlesConnector, CandlesFeed, FeedConfig};
use candela_dydx::DydxPerpetualCandles;
use candela_mock::{MockConnector, fixtures};
use tracing_subscriber::fmt::format::FmtSpan;

// Offline runs (CI) set CANDELA_EXAMPLES_USE_MOCK to avoid the network.
async fn connector() -> Result<Arc<dyn CandlesConnector>, Box<dyn std::error::Error>> {
    if std::env::var_os("CANDELA_EXAMPLES_USE_MOCK").is_some() {
        let (mock, ctl) = MockConnector::new_with_controller()?;
        ctl.set_history(fixtures::series(1_700_000_000, 60, 500)).await;
        let mock: Arc<dyn CandlesConnector> = mock;
        return Ok(mock);
    }
    let dydx: Arc<dyn CandlesConnector> = Arc::new(DydxPerpetualCandles::new_default()?);
    Ok(dydx)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,candela=debug,candela_middleware=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    let feed = CandlesFeed::builder()
        .connector(connector().await?)
        .config(FeedConfig::new("BTC-USD", "1m", 150))
        .build()?;

    println!("{}: {:?}", feed.name(), feed.check_network().await);

    let handle = feed.start().await?;
    let ready = tokio::time::timeout(Duration::from_secs(60), async {
        while !feed.is_ready() {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    })
    .await;
    if ready.is_err() {
        println!("window not full after 60s: {} candles", feed.len());
    }

    for candle in feed.candles().iter().rev().take(5) {
        println!(
            "{} o={} h={} l={} c={} v={}",
            candle.timestamp, candle.open, candle.high, candle.low, candle.close, candle.volume
        );
    }

    handle.stop().await;
    Ok(())
}
