use anyhow::Context;
use market_feed::config::{QueryConfig, StreamConfig};
use market_feed::format;
use market_feed::query::{Interval, QueryClient};

const DEFAULT_ROWS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Candles {
        symbol: String,
        interval: String,
        rows: u32,
    },
    Quote {
        symbol: String,
    },
    Stream {
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = match parse_args(&args) {
        Ok(Some(command)) => command,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(message) => {
            eprintln!("{}", message);
            print_usage();
            std::process::exit(1);
        }
    };

    // Logs go to stderr, stdout carries the command output
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match command {
        Command::Candles {
            symbol,
            interval,
            rows,
        } => run_candles(&symbol, &interval, rows).await,
        Command::Quote { symbol } => run_quote(&symbol).await,
        Command::Stream { symbol } => run_stream(&symbol).await,
    }
}

/// Parse command-line arguments; `Ok(None)` means help was requested
fn parse_args(args: &[String]) -> Result<Option<Command>, String> {
    let mut positional: Vec<&str> = Vec::new();
    let mut interval = Interval::OneMinute.as_str().to_string();
    let mut rows = DEFAULT_ROWS;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--interval" | "-i" => {
                interval = args
                    .get(i + 1)
                    .ok_or("--interval requires a value")?
                    .clone();
                i += 1;
            }
            "--rows" | "-n" => {
                let raw = args.get(i + 1).ok_or("--rows requires a value")?;
                rows = raw
                    .parse()
                    .map_err(|_| format!("Invalid row count: {}", raw))?;
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown argument: {}", flag));
            }
            value => positional.push(value),
        }
        i += 1;
    }

    let (name, symbol) = match positional.as_slice() {
        [] => return Ok(None),
        [name, symbol] => (*name, symbol.to_string()),
        [name] => return Err(format!("{} requires a SYMBOL", name)),
        _ => return Err(format!("Unexpected argument: {}", positional[2])),
    };

    match name {
        "candles" => Ok(Some(Command::Candles {
            symbol,
            interval,
            rows,
        })),
        "quote" => Ok(Some(Command::Quote { symbol })),
        "stream" => Ok(Some(Command::Stream { symbol })),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn print_usage() {
    println!("market-feed - K-line, quote and live tick client");
    println!();
    println!("USAGE:");
    println!("    market-feed candles <SYMBOL> [--interval <INTERVAL>] [--rows <N>]");
    println!("    market-feed quote <SYMBOL>");
    println!("    market-feed stream <SYMBOL>");
    println!();
    println!("OPTIONS:");
    println!("    --interval, -i <INTERVAL>   Bar interval: 1m, 5m, 15m, 30m, 1h, 1d, 1M (default: 1m)");
    println!("    --rows, -n <N>              Number of bars (default: {})", DEFAULT_ROWS);
    println!("    --help, -h                  Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    MARKET_KLINE_URL                K-line endpoint");
    println!("    MARKET_QUOTE_URL                Quote endpoint");
    println!("    MARKET_HTTP_TIMEOUT_SECS        HTTP request timeout (default: 30)");
    println!("    MARKET_WS_URL                   Streaming endpoint");
    println!("    MARKET_RECONNECT_DELAY_SECS     Fixed reconnect delay (default: 5)");
    println!("    MARKET_MAX_RECONNECT_ATTEMPTS   Give up after N failed connects (default: never)");
    println!("    MARKET_HEARTBEAT_INTERVAL_SECS  Ping interval (default: 10)");
    println!("    MARKET_CONNECT_TIMEOUT_SECS     Connect timeout (default: 10)");
    println!("    MARKET_READ_IDLE_TIMEOUT_SECS   Reconnect after this much silence, 0 disables (default: 180)");
    println!("    RUST_LOG                        Logging level (default: info)");
    println!();
    println!("EXAMPLES:");
    println!("    market-feed candles fx_sgbpusd --interval 5m --rows 50");
    println!("    market-feed quote btcusdt");
    println!("    market-feed stream btcusdt");
}

async fn run_candles(symbol: &str, interval: &str, rows: u32) -> anyhow::Result<()> {
    let config = QueryConfig::from_env().context("Invalid query configuration")?;
    let client = QueryClient::new(&config)?;

    let candles = client
        .fetch_candles(symbol, interval, rows)
        .await
        .with_context(|| format!("Failed to fetch candles for {}", symbol))?;

    print!("{}", format::format_candles(symbol, interval, &candles));
    Ok(())
}

async fn run_quote(symbol: &str) -> anyhow::Result<()> {
    let config = QueryConfig::from_env().context("Invalid query configuration")?;
    let client = QueryClient::new(&config)?;

    let quote = client
        .fetch_quote(symbol)
        .await
        .with_context(|| format!("Failed to fetch quote for {}", symbol))?;

    print!("{}", format::format_quote(&quote));
    Ok(())
}

#[cfg(feature = "websocket")]
async fn run_stream(symbol: &str) -> anyhow::Result<()> {
    use market_feed::stream::{Subscription, Supervisor, Tick, WsConnector};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    let config = StreamConfig::from_env().context("Invalid streaming configuration")?;
    let subscription = Subscription::new(symbol)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<Tick>();

    let handle = Supervisor::new(WsConnector::new(), config, subscription, Arc::new(tx)).start();

    tracing::info!("Streaming {}, press Ctrl-C to stop", symbol);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down");
                break;
            }
            tick = rx.recv() => match tick {
                Some(tick) => println!("{}", format::format_tick(&tick)),
                None => break,
            },
            _ = handle.wait() => {
                anyhow::bail!("Stream supervisor gave up reconnecting");
            }
        }
    }

    handle.stop().await;
    Ok(())
}

#[cfg(not(feature = "websocket"))]
async fn run_stream(_symbol: &str) -> anyhow::Result<()> {
    let _ = StreamConfig::from_env()?;
    anyhow::bail!("Streaming requires the `websocket` feature")
}
