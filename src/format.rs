// Markdown formatting for command-line output

use crate::query::{Candle, Quote};
use crate::stream::Tick;

/// Build a markdown table from headers and rows
pub fn build_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = String::new();

    // Header row
    table.push_str("| ");
    table.push_str(&headers.join(" | "));
    table.push_str(" |\n");

    // Separator row
    table.push('|');
    for _ in headers {
        table.push_str("--------|");
    }
    table.push('\n');

    for row in rows {
        table.push_str("| ");
        table.push_str(&row.join(" | "));
        table.push_str(" |\n");
    }

    table
}

/// Render candles as a table, one bar per row in the order given
pub fn format_candles(symbol: &str, interval: &str, candles: &[Candle]) -> String {
    let mut out = format!("## {} {} ({} bars)\n\n", symbol, interval, candles.len());
    if candles.is_empty() {
        out.push_str("_No data_\n");
        return out;
    }

    let rows: Vec<Vec<String>> = candles
        .iter()
        .map(|c| {
            let time = if c.datetime.is_empty() {
                c.opened_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| c.timestamp.to_string())
            } else {
                c.datetime.clone()
            };
            vec![
                time,
                format_number(c.open),
                format_number(c.high),
                format_number(c.low),
                format_number(c.close),
                format_number(c.volume),
            ]
        })
        .collect();

    out.push_str(&build_table(
        &["Time", "Open", "High", "Low", "Close", "Volume"],
        &rows,
    ));
    out
}

/// Render the commonly used quote fields; absent fields show as `-`
pub fn format_quote(quote: &Quote) -> String {
    let number = |name: &str| quote.number(name).map(format_number).unwrap_or_else(dash);
    let symbol = quote.symbol().unwrap_or_else(dash);
    let change = quote
        .number("DiffRate")
        .map(|r| format!("{:+.2}%", r))
        .unwrap_or_else(dash);

    let rows = vec![
        vec!["Price".to_string(), number("Price")],
        vec!["Change".to_string(), change],
        vec![
            "Bid".to_string(),
            format!("{} x {}", number("BP1"), number("BV1")),
        ],
        vec![
            "Ask".to_string(),
            format!("{} x {}", number("SP1"), number("SV1")),
        ],
        vec![
            "Time".to_string(),
            quote.text("Time").unwrap_or_else(dash),
        ],
    ];

    format!("## {}\n\n{}", symbol, build_table(&["Field", "Value"], &rows))
}

/// One-line tick summary
pub fn format_tick(tick: &Tick) -> String {
    format!(
        "{} {} {} ({:+.2}%) bid {} x {} ask {} x {} vol {} @ {}",
        tick.symbol,
        format_number(tick.price),
        format_number(tick.change),
        tick.change_rate,
        format_number(tick.bid_price),
        format_number(tick.bid_size),
        format_number(tick.ask_price),
        format_number(tick.ask_size),
        format_number(tick.volume),
        tick.time
    )
}

/// Up to 8 decimals with trailing zeros trimmed
pub fn format_number(value: f64) -> String {
    let formatted = format!("{:.8}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn dash() -> String {
    "-".to_string()
}
