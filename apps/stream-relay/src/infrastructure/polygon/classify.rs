//! Message Classifier
//!
//! Pure mapping from one raw upstream frame to zero or one normalized
//! [`StreamMessage`]. No side effects, no I/O, deterministic; the unit
//! test anchor of the whole worker.
//!
//! Rules:
//! - `ev: "T"` with a symbol → trade `{price, size, timestamp}`
//! - `ev: "Q"` with a symbol → quote (best bid/ask as delivered)
//! - `ev: "A" | "AM"` with a symbol → bar `{open, high, low, close, volume, vwap, timestamp}`
//! - anything else, or a data frame missing its symbol or a required
//!   numeric field → `None` (dropped, never defaulted)

use serde_json::Value;

use crate::domain::streaming::{BarData, QuoteData, StreamMessage, StreamPayload, TradeData};

/// Classify one raw frame.
#[must_use]
pub fn classify(frame: &Value) -> Option<StreamMessage> {
    let ev = frame.get("ev")?.as_str()?;
    let sym = frame.get("sym")?.as_str()?;
    if sym.is_empty() {
        return None;
    }

    let payload = match ev {
        "T" => StreamPayload::Trade(TradeData {
            price: f64_field(frame, "p")?,
            size: u64_field(frame, "s")?,
            timestamp: i64_field(frame, "t")?,
        }),
        "Q" => StreamPayload::Quote(QuoteData {
            bid_price: f64_field(frame, "bp")?,
            bid_size: u64_field(frame, "bs")?,
            ask_price: f64_field(frame, "ap")?,
            ask_size: u64_field(frame, "as")?,
            timestamp: i64_field(frame, "t")?,
        }),
        "A" | "AM" => StreamPayload::Bar(BarData {
            open: f64_field(frame, "o")?,
            high: f64_field(frame, "h")?,
            low: f64_field(frame, "l")?,
            close: f64_field(frame, "c")?,
            volume: u64_field(frame, "v")?,
            vwap: f64_field(frame, "vw"),
            // Aggregates carry the window start in "s"; fall back to it
            // when the generic timestamp is absent.
            timestamp: i64_field(frame, "t").or_else(|| i64_field(frame, "s"))?,
        }),
        _ => return None,
    };

    Some(StreamMessage {
        symbol: sym.to_uppercase(),
        payload,
    })
}

fn f64_field(frame: &Value, key: &str) -> Option<f64> {
    frame.get(key)?.as_f64()
}

fn u64_field(frame: &Value, key: &str) -> Option<u64> {
    frame.get(key)?.as_u64()
}

fn i64_field(frame: &Value, key: &str) -> Option<i64> {
    frame.get(key)?.as_i64()
}
