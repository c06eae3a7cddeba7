//! Normalized Stream Messages
//!
//! The unit of work handed from the ingestion path to the publisher.
//! Every message carries an upper-cased, non-empty symbol and a
//! type-specific payload; unrecognized upstream frames never become a
//! `StreamMessage` (they are dropped upstream, not defaulted).
//!
//! # Published Wire Format (JSON)
//! ```json
//! {"type": "trade", "symbol": "SPY", "data": {"price": 450.1, "size": 100, "timestamp": 123}}
//! ```

use serde::{Deserialize, Serialize};

/// Trade payload: one executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    /// Execution price.
    pub price: f64,
    /// Trade size in shares.
    pub size: u64,
    /// Upstream timestamp (epoch milliseconds).
    pub timestamp: i64,
}

/// Quote payload: best bid/ask as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    /// Best bid price.
    pub bid_price: f64,
    /// Best bid size.
    pub bid_size: u64,
    /// Best ask price.
    pub ask_price: f64,
    /// Best ask size.
    pub ask_size: u64,
    /// Upstream timestamp (epoch milliseconds).
    pub timestamp: i64,
}

/// Bar payload: one OHLCV aggregate window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarData {
    /// Open price for the window.
    pub open: f64,
    /// High price for the window.
    pub high: f64,
    /// Low price for the window.
    pub low: f64,
    /// Close price for the window.
    pub close: f64,
    /// Volume for the window.
    pub volume: u64,
    /// Volume-weighted average price, when delivered.
    pub vwap: Option<f64>,
    /// Upstream timestamp (epoch milliseconds).
    pub timestamp: i64,
}

/// Type-discriminated payload of a [`StreamMessage`].
///
/// Serializes adjacently tagged so the broker-side shape is
/// `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamPayload {
    /// An executed trade.
    Trade(TradeData),
    /// A best bid/ask update.
    Quote(QuoteData),
    /// An aggregate bar.
    Bar(BarData),
}

impl StreamPayload {
    /// Stable kind label for logging and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trade(_) => "trade",
            Self::Quote(_) => "quote",
            Self::Bar(_) => "bar",
        }
    }
}

/// One normalized market data update.
///
/// Invariant: `symbol` is non-empty and upper-cased (enforced by the
/// classifier, the only producer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// Upper-cased ticker symbol.
    pub symbol: String,
    /// Type-specific payload.
    #[serde(flatten)]
    pub payload: StreamPayload,
}

impl StreamMessage {
    /// Stable kind label ("trade", "quote", "bar").
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Broker channel this message is addressed to.
    #[must_use]
    pub fn channel(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_wire_shape() {
        let msg = StreamMessage {
            symbol: "SPY".to_string(),
            payload: StreamPayload::Trade(TradeData {
                price: 450.1,
                size: 100,
                timestamp: 123,
            }),
        };

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "trade");
        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["data"]["price"], 450.1);
        assert_eq!(json["data"]["size"], 100);
        assert_eq!(json["data"]["timestamp"], 123);
    }

    #[test]
    fn bar_wire_shape() {
        let msg = StreamMessage {
            symbol: "AAPL".to_string(),
            payload: StreamPayload::Bar(BarData {
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 1000,
                vwap: Some(1.25),
                timestamp: 456,
            }),
        };

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "bar");
        assert_eq!(json["data"]["vwap"], 1.25);
        assert_eq!(json["data"]["volume"], 1000);
    }

    #[test]
    fn channel_is_per_symbol() {
        let msg = StreamMessage {
            symbol: "MSFT".to_string(),
            payload: StreamPayload::Trade(TradeData {
                price: 1.0,
                size: 1,
                timestamp: 0,
            }),
        };
        assert_eq!(msg.channel("marketdata"), "marketdata.MSFT");
    }

    #[test]
    fn kind_labels() {
        let trade = StreamPayload::Trade(TradeData {
            price: 0.0,
            size: 0,
            timestamp: 0,
        });
        assert_eq!(trade.kind(), "trade");

        let quote = StreamPayload::Quote(QuoteData {
            bid_price: 0.0,
            bid_size: 0,
            ask_price: 0.0,
            ask_size: 0,
            timestamp: 0,
        });
        assert_eq!(quote.kind(), "quote");
    }
}
