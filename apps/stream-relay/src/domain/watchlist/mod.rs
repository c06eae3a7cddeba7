//! Symbol Watchlist
//!
//! The fixed set of ticker symbols the worker subscribes to. Parsed once
//! at startup from configuration and never mutated afterwards. Ordered,
//! de-duplicated, upper-cased.

/// Ordered set of unique, upper-cased ticker symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    /// Parse a comma-separated symbol list.
    ///
    /// Entries are trimmed and upper-cased; empties and duplicates are
    /// discarded. First occurrence wins for ordering.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut symbols: Vec<String> = Vec::new();
        for entry in raw.split(',') {
            let symbol = entry.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Self { symbols }
    }

    /// Build a watchlist from pre-validated symbols (test helper and
    /// programmatic construction).
    #[must_use]
    pub fn from_symbols(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let joined: Vec<String> = symbols.into_iter().map(Into::into).collect();
        Self::parse(&joined.join(","))
    }

    /// Whether the watchlist has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Tracked symbols in configuration order.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Iterate over tracked symbols.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.symbols.iter()
    }
}

impl<'a> IntoIterator for &'a Watchlist {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
