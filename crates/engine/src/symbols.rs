use common::{Error, MarketSet, Result};

/// Base assets some venues list under a different ticker.
const BASE_ALIASES: &[(&str, &str)] = &[
    ("BTC", "XBT"),
    ("XBT", "BTC"),
    ("DOGE", "XDG"),
    ("XDG", "DOGE"),
];

/// Quote assets some venues list under a different ticker.
const QUOTE_ALIASES: &[(&str, &str)] = &[
    ("USD", "ZUSD"),
    ("ZUSD", "USD"),
    ("EUR", "ZEUR"),
    ("ZEUR", "EUR"),
];

/// Uppercase and unify separators: `btc-usdt` → `BTC/USDT`.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .replace(|c: char| c == '-' || c == '_', "/")
}

fn alias(table: &'static [(&'static str, &'static str)], asset: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(from, _)| *from == asset)
        .map(|(_, to)| *to)
}

/// Map a user-supplied symbol onto one the exchange knows.
///
/// Candidates are tried in a fixed order and the first known market wins:
/// the normalized input, then the base alias, then the quote alias, then both
/// aliases together.
pub fn resolve(requested: &str, markets: &MarketSet) -> Result<String> {
    let symbol = normalize(requested);
    if markets.contains(&symbol) {
        return Ok(symbol);
    }

    if let Some((base, quote)) = symbol.split_once('/') {
        let base_alias = alias(BASE_ALIASES, base);
        let quote_alias = alias(QUOTE_ALIASES, quote);

        let candidates = [
            base_alias.map(|b| format!("{b}/{quote}")),
            quote_alias.map(|q| format!("{base}/{q}")),
            base_alias.zip(quote_alias).map(|(b, q)| format!("{b}/{q}")),
        ];

        if let Some(found) = candidates
            .into_iter()
            .flatten()
            .find(|c| markets.contains(c))
        {
            return Ok(found);
        }
    }

    Err(Error::SymbolNotFound(symbol))
}
