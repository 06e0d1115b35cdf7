use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Normalized market symbol/ticker.
///
/// Accepts exchange suffixes (`AZN.L`, `0293.HK`), pairs (`BTC-USD`),
/// index carets (`^GSPC`) and currency markers (`EURUSD=X`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trim and uppercase `input`, then check length and character set.
    ///
    /// Only the shape is checked here; whether the provider knows the
    /// instrument is decided when it is resolved.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong { len, max: MAX_SYMBOL_LEN });
        }

        if let Some((index, ch)) = normalized.chars().enumerate().find(|(_, ch)| !is_symbol_char(*ch)) {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

fn is_symbol_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn accepts_exchange_suffixes_and_numeric_codes() {
        for raw in ["0293.hk", "6758.T", "mc.Pa", "BTC-USD", "^GSPC", "EURUSD=X"] {
            assert!(Symbol::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn rejects_whitespace_inside_symbol() {
        let err = Symbol::parse("Lorem ipsum").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: ' ', .. }));
    }

    #[test]
    fn deserializing_normalizes_and_validates() {
        let symbol: Symbol = serde_json::from_str("\"tsla\"").expect("valid");
        assert_eq!(symbol, Symbol::parse("TSLA").expect("valid"));
        assert!(serde_json::from_str::<Symbol>("\"AA PL\"").is_err());
    }

    #[test]
    fn rejects_overlong_symbol() {
        let err = Symbol::parse("ABCDEFGHIJKLMNOPQ").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolTooLong { .. }));
    }
}
