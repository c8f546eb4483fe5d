use serde::{Deserialize, Serialize};

/// Number of fractional units in one whole coin.
pub const FRAC_UNIT: u64 = 1_000_000_000;

/// An amount of a single currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Whole units.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub whole: i64,
    /// Fractional units, `0..FRAC_UNIT`.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub fractional: i64,
    /// Currency ticker.
    #[serde(default)]
    pub ticker: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Coin {
    /// Creates a coin.
    pub fn new(whole: i64, fractional: i64, ticker: impl Into<String>) -> Self {
        Self { whole, fractional, ticker: ticker.into() }
    }

    /// The whole amount expressed in fractional units.
    ///
    /// Returns `None` for negative parts or if the value does not fit into a `u64`.
    pub fn fractional_amount(&self) -> Option<u64> {
        let whole = u64::try_from(self.whole).ok()?;
        let fractional = u64::try_from(self.fractional).ok()?;
        whole.checked_mul(FRAC_UNIT)?.checked_add(fractional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_amount() {
        assert_eq!(Coin::new(2, 5, "IOV").fractional_amount(), Some(2 * FRAC_UNIT + 5));
        assert_eq!(Coin::new(0, 0, "IOV").fractional_amount(), Some(0));
        assert_eq!(Coin::new(-1, 0, "IOV").fractional_amount(), None);
        assert_eq!(Coin::new(i64::MAX, 0, "IOV").fractional_amount(), None);
    }

    #[test]
    fn deserialize_sparse() {
        let coin: Coin = serde_json::from_str(r#"{"whole":1,"ticker":"IOV"}"#).unwrap();
        assert_eq!(coin, Coin::new(1, 0, "IOV"));
    }
}
