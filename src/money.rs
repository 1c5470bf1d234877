//! Conversions between provider minor units and ledger amounts.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer};

use crate::error::{ReconcileError, ReconcileResult};

/// Provider amounts are integer cents; the ledger stores currency units.
pub fn cents_to_amount(cents: i64) -> BigDecimal {
    (BigDecimal::from(cents) / BigDecimal::from(100)).with_scale(2)
}

pub fn amount_to_cents(amount: &BigDecimal) -> ReconcileResult<i64> {
    if amount.with_scale(2) != *amount {
        return Err(ReconcileError::Validation(format!(
            "amount {amount} has more than two decimal places"
        )));
    }
    (amount.clone() * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .ok_or_else(|| ReconcileError::Validation(format!("amount {amount} is out of range")))
}

/// Accepts `25`, `25.5` or `"25.50"` without a round trip through binary floats.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match &value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a number or numeric string, got {other}"
            )));
        }
    };
    BigDecimal::from_str(&text).map_err(serde::de::Error::custom)
}
