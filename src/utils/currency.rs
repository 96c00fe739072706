//! Currency helpers for BRL amounts.
//!
//! Prices are stored as NUMERIC reais; gateways take integer centavos
//! (1 real = 100 centavos).

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::ToPrimitive;

pub const CURRENCY: &str = "BRL";

/// Convert a reais amount to centavos, rounding half-up. `None` when the value
/// does not fit or is not positive.
pub fn reais_to_centavos(reais: &BigDecimal) -> Option<i64> {
    let centavos = (reais * &BigDecimal::from(100)).with_scale_round(0, RoundingMode::HalfUp);
    centavos.to_i64().filter(|c| *c > 0)
}

/// Format centavos as a reais string with 2 decimal places
pub fn format_centavos(centavos: i64) -> String {
    let sign = if centavos < 0 { "-" } else { "" };
    let abs = centavos.unsigned_abs();
    format!("{}R$ {}.{:02}", sign, abs / 100, abs % 100)
}

pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::try_from(value)
        .ok()
        .map(|d| d.with_scale_round(2, RoundingMode::HalfUp))
}
