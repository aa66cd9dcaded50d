use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MoneyObject {
    pub currency_code: String,
    pub value: String,
    pub value_in_base_units: i64,
}

impl MoneyObject {
    /// Parsed `value`. `None` if the service sent something that is not a
    /// decimal number.
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::from_str(&self.value).ok()
    }

    /// Render using the currency's narrow symbol, e.g. `AUD 1.00` as `$1.00`.
    pub fn format(&self) -> String {
        let exponent = minor_unit_exponent(&self.currency_code);
        let Some(amount) = self.amount() else {
            return format!("{} {}", self.currency_code, self.value);
        };
        let amount = amount.round_dp(exponent);
        let sign = if amount.is_sign_negative() && !amount.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = format!("{:.*}", exponent as usize, amount.abs());
        match narrow_symbol(&self.currency_code) {
            Some(symbol) => format!("{sign}{symbol}{digits}"),
            None => format!("{} {sign}{digits}", self.currency_code),
        }
    }
}

impl fmt::Display for MoneyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Number of decimal places in the currency's minor unit (ISO 4217).
pub fn minor_unit_exponent(currency_code: &str) -> u32 {
    match currency_code {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "PYG" | "UGX" | "XAF" | "XOF" => 0,
        "KWD" | "BHD" | "OMR" | "JOD" | "TND" | "LYD" | "IQD" => 3,
        _ => 2,
    }
}

fn narrow_symbol(currency_code: &str) -> Option<&'static str> {
    let symbol = match currency_code {
        "AUD" | "USD" | "CAD" | "NZD" | "HKD" | "SGD" | "MXN" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        "VND" => "₫",
        "PHP" => "₱",
        "THB" => "฿",
        "ILS" => "₪",
        "NGN" => "₦",
        "UAH" => "₴",
        _ => return None,
    };
    Some(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(code: &str, value: &str, base: i64) -> MoneyObject {
        MoneyObject {
            currency_code: code.to_string(),
            value: value.to_string(),
            value_in_base_units: base,
        }
    }

    #[test]
    fn formats_with_narrow_symbol() {
        assert_eq!(money("AUD", "1.00", 100).format(), "$1.00");
        assert_eq!(money("GBP", "-3.5", -350).format(), "-£3.50");
        assert_eq!(money("EUR", "10", 1000).to_string(), "€10.00");
    }

    #[test]
    fn respects_minor_unit_exponent() {
        assert_eq!(money("JPY", "1500", 1500).format(), "¥1500");
        assert_eq!(money("KWD", "1.5", 1500).format(), "KWD 1.500");
    }

    #[test]
    fn unknown_currency_falls_back_to_code() {
        assert_eq!(money("CHF", "-2.25", -225).format(), "CHF -2.25");
    }

    #[test]
    fn unparseable_value_is_shown_verbatim() {
        assert_eq!(money("AUD", "lots", 0).format(), "AUD lots");
    }

    #[test]
    fn base_units_are_not_validated() {
        let m = money("AUD", "1.00", 12345);
        assert_eq!(m.format(), "$1.00");
        assert_eq!(m.value_in_base_units, 12345);
    }
}
