//! Typed accessors for tool-call arguments. Failures are user-facing
//! messages returned to the model.

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::clock::parse_timestamp;
use crate::finance::Period;

pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, String> {
    match input.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(format!("O campo '{key}' é obrigatório."))
        }
        Some(_) => Err(format!("O campo '{key}' deve ser um texto.")),
    }
}

/// Missing or null strings are empty.
pub fn optional_str<'a>(input: &'a Value, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Numbers may arrive as JSON numbers or as strings, including the
/// Brazilian decimal comma (`"12,50"`).
pub fn required_amount(input: &Value, key: &str) -> Result<f64, String> {
    match input.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("O campo '{key}' deve ser um número.")),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| format!("O campo '{key}' deve ser um número.")),
        None | Some(Value::Null) => Err(format!("O campo '{key}' é obrigatório.")),
        Some(_) => Err(format!("O campo '{key}' deve ser um número.")),
    }
}

pub fn optional_timestamp(input: &Value, key: &str) -> Result<Option<NaiveDateTime>, String> {
    match input.get(key).and_then(Value::as_str).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| format!("Data inválida em '{key}': {raw}. Use o formato AAAA-MM-DD HH:MM.")),
    }
}

/// The look-back window, defaulting to monthly.
pub fn period(input: &Value, key: &str) -> Result<Period, String> {
    match input.get(key).and_then(Value::as_str).map(str::trim) {
        None | Some("") => Ok(Period::default()),
        Some(raw) => raw.parse().map_err(|e: crate::finance::InvalidPeriod| e.to_string()),
    }
}

pub fn optional_usize(input: &Value, key: &str, default: usize) -> usize {
    input
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_rejects_missing_and_blank() {
        let input = json!({"a": "x", "b": "  ", "c": 3});
        assert_eq!(required_str(&input, "a"), Ok("x"));
        assert!(required_str(&input, "b").unwrap_err().contains("obrigatório"));
        assert!(required_str(&input, "c").unwrap_err().contains("texto"));
        assert!(required_str(&input, "d").unwrap_err().contains("obrigatório"));
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        let input = json!({"n": 12.5, "s": "7,25", "bad": "doze", "i": 3});
        assert_eq!(required_amount(&input, "n"), Ok(12.5));
        assert_eq!(required_amount(&input, "s"), Ok(7.25));
        assert_eq!(required_amount(&input, "i"), Ok(3.0));
        assert!(required_amount(&input, "bad").is_err());
        assert!(required_amount(&input, "missing").is_err());
    }

    #[test]
    fn period_defaults_to_monthly() {
        assert_eq!(period(&json!({}), "period"), Ok(Period::Monthly));
        assert_eq!(period(&json!({"period": "semanal"}), "period"), Ok(Period::Weekly));
        assert!(period(&json!({"period": "anual"}), "period")
            .unwrap_err()
            .starts_with("Período inválido"));
    }

    #[test]
    fn timestamps_optional_but_validated() {
        assert_eq!(optional_timestamp(&json!({}), "date"), Ok(None));
        assert!(optional_timestamp(&json!({"date": "2024-05-01"}), "date")
            .unwrap()
            .is_some());
        assert!(optional_timestamp(&json!({"date": "ontem"}), "date").is_err());
    }
}
