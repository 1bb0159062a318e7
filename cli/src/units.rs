//! Whole-token amounts with up to 18 decimals

use anyhow::{bail, Context, Result};
use dao_core::{Amount, UNIT};

const DECIMALS: usize = 18;

/// Parses `"12"`, `"0.5"` or `"1_000.25"` into base units
pub fn parse_amount(input: &str) -> Result<Amount> {
    let cleaned = input.trim().replace('_', "");
    let (whole, frac) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("empty amount");
    }
    if frac.len() > DECIMALS {
        bail!("amount {input:?} has more than {DECIMALS} decimals");
    }
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if (!whole.is_empty() && !digits(whole)) || (!frac.is_empty() && !digits(frac)) {
        bail!("invalid amount {input:?}");
    }

    let whole: Amount = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .with_context(|| format!("amount {input:?} is too large"))?
    };
    let frac: Amount = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = DECIMALS).parse()?
    };
    whole
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac))
        .with_context(|| format!("amount {input:?} is too large"))
}

/// Renders base units as a decimal whole-token amount without trailing zeros
pub fn format_amount(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_amount("12").unwrap(), 12 * UNIT);
        assert_eq!(parse_amount("0.5").unwrap(), UNIT / 2);
        assert_eq!(parse_amount(".25").unwrap(), UNIT / 4);
        assert_eq!(parse_amount("1_000").unwrap(), 1_000 * UNIT);
        assert_eq!(parse_amount("0.000000000000000001").unwrap(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.2.3").is_err());
        assert!(parse_amount("0.0000000000000000001").is_err());
        assert!(parse_amount("999999999999999999999999999").is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(950 * UNIT), "950");
        assert_eq!(format_amount(UNIT + UNIT / 10), "1.1");
        assert_eq!(format_amount(1), "0.000000000000000001");
    }
}
