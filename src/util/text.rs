use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::declare::Money;

/// 値が未定義のときにサイトが表示する文字列
pub const PLACEHOLDER: &str = "--";

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Multiplier of a Japanese numeral unit character.
fn unit_multiplier(c: char) -> Option<Decimal> {
    match c {
        '百' => Some(Decimal::ONE_HUNDRED),
        '千' => Some(Decimal::ONE_THOUSAND),
        '万' => Some(Decimal::from(10_000)),
        '億' => Some(Decimal::from(100_000_000)),
        '兆' => Some(Decimal::from(1_000_000_000_000i64)),
        _ => None,
    }
}

fn to_decimal(digits: &str) -> Option<Decimal> {
    Decimal::from_str(digits.trim_end_matches('.')).ok()
}

/// Parses Japanese monetary text into a JPY amount.
///
/// Digits (with an optional decimal point) form a number, unit characters
/// multiply the number before them and may compound (`百万`), and separate
/// segments add up (`1兆5,000億`). Every other character is ignored, so the
/// sign is not kept. Returns `None` when the text carries no digit at all,
/// which is how the `--` placeholder comes out, and also when the amount
/// does not fit in a [`Decimal`].
///
/// # Example
///
/// ```
/// use kabu_crawler::util::text::parse_money;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(parse_money("12万円").unwrap().amount, dec!(120000));
/// assert_eq!(parse_money("12.5万円").unwrap().amount, dec!(125000));
/// assert!(parse_money("--").is_none());
/// ```
pub fn parse_money(text: &str) -> Option<Money> {
    let mut total = Decimal::ZERO;
    let mut digits = String::new();
    let mut pending: Option<Decimal> = None;
    let mut seen_digit = false;

    for c in text.chars() {
        if c.is_ascii_digit() {
            // 単位の後に数字が来たら次の区切り
            if let Some(value) = pending.take() {
                total = total.checked_add(value)?;
            }
            digits.push(c);
            seen_digit = true;
        } else if c == '.' {
            if !digits.is_empty() && !digits.contains('.') {
                digits.push(c);
            }
        } else if let Some(multiplier) = unit_multiplier(c) {
            let base = if digits.is_empty() {
                pending.take()
            } else {
                let value = to_decimal(&digits)?;
                digits.clear();
                if let Some(value) = pending.take() {
                    total = total.checked_add(value)?;
                }
                Some(value)
            };
            if let Some(base) = base {
                pending = Some(base.checked_mul(multiplier)?);
            }
        }
    }

    if !seen_digit {
        return None;
    }

    if let Some(value) = pending {
        total = total.checked_add(value)?;
    }

    if !digits.is_empty() {
        total = total.checked_add(to_decimal(&digits)?)?;
    }

    Some(Money::jpy(total))
}

/// Keeps only ASCII digits and decimal points, then parses the rest.
///
/// A leading minus sign is dropped along with every other character, so
/// `-1.5%` reads as `1.5`. Use [`parse_signed_float`] where negative values
/// matter.
pub fn parse_float(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    f64::from_str(&cleaned).ok()
}

/// Like [`parse_float`] but a minus sign (ASCII or full width `－`, or `▲`)
/// placed before the first digit makes the value negative.
pub fn parse_signed_float(text: &str) -> Option<f64> {
    let value = parse_float(text)?;
    let negative = text
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .any(|c| matches!(c, '-' | '－' | '−' | '▲'));

    if negative {
        Some(-value)
    } else {
        Some(value)
    }
}

/// Keeps only ASCII digits and parses them. No digits gives `None`.
pub fn parse_int(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(char::is_ascii_digit).collect();

    if cleaned.is_empty() {
        return None;
    }

    i64::from_str(&cleaned).ok()
}

/// Same as [`parse_int`] but text without digits counts as zero.
pub fn parse_int_or_zero(text: &str) -> i64 {
    parse_int(text).unwrap_or(0)
}

pub fn remove_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, "").into_owned()
}

/// Whether the text is the site's "no value" marker once trimmed.
pub fn is_placeholder(text: &str) -> bool {
    text.trim() == PLACEHOLDER
}

/// Trimmed text, or `None` for the placeholder.
pub fn non_placeholder(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed == PLACEHOLDER {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_parse_money_units() {
        assert_eq!(parse_money("12万円"), Some(Money::jpy(dec!(120000))));
        assert_eq!(parse_money("3千円"), Some(Money::jpy(dec!(3000))));
        assert_eq!(parse_money("22億円"), Some(Money::jpy(dec!(2200000000))));
        assert_eq!(
            parse_money("158,455億円"),
            Some(Money::jpy(dec!(15845500000000)))
        );
        assert_eq!(
            parse_money("16,305,787百万円"),
            Some(Money::jpy(dec!(16305787000000)))
        );
        assert_eq!(
            parse_money("1兆2,000億円"),
            Some(Money::jpy(dec!(1200000000000)))
        );
    }

    #[test]
    fn test_parse_money_decimal() {
        assert_eq!(parse_money("12.5万円"), Some(Money::jpy(dec!(125000))));
        assert_eq!(parse_money("12930.0"), Some(Money::jpy(dec!(12930))));
        assert_eq!(parse_money("55.0円"), Some(Money::jpy(dec!(55))));
        assert_eq!(parse_money("1,293,440円"), Some(Money::jpy(dec!(1293440))));
        assert_eq!(parse_money("100円."), Some(Money::jpy(dec!(100))));
    }

    #[test]
    fn test_parse_money_absent() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("--"), None);
        assert_eq!(parse_money("--円"), None);
        assert_eq!(parse_money("万円"), None);
        assert_eq!(parse_money("0円"), Some(Money::jpy(Decimal::ZERO)));
    }

    #[test]
    fn test_parse_money_out_of_range() {
        // Decimal::MAX 万 は桁あふれ
        assert_eq!(parse_money("79228162514264337593543950335万"), None);
        assert_eq!(parse_money("1兆79228162514264337593543950335"), None);
        assert_eq!(parse_money("792281625142643375935439503350000円"), None);
        assert_eq!(
            parse_money("79228162514264337593543950335"),
            Some(Money::jpy(Decimal::MAX))
        );
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("4.75"), Some(4.75));
        assert_eq!(parse_float("18.0倍"), Some(18.0));
        assert_eq!(parse_float("0.6%"), Some(0.6));
        assert_eq!(parse_float("--"), None);
        assert_eq!(parse_float("--%"), None);
        assert_eq!(parse_float(""), None);
        // 符号は落ちる
        assert_eq!(parse_float("-1.5%"), Some(1.5));
    }

    #[test]
    fn test_parse_signed_float() {
        assert_eq!(parse_signed_float("-1.5%"), Some(-1.5));
        assert_eq!(parse_signed_float("▲0.25"), Some(-0.25));
        assert_eq!(parse_signed_float(" 0.05 "), Some(0.05));
        assert_eq!(parse_signed_float("2023-08"), Some(202308.0));
        assert_eq!(parse_signed_float("--"), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("1,261,081,000株"), Some(1_261_081_000));
        assert_eq!(parse_int("100株"), Some(100));
        assert_eq!(parse_int("--"), None);
        assert_eq!(parse_int_or_zero("--"), 0);
        assert_eq!(parse_int_or_zero("16人"), 16);
    }

    #[test]
    fn test_placeholder() {
        assert!(is_placeholder(" -- "));
        assert!(!is_placeholder("--円"));
        assert_eq!(non_placeholder(" 底値圏突入 "), Some("底値圏突入".to_string()));
        assert_eq!(non_placeholder("--"), None);
        assert_eq!(remove_whitespace(" 買い \n 転換 "), "買い転換");
    }
}
