use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 通貨
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Currency {
    /// 日本円
    #[strum(serialize = "JPY")]
    #[serde(rename = "JPY")]
    Jpy,
}

/// An exact amount of money tagged with its currency.
///
/// Two values are equal when both the amount and the currency are equal.
/// Amounts compare numerically, so `12565` and `12565.0` are the same price.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Money { amount, currency }
    }

    pub fn jpy(amount: Decimal) -> Self {
        Money::new(amount, Currency::Jpy)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.currency)
    }
}

/// Exchange-assigned identifier of a listed company, e.g. `6758`.
///
/// Integers and strings are both accepted and kept as text. The value is not
/// validated; it is only percent-encoded when it is placed into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityCode(String);

impl SecurityCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SecurityCode {
    fn from(code: &str) -> Self {
        SecurityCode(code.to_string())
    }
}

impl From<String> for SecurityCode {
    fn from(code: String) -> Self {
        SecurityCode(code)
    }
}

impl From<&String> for SecurityCode {
    fn from(code: &String) -> Self {
        SecurityCode(code.clone())
    }
}

impl From<u32> for SecurityCode {
    fn from(code: u32) -> Self {
        SecurityCode(code.to_string())
    }
}

impl From<i32> for SecurityCode {
    fn from(code: i32) -> Self {
        SecurityCode(code.to_string())
    }
}

impl From<i64> for SecurityCode {
    fn from(code: i64) -> Self {
        SecurityCode(code.to_string())
    }
}

/// 市場区分
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarketSegment {
    /// 東証プライム
    TsePrime,
    /// 東証スタンダード
    TseStandard,
    /// 東証グロース
    TseGrowth,
}

impl MarketSegment {
    pub fn name(&self) -> &'static str {
        match self {
            MarketSegment::TsePrime => "東証プライム",
            MarketSegment::TseStandard => "東証スタンダード",
            MarketSegment::TseGrowth => "東証グロース",
        }
    }

    /// Maps the label printed on the page. Unknown labels have no segment.
    pub fn from_label(label: &str) -> Option<MarketSegment> {
        match label {
            "東証プライム" => Some(MarketSegment::TsePrime),
            "東証スタンダード" => Some(MarketSegment::TseStandard),
            "東証グロース" => Some(MarketSegment::TseGrowth),
            _ => None,
        }
    }
}

/// 業績評価
///
/// The site rates sales, ordinary profit and net profit together as a weather
/// forecast. The closer to sunny, the better the rating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PerformanceWeather {
    /// 晴れ
    Sunny,
    /// 曇り時々晴れ
    PartlySunny,
    /// 曇り
    Cloudy,
    /// 雨
    Rainy,
    /// 雷
    Thunderstorm,
}

impl PerformanceWeather {
    pub fn name(&self) -> &'static str {
        match self {
            PerformanceWeather::Sunny => "晴れ",
            PerformanceWeather::PartlySunny => "曇り時々晴れ",
            PerformanceWeather::Cloudy => "曇り",
            PerformanceWeather::Rainy => "雨",
            PerformanceWeather::Thunderstorm => "雷",
        }
    }

    pub fn from_label(label: &str) -> Option<PerformanceWeather> {
        match label {
            "晴れ" => Some(PerformanceWeather::Sunny),
            "曇り時々晴れ" => Some(PerformanceWeather::PartlySunny),
            "曇り" => Some(PerformanceWeather::Cloudy),
            "雨" => Some(PerformanceWeather::Rainy),
            "雷" => Some(PerformanceWeather::Thunderstorm),
            _ => None,
        }
    }
}

/// ニュースの分類 (the `cat` query parameter of the news listing)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NewsCategory {
    /// マーケット 1
    Market,
    /// 業績速報 2
    FlashReport,
    /// 適時開示 3
    Disclosure,
    /// レーティング 4
    Rating,
}

impl NewsCategory {
    pub fn serial(&self) -> u8 {
        match self {
            NewsCategory::Market => 1,
            NewsCategory::FlashReport => 2,
            NewsCategory::Disclosure => 3,
            NewsCategory::Rating => 4,
        }
    }

    pub fn from(serial: u8) -> Option<NewsCategory> {
        match serial {
            1 => Some(NewsCategory::Market),
            2 => Some(NewsCategory::FlashReport),
            3 => Some(NewsCategory::Disclosure),
            4 => Some(NewsCategory::Rating),
            _ => None,
        }
    }

    pub(crate) fn index(&self) -> usize {
        usize::from(self.serial() - 1)
    }
}
