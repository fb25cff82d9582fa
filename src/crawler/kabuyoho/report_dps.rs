use async_trait::async_trait;
use chrono::NaiveDate;

use super::{term_to_float, Kabuyoho};
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, DividendRecord, Document, FieldValue, Page, Webpage},
    },
    declare::{Money, SecurityCode},
    error::{Result, ScrapeError},
    util::{http::element, text},
};

/// `https://kabuyoho.jp/sp/reportDps?bcode=<code>`
pub struct ReportDps {
    page: Page,
    security_code: SecurityCode,
    price: Field<Option<Money>>,
    dividend_history: Field<Vec<DividendRecord>>,
    actual_dividend_yield: Field<Option<f64>>,
    expected_dividend_yield: Field<Option<f64>>,
    dividend_payout_ratio: Field<Option<f64>>,
}

impl ReportDps {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode) -> Self {
        ReportDps {
            page: Page::new(
                site,
                &Kabuyoho::report_path("reportDps"),
                &[("bcode", security_code.as_str())],
            ),
            security_code: security_code.clone(),
            price: Field::new(),
            dividend_history: Field::new(),
            actual_dividend_yield: Field::new(),
            expected_dividend_yield: Field::new(),
            dividend_payout_ratio: Field::new(),
        }
    }

    pub async fn price(&self) -> Result<Option<Money>> {
        self.page.evaluate(&self.price, super::price).await
    }

    /// 配当推移: dividend per share by fiscal month, oldest first as listed.
    pub async fn dividend_history(&self) -> Result<Vec<DividendRecord>> {
        self.page
            .evaluate(&self.dividend_history, dividend_history)
            .await
    }

    /// 配当利回り(実)
    pub async fn actual_dividend_yield(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.actual_dividend_yield, |d| term_to_float(d, "配当利回り(実)"))
            .await
    }

    /// 配当利回り(予)
    pub async fn expected_dividend_yield(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.expected_dividend_yield, |d| term_to_float(d, "配当利回り(予)"))
            .await
    }

    /// 配当性向
    pub async fn dividend_payout_ratio(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.dividend_payout_ratio, |d| term_to_float(d, "配当性向"))
            .await
    }
}

fn dividend_history(document: &Document<'_>) -> std::result::Result<Vec<DividendRecord>, ScrapeError> {
    let table = document.select_adjacent("main h2", &["配当推移"], "table")?;

    let mut history = Vec::new();
    for row in element::select_in(&table, "tbody > tr")? {
        let (Some(th), Some(td)) = (
            element::select_in(&row, "th")?.into_iter().next(),
            element::select_in(&row, "td")?.into_iter().next(),
        ) else {
            continue;
        };

        history.push(DividendRecord {
            date: fiscal_month(&element::trimmed_text(&th))?,
            dividend: text::parse_money(&element::text(&td)),
        });
    }

    Ok(history)
}

/// `2021/03` or `2024/03(予)` to the first day of that month.
fn fiscal_month(label: &str) -> std::result::Result<NaiveDate, ScrapeError> {
    let digits: String = label.chars().filter(char::is_ascii_digit).take(6).collect();
    NaiveDate::parse_from_str(&format!("{}01", digits), "%Y%m%d")
        .map_err(|_| ScrapeError::unexpected("fiscal month", label))
}

#[async_trait(?Send)]
impl Webpage for ReportDps {
    const FIELDS: &'static [&'static str] = &[
        "price",
        "dividend_history",
        "actual_dividend_yield",
        "expected_dividend_yield",
        "dividend_payout_ratio",
    ];

    fn page(&self) -> &Page {
        &self.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "price" => self.price().await.map(Into::into),
            "dividend_history" => self.dividend_history().await.map(Into::into),
            "actual_dividend_yield" => self.actual_dividend_yield().await.map(Into::into),
            "expected_dividend_yield" => self.expected_dividend_yield().await.map(Into::into),
            "dividend_payout_ratio" => self.dividend_payout_ratio().await.map(Into::into),
            _ => Err(unknown_field(name)),
        }
    }

    fn security_code(&self) -> &SecurityCode {
        &self.security_code
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::crawler::testing::{self, FixtureFetcher, KABUYOHO};

    const URL_6758: &str = "https://kabuyoho.jp/sp/reportDps?bcode=6758";
    const URL_7837: &str = "https://kabuyoho.jp/sp/reportDps?bcode=7837";

    fn site() -> Kabuyoho {
        let fetcher = Rc::new(
            FixtureFetcher::new()
                .with(URL_6758, testing::kabuyoho::REPORT_DPS_6758)
                .with(URL_7837, testing::kabuyoho::REPORT_DPS_7837),
        );
        Kabuyoho::with_fetcher(KABUYOHO, fetcher)
    }

    fn record(year: i32, dividend: Option<Money>) -> DividendRecord {
        DividendRecord {
            date: NaiveDate::from_ymd_opt(year, 3, 1).unwrap(),
            dividend,
        }
    }

    #[tokio::test]
    async fn test_properties_6758() {
        let stock = site().stock(6758u32);
        let page = stock.report_dps();

        assert_eq!(
            page.dividend_history().await.unwrap(),
            vec![
                record(2021, Some(Money::jpy(dec!(55.0)))),
                record(2022, Some(Money::jpy(dec!(65.0)))),
                record(2023, Some(Money::jpy(dec!(75.0)))),
                record(2024, None),
            ]
        );
        assert_eq!(page.actual_dividend_yield().await.unwrap(), Some(0.6));
        assert_eq!(page.expected_dividend_yield().await.unwrap(), None);
        assert_eq!(page.dividend_payout_ratio().await.unwrap(), Some(9.9));
    }

    #[tokio::test]
    async fn test_properties_7837() {
        let stock = site().stock(7837u32);
        let page = stock.report_dps();

        assert_eq!(page.price().await.unwrap(), Some(Money::jpy(dec!(485))));
        assert_eq!(
            page.dividend_history().await.unwrap(),
            vec![
                record(2021, Some(Money::jpy(dec!(20)))),
                record(2022, Some(Money::jpy(dec!(15)))),
                record(2023, Some(Money::jpy(dec!(0)))),
                record(2024, Some(Money::jpy(dec!(0)))),
            ]
        );
        assert_eq!(page.actual_dividend_yield().await.unwrap(), Some(0.0));
        assert_eq!(page.expected_dividend_yield().await.unwrap(), Some(0.0));
        assert_eq!(page.dividend_payout_ratio().await.unwrap(), Some(0.0));
    }

    #[test]
    fn test_fiscal_month() {
        assert_eq!(
            fiscal_month("2024/03(予)").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(
            fiscal_month("--"),
            Err(ScrapeError::UnexpectedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_raise_element_not_found() {
        let fetcher = Rc::new(FixtureFetcher::new().with(URL_6758, testing::NO_BODY));
        let stock = Kabuyoho::with_fetcher(KABUYOHO, fetcher).stock(6758u32);
        let page = stock.report_dps();

        for name in ReportDps::FIELDS {
            let err = page.field(name).await.unwrap_err();
            assert!(err.is_element_not_found(), "{}: {:?}", name, err);
        }
    }
}
