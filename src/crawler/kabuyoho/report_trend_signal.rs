use async_trait::async_trait;

use super::Kabuyoho;
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, Document, FieldValue, Page, Webpage},
    },
    declare::{Money, SecurityCode},
    error::{Result, ScrapeError},
    logging,
    util::{http::element, text},
};

/// Cells of the リスクオン相対指数 table: 一致指数, 先行指数 and 水準.
const RISK_ON_CELLS: usize = 3;

/// `https://kabuyoho.jp/sp/reportTrendSignal?bcode=<code>`
pub struct ReportTrendSignal {
    page: Page,
    security_code: SecurityCode,
    price: Field<Option<Money>>,
    trend_signal: Field<Option<String>>,
    coincident_index: Field<Option<f64>>,
    leading_index: Field<Option<f64>>,
    risk_on_relative_index_level: Field<Option<String>>,
}

impl ReportTrendSignal {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode) -> Self {
        ReportTrendSignal {
            page: Page::new(
                site,
                &Kabuyoho::report_path("reportTrendSignal"),
                &[("bcode", security_code.as_str())],
            ),
            security_code: security_code.clone(),
            price: Field::new(),
            trend_signal: Field::new(),
            coincident_index: Field::new(),
            leading_index: Field::new(),
            risk_on_relative_index_level: Field::new(),
        }
    }

    pub async fn price(&self) -> Result<Option<Money>> {
        self.page.evaluate(&self.price, super::price).await
    }

    /// 今日のトレンドシグナル, e.g. `買い継続`.
    pub async fn trend_signal(&self) -> Result<Option<String>> {
        self.page
            .evaluate(&self.trend_signal, |d| {
                let board = d.select_adjacent("main h2", &["トレンドシグナル"], "div")?;
                let cell = element::select_in(&board, "table td")?
                    .into_iter()
                    .next()
                    .ok_or_else(|| d.not_found("main h2:contains(トレンドシグナル) + div table td"))?;
                Ok(text::non_placeholder(&element::text(&cell)))
            })
            .await
    }

    /// 一致指数
    pub async fn coincident_index(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.coincident_index, |d| {
                Ok(text::parse_signed_float(&risk_on_cells(d)?[0]))
            })
            .await
    }

    /// 先行指数
    pub async fn leading_index(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.leading_index, |d| {
                Ok(text::parse_signed_float(&risk_on_cells(d)?[1]))
            })
            .await
    }

    /// リスクオン相対指数の水準, e.g. `底値圏突入`.
    pub async fn risk_on_relative_index_level(&self) -> Result<Option<String>> {
        self.page
            .evaluate(&self.risk_on_relative_index_level, |d| {
                Ok(text::non_placeholder(&risk_on_cells(d)?[2]))
            })
            .await
    }
}

/// The three cells must all be present; any other count means the layout changed.
fn risk_on_cells(document: &Document<'_>) -> std::result::Result<Vec<String>, ScrapeError> {
    let board = document.select_adjacent("main h2", &["リスクオン相対指数"], "div")?;
    let cells: Vec<String> = element::select_in(&board, "table tbody td")?
        .iter()
        .map(element::trimmed_text)
        .collect();

    if cells.len() != RISK_ON_CELLS {
        logging::warn_file_async(format!(
            "{} risk-on table has {} cells, expected {}",
            document.url(),
            cells.len(),
            RISK_ON_CELLS
        ));
        return Err(document.not_found("main h2:contains(リスクオン相対指数) + div table tbody td"));
    }

    Ok(cells)
}

#[async_trait(?Send)]
impl Webpage for ReportTrendSignal {
    const FIELDS: &'static [&'static str] = &[
        "price",
        "trend_signal",
        "coincident_index",
        "leading_index",
        "risk_on_relative_index_level",
    ];

    fn page(&self) -> &Page {
        &self.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "price" => self.price().await.map(Into::into),
            "trend_signal" => self.trend_signal().await.map(Into::into),
            "coincident_index" => self.coincident_index().await.map(Into::into),
            "leading_index" => self.leading_index().await.map(Into::into),
            "risk_on_relative_index_level" => {
                self.risk_on_relative_index_level().await.map(Into::into)
            }
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

    use super::*;
    use crate::crawler::testing::{self, FixtureFetcher, KABUYOHO};

    const URL_6758: &str = "https://kabuyoho.jp/sp/reportTrendSignal?bcode=6758";
    const URL_7837: &str = "https://kabuyoho.jp/sp/reportTrendSignal?bcode=7837";

    fn site() -> Kabuyoho {
        let fetcher = Rc::new(
            FixtureFetcher::new()
                .with(URL_6758, testing::kabuyoho::REPORT_TREND_SIGNAL_6758)
                .with(URL_7837, testing::kabuyoho::REPORT_TREND_SIGNAL_7837),
        );
        Kabuyoho::with_fetcher(KABUYOHO, fetcher)
    }

    #[tokio::test]
    async fn test_properties() {
        let kabuyoho = site();

        let stock = kabuyoho.stock(6758u32);
        let page = stock.report_trend_signal();
        assert_eq!(page.trend_signal().await.unwrap().as_deref(), Some("買い継続"));
        assert_eq!(page.coincident_index().await.unwrap(), Some(0.05));
        assert_eq!(page.leading_index().await.unwrap(), Some(0.08));
        assert_eq!(
            page.risk_on_relative_index_level().await.unwrap().as_deref(),
            Some("底値圏突入")
        );

        let stock = kabuyoho.stock(7837u32);
        let page = stock.report_trend_signal();
        assert_eq!(page.trend_signal().await.unwrap().as_deref(), Some("ニュートラル"));
        assert_eq!(page.coincident_index().await.unwrap(), Some(0.75));
        assert_eq!(page.leading_index().await.unwrap(), Some(0.74));
        assert_eq!(page.risk_on_relative_index_level().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incomplete_risk_on_table() {
        let html = testing::kabuyoho::REPORT_TREND_SIGNAL_6758.replace("<td>底値圏突入</td>", "");
        let fetcher = Rc::new(FixtureFetcher::new().with(URL_6758, &html));
        let stock = Kabuyoho::with_fetcher(KABUYOHO, fetcher).stock(6758u32);
        let page = stock.report_trend_signal();

        assert!(page.coincident_index().await.unwrap_err().is_element_not_found());
        assert!(page.leading_index().await.unwrap_err().is_element_not_found());
        // トレンドシグナル側は影響を受けない
        assert_eq!(page.trend_signal().await.unwrap().as_deref(), Some("買い継続"));
    }

    #[tokio::test]
    async fn test_raise_element_not_found() {
        let fetcher = Rc::new(FixtureFetcher::new().with(URL_6758, testing::NO_BODY));
        let stock = Kabuyoho::with_fetcher(KABUYOHO, fetcher).stock(6758u32);
        let page = stock.report_trend_signal();

        for name in ReportTrendSignal::FIELDS {
            let err = page.field(name).await.unwrap_err();
            assert!(err.is_element_not_found(), "{}: {:?}", name, err);
        }
    }
}
