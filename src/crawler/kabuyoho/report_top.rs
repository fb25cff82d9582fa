use async_trait::async_trait;

use super::{term_to_description, term_to_float, term_to_money, Kabuyoho};
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, Document, FieldValue, Page, Webpage},
    },
    declare::{Money, SecurityCode},
    error::{Result, ScrapeError},
    util::{http::element, text},
};

/// `https://kabuyoho.jp/sp/reportTop?bcode=<code>`
pub struct ReportTop {
    page: Page,
    security_code: SecurityCode,
    fields: Fields,
}

#[derive(Default)]
struct Fields {
    price: Field<Option<Money>>,
    expected_per: Field<Option<f64>>,
    actual_pbr: Field<Option<f64>>,
    expected_dividend_yield: Field<Option<f64>>,
    market_capitalization: Field<Option<Money>>,
    actual_roa: Field<Option<f64>>,
    actual_roe: Field<Option<f64>>,
    equity_ratio: Field<Option<f64>>,
    signal: Field<Option<String>>,
    expected_ordinary_profit: Field<Option<Money>>,
    consensus_expected_ordinary_profit: Field<Option<Money>>,
}

impl ReportTop {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode) -> Self {
        ReportTop {
            page: Page::new(
                site,
                &Kabuyoho::report_path("reportTop"),
                &[("bcode", security_code.as_str())],
            ),
            security_code: security_code.clone(),
            fields: Fields::default(),
        }
    }

    /// 株価
    pub async fn price(&self) -> Result<Option<Money>> {
        self.page.evaluate(&self.fields.price, super::price).await
    }

    /// PER(予)
    pub async fn expected_per(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.expected_per, |d| term_to_float(d, "PER(予)"))
            .await
    }

    /// PBR(実)
    pub async fn actual_pbr(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.actual_pbr, |d| term_to_float(d, "PBR(実)"))
            .await
    }

    /// 配当利回り(予), in percent.
    pub async fn expected_dividend_yield(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.expected_dividend_yield, |d| {
                term_to_float(d, "配当利回り(予)")
            })
            .await
    }

    /// 時価総額
    pub async fn market_capitalization(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.market_capitalization, |d| {
                term_to_money(d, "時価総額")
            })
            .await
    }

    /// ROA(実), in percent. The sign is not kept.
    pub async fn actual_roa(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.actual_roa, |d| term_to_float(d, "ROA(実)"))
            .await
    }

    /// ROE(実), in percent. The sign is not kept.
    pub async fn actual_roe(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.actual_roe, |d| term_to_float(d, "ROE(実)"))
            .await
    }

    /// 自己資本比率
    pub async fn equity_ratio(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.equity_ratio, |d| term_to_float(d, "自己資本比率"))
            .await
    }

    /// シグナル, with all whitespace removed.
    pub async fn signal(&self) -> Result<Option<String>> {
        self.page
            .evaluate(&self.fields.signal, |d| {
                let signal = text::remove_whitespace(&term_to_description(d, "シグナル")?);
                Ok(text::non_placeholder(&signal))
            })
            .await
    }

    /// 予想経常利益(予)
    pub async fn expected_ordinary_profit(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.expected_ordinary_profit, |d| {
                ordinary_profit(d, "予想経常利益(予)")
            })
            .await
    }

    /// 予想経常利益(コ), the analyst consensus.
    pub async fn consensus_expected_ordinary_profit(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.consensus_expected_ordinary_profit, |d| {
                ordinary_profit(d, "予想経常利益(コ)")
            })
            .await
    }
}

/// The first `p` of the description holds the amount followed by `円`, then
/// a change note that must not leak into the number.
fn ordinary_profit(
    document: &Document<'_>,
    term: &str,
) -> std::result::Result<Option<Money>, ScrapeError> {
    let dd = document.select_adjacent("main dt", &[term], "dd")?;
    let p = element::select_in(&dd, "p")?
        .into_iter()
        .next()
        .ok_or_else(|| document.not_found(format!("main dt:contains({}) + dd > p", term)))?;
    let content = element::text(&p);
    let amount = content.split('円').next().unwrap_or_default();
    Ok(text::parse_money(amount))
}

#[async_trait(?Send)]
impl Webpage for ReportTop {
    const FIELDS: &'static [&'static str] = &[
        "price",
        "expected_per",
        "actual_pbr",
        "expected_dividend_yield",
        "market_capitalization",
        "actual_roa",
        "actual_roe",
        "equity_ratio",
        "signal",
        "expected_ordinary_profit",
        "consensus_expected_ordinary_profit",
    ];

    fn page(&self) -> &Page {
        &self.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "price" => self.price().await.map(Into::into),
            "expected_per" => self.expected_per().await.map(Into::into),
            "actual_pbr" => self.actual_pbr().await.map(Into::into),
            "expected_dividend_yield" => self.expected_dividend_yield().await.map(Into::into),
            "market_capitalization" => self.market_capitalization().await.map(Into::into),
            "actual_roa" => self.actual_roa().await.map(Into::into),
            "actual_roe" => self.actual_roe().await.map(Into::into),
            "equity_ratio" => self.equity_ratio().await.map(Into::into),
            "signal" => self.signal().await.map(Into::into),
            "expected_ordinary_profit" => self.expected_ordinary_profit().await.map(Into::into),
            "consensus_expected_ordinary_profit" => self
                .consensus_expected_ordinary_profit()
                .await
                .map(Into::into),
            _ => Err(unknown_field(name)),
        }
    }

    fn security_code(&self) -> &SecurityCode {
        &self.security_code
    }
}
