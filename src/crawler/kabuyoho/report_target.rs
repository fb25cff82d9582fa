use std::collections::BTreeMap;

use async_trait::async_trait;
use scraper::ElementRef;

use super::{term_to_description, Kabuyoho};
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, Document, FieldValue, Page, Webpage},
    },
    declare::{Money, SecurityCode},
    error::{Result, ScrapeError},
    util::{http::element, text},
};

type Extracted<T> = std::result::Result<T, ScrapeError>;

/// `https://kabuyoho.jp/sp/reportTarget?bcode=<code>`
///
/// 目標株価, アナリストのレーティング, 理論株価 and the 株価指標 table.
pub struct ReportTarget {
    page: Page,
    security_code: SecurityCode,
    fields: Fields,
}

#[derive(Default)]
struct Fields {
    price: Field<Option<Money>>,
    price_level_to_target: Field<Option<String>>,
    price_target: Field<Option<Money>>,
    price_target_ratio_to_previous_week: Field<Option<f64>>,
    price_target_ratio_to_current_price: Field<Option<f64>>,
    average_analyst_rating: Field<Option<f64>>,
    analyst_count: Field<i64>,
    analyst_rating_composition: Field<BTreeMap<u8, i64>>,
    per_based_theoretical_stock_price: Field<Option<Money>>,
    per_based_upside_target: Field<Option<Money>>,
    per_based_downside_target: Field<Option<Money>>,
    pbr_based_theoretical_stock_price: Field<Option<Money>>,
    pbr_based_upside_target: Field<Option<Money>>,
    pbr_based_downside_target: Field<Option<Money>>,
    actual_bps: Field<Option<Money>>,
    expected_eps: Field<Option<Money>>,
    analyst_expected_eps: Field<Option<Money>>,
    analyst_expected_per: Field<Option<f64>>,
}

/// 想定株価レンジの基準
#[derive(Debug, Clone, Copy)]
enum Basis {
    Per,
    Pbr,
}

impl Basis {
    fn label(&self) -> &'static str {
        match self {
            Basis::Per => "理論株価(PER基準)",
            Basis::Pbr => "理論株価(PBR基準)",
        }
    }
}

/// Row below the theoretical price of a basis.
#[derive(Debug, Clone, Copy)]
enum Range {
    Theoretical,
    Upside,
    Downside,
}

impl ReportTarget {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode) -> Self {
        ReportTarget {
            page: Page::new(
                site,
                &Kabuyoho::report_path("reportTarget"),
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

    /// 目標株価から見た株価, e.g. `割安`. The placeholder reads as `None`.
    pub async fn price_level_to_target(&self) -> Result<Option<String>> {
        self.page
            .evaluate(&self.fields.price_level_to_target, |d| {
                Ok(text::non_placeholder(&term_to_description(d, "目標株価から見た株価")?))
            })
            .await
    }

    /// 目標株価, the average of the analysts' targets.
    pub async fn price_target(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.price_target, |d| {
                Ok(text::parse_money(&average_target_cell(d, 1)?))
            })
            .await
    }

    /// 目標株価の対前週変化率, in percent.
    pub async fn price_target_ratio_to_previous_week(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.price_target_ratio_to_previous_week, |d| {
                Ok(text::parse_float(&average_target_cell(d, 2)?))
            })
            .await
    }

    /// 目標株価と現在の株価の乖離率, in percent.
    pub async fn price_target_ratio_to_current_price(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.price_target_ratio_to_current_price, |d| {
                Ok(text::parse_float(&average_target_cell(d, 3)?))
            })
            .await
    }

    /// レーティング(平均)
    pub async fn average_analyst_rating(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.average_analyst_rating, |d| {
                Ok(text::parse_float(&rating_summary(d, "平均")?))
            })
            .await
    }

    /// レーティング(人数). The placeholder counts as zero analysts.
    pub async fn analyst_count(&self) -> Result<i64> {
        self.page
            .evaluate(&self.fields.analyst_count, |d| {
                Ok(text::parse_int_or_zero(&rating_summary(d, "人数")?))
            })
            .await
    }

    /// Number of analysts per rating, from 1 (弱気) to 5 (強気).
    ///
    /// Ratings without a row on the page are left out of the map.
    pub async fn analyst_rating_composition(&self) -> Result<BTreeMap<u8, i64>> {
        self.page
            .evaluate(&self.fields.analyst_rating_composition, rating_composition)
            .await
    }

    /// 理論株価(PER基準)
    pub async fn per_based_theoretical_stock_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.per_based_theoretical_stock_price, |d| {
                price_range(d, Basis::Per, Range::Theoretical)
            })
            .await
    }

    /// 上値目途(PER基準)
    pub async fn per_based_upside_target(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.per_based_upside_target, |d| {
                price_range(d, Basis::Per, Range::Upside)
            })
            .await
    }

    /// 下値目途(PER基準)
    pub async fn per_based_downside_target(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.per_based_downside_target, |d| {
                price_range(d, Basis::Per, Range::Downside)
            })
            .await
    }

    /// 理論株価(PBR基準)
    pub async fn pbr_based_theoretical_stock_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.pbr_based_theoretical_stock_price, |d| {
                price_range(d, Basis::Pbr, Range::Theoretical)
            })
            .await
    }

    /// 上値目途(PBR基準)
    pub async fn pbr_based_upside_target(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.pbr_based_upside_target, |d| {
                price_range(d, Basis::Pbr, Range::Upside)
            })
            .await
    }

    /// 下値目途(PBR基準)
    pub async fn pbr_based_downside_target(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.pbr_based_downside_target, |d| {
                price_range(d, Basis::Pbr, Range::Downside)
            })
            .await
    }

    /// BPS(実績)
    pub async fn actual_bps(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.actual_bps, |d| {
                Ok(text::parse_money(&indicator(d, "BPS(実績)")?))
            })
            .await
    }

    /// EPS(予想)
    pub async fn expected_eps(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.expected_eps, |d| {
                Ok(text::parse_money(&indicator(d, "EPS(予想)")?))
            })
            .await
    }

    /// EPS forecast of the analysts for twelve months ahead (`EPS ※`).
    pub async fn analyst_expected_eps(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.analyst_expected_eps, |d| {
                Ok(text::parse_money(&indicator(d, "EPS ※")?))
            })
            .await
    }

    /// PER forecast of the analysts for twelve months ahead (`PER ※`).
    pub async fn analyst_expected_per(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.analyst_expected_per, |d| {
                Ok(text::parse_float(&indicator(d, "PER ※")?))
            })
            .await
    }
}

/// The `n`th cell (1 based) of the first body row under the header that has `平均`.
fn average_target_cell(document: &Document<'_>, n: usize) -> Extracted<String> {
    for thead in document.select("main thead")? {
        if element::find_containing(&thead, "tr > th", "平均")?.is_none() {
            continue;
        }

        for tbody in element::following_element_siblings(&thead) {
            if tbody.value().name() != "tbody" {
                continue;
            }
            let cell_selector = format!("tr > td:nth-of-type({})", n);
            if let Some(td) = element::select_in(&tbody, &cell_selector)?.into_iter().next() {
                return Ok(element::trimmed_text(&td));
            }
        }
    }

    Err(document.not_found(format!(
        "thead:has(th:contains(平均)) ~ tbody > tr > td:nth-of-type({})",
        n
    )))
}

/// The section headed by `h1` レーティング.
fn rating_section<'a>(document: &Document<'a>) -> Extracted<ElementRef<'a>> {
    for section in document.select("main section")? {
        if element::find_containing(&section, "h1", "レーティング")?.is_some() {
            return Ok(section);
        }
    }

    Err(document.not_found("main section:has(h1:contains(レーティング))"))
}

fn rating_summary(document: &Document<'_>, label: &str) -> Extracted<String> {
    let section = rating_section(document)?;
    for th in element::select_in(&section, "th")? {
        if !element::contains_all(&th, &[label]) {
            continue;
        }
        if let Some(td) = element::adjacent(&th, "td")? {
            return Ok(element::trimmed_text(&td));
        }
    }

    Err(document.not_found(format!(
        "main section:has(h1:contains(レーティング)) th:contains({}) + td",
        label
    )))
}

fn rating_composition(document: &Document<'_>) -> Extracted<BTreeMap<u8, i64>> {
    let board = document.select_adjacent("main h1", &["レーティング"], "div")?;
    let headers = element::select_in(&board, "tbody tr > th")?;

    let mut composition = BTreeMap::new();
    for rating in 1..=5u8 {
        let label = format!("({}点)", rating);
        let count = headers
            .iter()
            .filter(|th| element::contains_all(th, &[label.as_str()]))
            .find_map(|th| element::next_element_sibling(th).filter(|e| e.value().name() == "td"));

        if let Some(td) = count {
            composition.insert(rating, text::parse_int_or_zero(&element::text(&td)));
        }
    }

    Ok(composition)
}

fn has_header(row: &ElementRef<'_>, label: &str) -> Extracted<bool> {
    Ok(element::find_containing(row, "th", label)?.is_some())
}

/// Reads one amount of the 想定株価レンジ table. The row must exist; the amount
/// is the first `td > span` with `円` in it, absent while the site shows `--`.
fn price_range(document: &Document<'_>, basis: Basis, range: Range) -> Extracted<Option<Money>> {
    let table = document.select_adjacent("main h2", &["想定株価レンジ"], "table")?;
    let rows = element::select_in(&table, "tr")?;

    let mut start = None;
    for (i, row) in rows.iter().enumerate() {
        if has_header(row, basis.label())? {
            start = Some(i);
            break;
        }
    }
    let start = start.ok_or_else(|| {
        document.not_found(format!(
            "main h2:contains(想定株価レンジ) + table tr:has(th:contains({}))",
            basis.label()
        ))
    })?;

    let row = match range {
        Range::Theoretical => Some(rows[start]),
        Range::Upside | Range::Downside => {
            let label = match range {
                Range::Upside => "上値目途",
                _ => "下値目途",
            };
            let mut found = None;
            for row in &rows[start + 1..] {
                if has_header(row, label)? {
                    found = Some(*row);
                    break;
                }
            }
            found
        }
    };
    let row = row.ok_or_else(|| {
        document.not_found(format!(
            "main h2:contains(想定株価レンジ) + table tr:has(th:contains({})) ~ tr",
            basis.label()
        ))
    })?;

    let amount = element::select_in(&row, "td > span")?
        .into_iter()
        .find(|span| element::contains_all(span, &["円"]));

    Ok(amount.and_then(|span| text::parse_money(&element::text(&span))))
}

/// Value cell of the 株価指標 table.
fn indicator(document: &Document<'_>, label: &str) -> Extracted<String> {
    let table = document.select_adjacent("main h2", &["株価指標"], "table")?;
    for th in element::select_in(&table, "th")? {
        if !element::contains_all(&th, &[label]) {
            continue;
        }
        if let Some(td) = element::adjacent(&th, "td")? {
            return Ok(element::trimmed_text(&td));
        }
    }

    Err(document.not_found(format!(
        "main h2:contains(株価指標) + table th:contains({}) + td",
        label
    )))
}

#[async_trait(?Send)]
impl Webpage for ReportTarget {
    const FIELDS: &'static [&'static str] = &[
        "price",
        "price_level_to_target",
        "price_target",
        "price_target_ratio_to_previous_week",
        "price_target_ratio_to_current_price",
        "average_analyst_rating",
        "analyst_count",
        "analyst_rating_composition",
        "per_based_theoretical_stock_price",
        "per_based_upside_target",
        "per_based_downside_target",
        "pbr_based_theoretical_stock_price",
        "pbr_based_upside_target",
        "pbr_based_downside_target",
        "actual_bps",
        "expected_eps",
        "analyst_expected_eps",
        "analyst_expected_per",
    ];

    fn page(&self) -> &Page {
        &self.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "price" => self.price().await.map(Into::into),
            "price_level_to_target" => self.price_level_to_target().await.map(Into::into),
            "price_target" => self.price_target().await.map(Into::into),
            "price_target_ratio_to_previous_week" => self
                .price_target_ratio_to_previous_week()
                .await
                .map(Into::into),
            "price_target_ratio_to_current_price" => self
                .price_target_ratio_to_current_price()
                .await
                .map(Into::into),
            "average_analyst_rating" => self.average_analyst_rating().await.map(Into::into),
            "analyst_count" => self.analyst_count().await.map(Into::into),
            "analyst_rating_composition" => {
                self.analyst_rating_composition().await.map(Into::into)
            }
            "per_based_theoretical_stock_price" => self
                .per_based_theoretical_stock_price()
                .await
                .map(Into::into),
            "per_based_upside_target" => self.per_based_upside_target().await.map(Into::into),
            "per_based_downside_target" => self.per_based_downside_target().await.map(Into::into),
            "pbr_based_theoretical_stock_price" => self
                .pbr_based_theoretical_stock_price()
                .await
                .map(Into::into),
            "pbr_based_upside_target" => self.pbr_based_upside_target().await.map(Into::into),
            "pbr_based_downside_target" => self.pbr_based_downside_target().await.map(Into::into),
            "actual_bps" => self.actual_bps().await.map(Into::into),
            "expected_eps" => self.expected_eps().await.map(Into::into),
            "analyst_expected_eps" => self.analyst_expected_eps().await.map(Into::into),
            "analyst_expected_per" => self.analyst_expected_per().await.map(Into::into),
            _ => Err(unknown_field(name)),
        }
    }

    fn security_code(&self) -> &SecurityCode {
        &self.security_code
    }
}
