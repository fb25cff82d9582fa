//! # 株予報 (kabuyoho.jp)
//!
//! Report pages of the smartphone site, one per report:
//!
//! - **`report_top`**: 株価, PER, PBR, 時価総額, シグナル and other summary figures.
//! - **`report_target`**: 目標株価, レーティング and the 想定株価レンジ.
//! - **`report_dps`**: 配当推移 and dividend ratios.
//! - **`report_trend_signal`**: トレンドシグナル and リスクオン相対指数.
//! - **`report_news`**: paginated news listings, per category.
//!
//! Every page lives at `https://kabuyoho.jp/sp/<report>?bcode=<security code>`.

use std::{rc::Rc, time::Duration};

use once_cell::unsync::OnceCell;

use crate::{
    config::Settings,
    crawler::webpage::{Document, Website},
    declare::{Money, SecurityCode},
    error::{Result, ScrapeError},
    logging,
    util::{
        http::{element, Fetch, HttpFetcher},
        text,
    },
};

/// 業績速報・マーケットなどのニュース一覧
pub mod report_news;
/// 配当
pub mod report_dps;
/// 目標株価・レーティング
pub mod report_target;
/// 株価・指標のサマリー
pub mod report_top;
/// トレンドシグナル
pub mod report_trend_signal;

pub use report_dps::ReportDps;
pub use report_news::{NewsListing, PageLimit, ReportNews};
pub use report_target::ReportTarget;
pub use report_top::ReportTop;
pub use report_trend_signal::ReportTrendSignal;

/// 株予報のスマホ版ページのパス
const SP: &str = "sp/";

/// Entry point for kabuyoho.jp.
///
/// Cheap to clone; clones share the same fetcher.
#[derive(Clone)]
pub struct Kabuyoho {
    base_url: String,
    fetcher: Rc<dyn Fetch>,
    page_delay: Duration,
}

impl Kabuyoho {
    /// Uses the default settings and a real HTTP client.
    pub fn new() -> Result<Self> {
        Self::from_settings(&Settings::default())
    }

    /// Also starts the file logger when `settings.log` enables it.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        logging::init(&settings.log);
        let fetcher = Rc::new(HttpFetcher::new(&settings.http)?);
        Ok(Self::with_fetcher(settings.sites.kabuyoho_url.clone(), fetcher)
            .with_page_delay(settings.news.page_delay()))
    }

    pub fn with_fetcher(base_url: impl Into<String>, fetcher: Rc<dyn Fetch>) -> Self {
        Kabuyoho {
            base_url: base_url.into(),
            fetcher,
            page_delay: Settings::default().news.page_delay(),
        }
    }

    /// Pause between page requests when a news listing walks several pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// Creates the facade for one security code. No request is made.
    pub fn stock(&self, security_code: impl Into<SecurityCode>) -> Stock {
        Stock::new(self.clone(), security_code.into())
    }

    pub(crate) fn report_path(report: &str) -> String {
        format!("{}{}", SP, report)
    }
}

impl Website for Kabuyoho {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetcher(&self) -> Rc<dyn Fetch> {
        self.fetcher.clone()
    }
}

/// One security code on kabuyoho.jp. Each report page is created on first use
/// and kept for the lifetime of the facade.
pub struct Stock {
    site: Kabuyoho,
    security_code: SecurityCode,
    report_top: OnceCell<ReportTop>,
    report_target: OnceCell<ReportTarget>,
    report_dps: OnceCell<ReportDps>,
    report_trend_signal: OnceCell<ReportTrendSignal>,
    report_news: OnceCell<ReportNews>,
}

impl Stock {
    fn new(site: Kabuyoho, security_code: SecurityCode) -> Self {
        Stock {
            site,
            security_code,
            report_top: OnceCell::new(),
            report_target: OnceCell::new(),
            report_dps: OnceCell::new(),
            report_trend_signal: OnceCell::new(),
            report_news: OnceCell::new(),
        }
    }

    pub fn security_code(&self) -> &SecurityCode {
        &self.security_code
    }

    pub fn report_top(&self) -> &ReportTop {
        self.report_top
            .get_or_init(|| ReportTop::new(&self.site, &self.security_code))
    }

    pub fn report_target(&self) -> &ReportTarget {
        self.report_target
            .get_or_init(|| ReportTarget::new(&self.site, &self.security_code))
    }

    pub fn report_dps(&self) -> &ReportDps {
        self.report_dps
            .get_or_init(|| ReportDps::new(&self.site, &self.security_code))
    }

    pub fn report_trend_signal(&self) -> &ReportTrendSignal {
        self.report_trend_signal
            .get_or_init(|| ReportTrendSignal::new(&self.site, &self.security_code))
    }

    pub fn report_news(&self) -> &ReportNews {
        self.report_news
            .get_or_init(|| ReportNews::new(&self.site, &self.security_code))
    }

    /// 株価, read from the top report.
    pub async fn price(&self) -> Result<Option<Money>> {
        self.report_top().price().await
    }

    /// 時価総額, read from the top report.
    pub async fn market_capitalization(&self) -> Result<Option<Money>> {
        self.report_top().market_capitalization().await
    }

    /// 理論株価(PER基準), read from the target report.
    pub async fn per_based_theoretical_stock_price(&self) -> Result<Option<Money>> {
        self.report_target().per_based_theoretical_stock_price().await
    }
}

/// The price shown next to the `株価(MM/DD HH:MM)` label, present on every report.
pub(crate) fn price(document: &Document<'_>) -> std::result::Result<Option<Money>, ScrapeError> {
    let value = document.select_adjacent("main li p", &["株価", "(", "/", ")"], "p")?;
    Ok(text::parse_money(&element::text(&value)))
}

/// The `dd` text following the `dt` that contains `term`.
pub(crate) fn term_to_description(
    document: &Document<'_>,
    term: &str,
) -> std::result::Result<String, ScrapeError> {
    let dd = document.select_adjacent("main dt", &[term], "dd")?;
    Ok(element::trimmed_text(&dd))
}

pub(crate) fn term_to_float(
    document: &Document<'_>,
    term: &str,
) -> std::result::Result<Option<f64>, ScrapeError> {
    Ok(text::parse_float(&term_to_description(document, term)?))
}

pub(crate) fn term_to_money(
    document: &Document<'_>,
    term: &str,
) -> std::result::Result<Option<Money>, ScrapeError> {
    Ok(text::parse_money(&term_to_description(document, term)?))
}
