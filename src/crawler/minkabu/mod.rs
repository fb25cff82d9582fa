//! # みんかぶ (minkabu.jp)
//!
//! Only the stock top page, `https://minkabu.jp/stock/<security code>`, is read.

use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::{
    config::Settings,
    crawler::webpage::{Document, Website},
    declare::SecurityCode,
    error::{Result, ScrapeError},
    logging,
    util::http::{element, Fetch, HttpFetcher},
};

/// 個別銘柄のトップページ
pub mod top;

pub use top::Top;

/// Entry point for minkabu.jp.
#[derive(Clone)]
pub struct Minkabu {
    base_url: String,
    fetcher: Rc<dyn Fetch>,
}

impl Minkabu {
    /// Uses the default settings and a real HTTP client.
    pub fn new() -> Result<Self> {
        Self::from_settings(&Settings::default())
    }

    /// Also starts the file logger when `settings.log` enables it.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        logging::init(&settings.log);
        let fetcher = Rc::new(HttpFetcher::new(&settings.http)?);
        Ok(Self::with_fetcher(settings.sites.minkabu_url.clone(), fetcher))
    }

    pub fn with_fetcher(base_url: impl Into<String>, fetcher: Rc<dyn Fetch>) -> Self {
        Minkabu {
            base_url: base_url.into(),
            fetcher,
        }
    }

    pub fn stock(&self, security_code: impl Into<SecurityCode>) -> Stock {
        Stock {
            site: self.clone(),
            security_code: security_code.into(),
            top: OnceCell::new(),
        }
    }
}

impl Website for Minkabu {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetcher(&self) -> Rc<dyn Fetch> {
        self.fetcher.clone()
    }
}

/// One security code on minkabu.jp.
pub struct Stock {
    site: Minkabu,
    security_code: SecurityCode,
    top: OnceCell<Top>,
}

impl Stock {
    pub fn security_code(&self) -> &SecurityCode {
        &self.security_code
    }

    pub fn top(&self) -> &Top {
        self.top
            .get_or_init(|| Top::new(&self.site, &self.security_code))
    }
}

/// Text of the `td` next to the `th` that contains `header`, trimmed.
pub(crate) fn th_to_td(document: &Document<'_>, header: &str) -> std::result::Result<String, ScrapeError> {
    let td = document.select_adjacent("th", &[header], "td")?;
    Ok(element::trimmed_text(&td))
}
