use std::{cell::RefCell, collections::HashMap};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::util::http::Fetch;

pub const KABUYOHO: &str = "https://kabuyoho.jp";
pub const MINKABU: &str = "https://minkabu.jp";

/// An HTML document with no body content at all.
pub const NO_BODY: &str = include_str!("../../fixtures/no-body.html");

pub mod kabuyoho {
    pub const REPORT_TOP_6758: &str = include_str!("../../fixtures/kabuyoho/reportTop/6758.html");
    pub const REPORT_TOP_7837: &str = include_str!("../../fixtures/kabuyoho/reportTop/7837.html");
    pub const REPORT_TARGET_6758: &str = include_str!("../../fixtures/kabuyoho/reportTarget/6758.html");
    pub const REPORT_TARGET_7837: &str = include_str!("../../fixtures/kabuyoho/reportTarget/7837.html");
    pub const REPORT_DPS_6758: &str = include_str!("../../fixtures/kabuyoho/reportDps/6758.html");
    pub const REPORT_DPS_7837: &str = include_str!("../../fixtures/kabuyoho/reportDps/7837.html");
    pub const REPORT_TREND_SIGNAL_6758: &str =
        include_str!("../../fixtures/kabuyoho/reportTrendSignal/6758.html");
    pub const REPORT_TREND_SIGNAL_7837: &str =
        include_str!("../../fixtures/kabuyoho/reportTrendSignal/7837.html");
    pub const REPORT_NEWS_6758_PAGE1: &str = include_str!("../../fixtures/kabuyoho/reportNews/6758_1.html");
    pub const REPORT_NEWS_6758_PAGE2: &str = include_str!("../../fixtures/kabuyoho/reportNews/6758_2.html");
    pub const REPORT_NEWS_7837_EMPTY: &str = include_str!("../../fixtures/kabuyoho/reportNews/7837_empty.html");
}

pub mod minkabu {
    pub const TOP_6758: &str = include_str!("../../fixtures/minkabu/top/6758.html");
    pub const TOP_7837: &str = include_str!("../../fixtures/minkabu/top/7837.html");
}

/// Serves canned documents by exact URL and records every request.
#[derive(Default)]
pub struct FixtureFetcher {
    documents: HashMap<String, String>,
    requested: RefCell<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, html: &str) -> Self {
        self.documents.insert(url.to_string(), html.to_string());
        self
    }

    pub fn hits(&self) -> usize {
        self.requested.borrow().len()
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Fetch for FixtureFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.requested.borrow_mut().push(url.to_string());
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {}", url))
    }
}
