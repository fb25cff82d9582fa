use std::{collections::BTreeMap, rc::Rc};

use async_trait::async_trait;
use chrono::NaiveDate;
use concat_string::concat_string;
use once_cell::unsync::OnceCell;
use reqwest::Url;
use scraper::{ElementRef, Html};
use serde::Serialize;

use super::field::Field;
use crate::{
    declare::{MarketSegment, Money, PerformanceWeather, SecurityCode},
    error::{Result, ScrapeError},
    logging,
    util::http::{element, Fetch},
};

/// What a page needs to know about the site it belongs to.
pub trait Website {
    /// Scheme and host without a trailing slash, e.g. `https://kabuyoho.jp`.
    fn base_url(&self) -> &str;

    fn fetcher(&self) -> Rc<dyn Fetch>;

    /// Builds `<base>/<path>?k=v&...` with every value percent-encoded.
    fn url_for(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = concat_string!(self.base_url().trim_end_matches('/'), "/", path);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Resolves a link found on one of the site's pages against the site root.
    fn absolute_url(&self, href: &str) -> std::result::Result<String, ScrapeError> {
        let base = Url::parse(self.base_url())
            .map_err(|why| ScrapeError::unexpected("base url", format!("{} ({})", self.base_url(), why)))?;
        base.join(href)
            .map(String::from)
            .map_err(|_| ScrapeError::unexpected("link", href))
    }
}

/// One document at one URL, fetched and parsed on first use.
///
/// Constructing a page only computes its URL. The first query loads it, and
/// the parsed document is kept for the lifetime of the page. A failed fetch
/// leaves the page unloaded, so the next query tries again.
pub struct Page {
    fetcher: Rc<dyn Fetch>,
    url: String,
    document: OnceCell<Html>,
}

impl Page {
    pub fn new(site: &dyn Website, path: &str, query: &[(&str, &str)]) -> Self {
        Page {
            fetcher: site.fetcher(),
            url: site.url_for(path, query),
            document: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_loaded(&self) -> bool {
        self.document.get().is_some()
    }

    /// Fetches and parses the document unless that already happened.
    pub async fn ensure_loaded(&self) -> Result<Document<'_>> {
        if let Some(html) = self.document.get() {
            return Ok(Document::new(html, &self.url));
        }

        let text = match self.fetcher.get_text(&self.url).await {
            Ok(text) => text,
            Err(why) => {
                logging::error_file_async(format!("Failed to load {} because {:?}", self.url, why));
                return Err(why.into());
            }
        };

        logging::debug_file_async(format!("loaded {} ({} bytes)", self.url, text.len()));
        let html = self.document.get_or_init(|| Html::parse_document(&text));

        Ok(Document::new(html, &self.url))
    }

    /// Reads a typed field through its memo, loading the document first if needed.
    pub async fn evaluate<T, F>(&self, field: &Field<T>, compute: F) -> Result<T>
    where
        T: Clone,
        F: FnOnce(&Document<'_>) -> std::result::Result<T, ScrapeError>,
    {
        let document = self.ensure_loaded().await?;
        Ok(field.get_or_compute(|| compute(&document))?)
    }

    /// Every node matching `css_selector`. No match is an empty list, not an error.
    pub async fn select(&self, css_selector: &str) -> Result<Vec<ElementRef<'_>>> {
        Ok(self.ensure_loaded().await?.select(css_selector)?)
    }

    /// The first node matching `css_selector`, or `ElementNotFound`.
    pub async fn select_one(&self, css_selector: &str) -> Result<ElementRef<'_>> {
        Ok(self.ensure_loaded().await?.select_one(css_selector)?)
    }
}

/// A loaded document together with the URL it came from.
#[derive(Clone, Copy)]
pub struct Document<'a> {
    html: &'a Html,
    url: &'a str,
}

impl<'a> Document<'a> {
    pub fn new(html: &'a Html, url: &'a str) -> Self {
        Document { html, url }
    }

    pub fn url(&self) -> &'a str {
        self.url
    }

    pub fn not_found(&self, selector: impl Into<String>) -> ScrapeError {
        ScrapeError::not_found(selector, self.url)
    }

    pub fn select(&self, css_selector: &str) -> std::result::Result<Vec<ElementRef<'a>>, ScrapeError> {
        let selector = element::parse_selector(css_selector)?;
        Ok(self.html.select(&selector).collect())
    }

    pub fn select_one(&self, css_selector: &str) -> std::result::Result<ElementRef<'a>, ScrapeError> {
        let selector = element::parse_selector(css_selector)?;
        self.html
            .select(&selector)
            .next()
            .ok_or_else(|| self.not_found(css_selector))
    }

    /// First node matching `css_selector` whose text contains all `needles`.
    pub fn select_one_containing(
        &self,
        css_selector: &str,
        needles: &[&str],
    ) -> std::result::Result<ElementRef<'a>, ScrapeError> {
        self.select(css_selector)?
            .into_iter()
            .find(|e| element::contains_all(e, needles))
            .ok_or_else(|| self.not_found(format!("{}:contains({})", css_selector, needles.join(","))))
    }

    /// `left:contains(needles) + right`: scans every node matching `left` whose
    /// text contains all `needles`, in document order, and returns the first
    /// next sibling that matches `right`.
    pub fn select_adjacent(
        &self,
        left: &str,
        needles: &[&str],
        right: &str,
    ) -> std::result::Result<ElementRef<'a>, ScrapeError> {
        for candidate in self.select(left)? {
            if !element::contains_all(&candidate, needles) {
                continue;
            }
            if let Some(found) = element::adjacent(&candidate, right)? {
                return Ok(found);
            }
        }

        Err(self.not_found(format!(
            "{}:contains({}) + {}",
            left,
            needles.join(","),
            right
        )))
    }
}

/// One parsed row of a dividend history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendRecord {
    /// First day of the fiscal month the dividend belongs to.
    pub date: NaiveDate,
    /// 1株配当. Absent while the site shows the placeholder.
    pub dividend: Option<Money>,
}

/// One parsed row of a news listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsRecord {
    pub date: chrono::NaiveDateTime,
    pub title: String,
    pub category: String,
    /// The weather icon class, e.g. `wthr_clud`.
    pub weather: Option<String>,
    pub url: String,
}

/// Any typed field value, for callers that walk fields by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Absent,
    Money(Money),
    Float(f64),
    Integer(i64),
    Text(String),
    Texts(Vec<String>),
    Composition(BTreeMap<u8, i64>),
    Dividends(Vec<DividendRecord>),
    News(Vec<NewsRecord>),
    MarketSegment(MarketSegment),
    Weather(PerformanceWeather),
}

macro_rules! impl_from_for_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_field_value! {
    Money => Money,
    f64 => Float,
    i64 => Integer,
    String => Text,
    Vec<String> => Texts,
    BTreeMap<u8, i64> => Composition,
    Vec<DividendRecord> => Dividends,
    Vec<NewsRecord> => News,
    MarketSegment => MarketSegment,
    PerformanceWeather => Weather,
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Absent)
    }
}

/// A page type with a fixed, named set of typed fields.
#[async_trait(?Send)]
pub trait Webpage {
    /// Every field name the page type declares, in declaration order.
    ///
    /// Reading this never evaluates anything.
    const FIELDS: &'static [&'static str];

    fn page(&self) -> &Page;

    /// Evaluates one field by name. The value is memoized like the typed accessor.
    async fn field(&self, name: &str) -> Result<FieldValue>;

    fn security_code(&self) -> &SecurityCode;

    /// Evaluates every declared field, keeping failures per field.
    async fn snapshot(&self) -> Vec<(&'static str, Result<FieldValue>)> {
        let mut values = Vec::with_capacity(Self::FIELDS.len());
        for name in Self::FIELDS {
            values.push((*name, self.field(name).await));
        }
        values
    }
}

pub(crate) fn unknown_field(name: &str) -> crate::error::Error {
    ScrapeError::unexpected("field name", name).into()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::anyhow;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::crawler::testing::FixtureFetcher;

    struct TestSite {
        fetcher: Rc<FixtureFetcher>,
    }

    impl Website for TestSite {
        fn base_url(&self) -> &str {
            "https://kabuyoho.jp"
        }

        fn fetcher(&self) -> Rc<dyn Fetch> {
            self.fetcher.clone()
        }
    }

    const HTML: &str = r#"<main><ul><li>a</li><li>b</li></ul><p class="x">1</p></main>"#;

    #[test]
    fn test_url_for_encodes_values() {
        let site = TestSite {
            fetcher: Rc::new(FixtureFetcher::new()),
        };
        assert_eq!(
            site.url_for("sp/reportTop", &[("bcode", "6758")]),
            "https://kabuyoho.jp/sp/reportTop?bcode=6758"
        );
        assert_eq!(
            site.url_for("sp/reportNews", &[("bcode", "a b&c"), ("cat", "2")]),
            "https://kabuyoho.jp/sp/reportNews?bcode=a%20b%26c&cat=2"
        );
        assert_eq!(
            site.absolute_url("/sp/consNewsDetail?cat=1&bcode=6758").unwrap(),
            "https://kabuyoho.jp/sp/consNewsDetail?cat=1&bcode=6758"
        );
    }

    #[tokio::test]
    async fn test_page_loads_once() {
        let fetcher = Rc::new(FixtureFetcher::new().with("https://kabuyoho.jp/sp/x?bcode=1", HTML));
        let site = TestSite {
            fetcher: fetcher.clone(),
        };
        let page = Page::new(&site, "sp/x", &[("bcode", "1")]);

        assert!(!page.is_loaded());
        assert_eq!(fetcher.hits(), 0);

        assert_eq!(page.select("li").await.unwrap().len(), 2);
        assert_eq!(element::trimmed_text(&page.select_one("p.x").await.unwrap()), "1");
        assert!(page.select("table").await.unwrap().is_empty());
        assert!(page
            .select_one("table")
            .await
            .unwrap_err()
            .is_element_not_found());

        assert!(page.is_loaded());
        assert_eq!(fetcher.hits(), 1);
    }

    struct FlakyFetcher {
        calls: RefCell<u32>,
    }

    #[async_trait(?Send)]
    impl Fetch for FlakyFetcher {
        async fn get_text(&self, _url: &str) -> anyhow::Result<String> {
            *self.calls.borrow_mut() += 1;
            if *self.calls.borrow() == 1 {
                Err(anyhow!("connection reset"))
            } else {
                Ok(HTML.to_string())
            }
        }
    }

    struct FlakySite(Rc<FlakyFetcher>);

    impl Website for FlakySite {
        fn base_url(&self) -> &str {
            "https://minkabu.jp"
        }

        fn fetcher(&self) -> Rc<dyn Fetch> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let site = FlakySite(Rc::new(FlakyFetcher {
            calls: RefCell::new(0),
        }));
        let page = Page::new(&site, "stock/6758", &[]);

        let err = page.select_one("p.x").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Fetch(_)));
        assert!(!page.is_loaded());

        assert!(page.select_one("p.x").await.is_ok());
        assert_eq!(*site.0.calls.borrow(), 2);
    }

    #[test]
    fn test_field_value_from_option() {
        assert_eq!(FieldValue::from(None::<Money>), FieldValue::Absent);
        assert_eq!(
            FieldValue::from(Some(Money::jpy(dec!(485)))),
            FieldValue::Money(Money::jpy(dec!(485)))
        );
        assert_eq!(
            serde_json::to_string(&FieldValue::from(Some(MarketSegment::TsePrime))).unwrap(),
            r#""tse_prime""#
        );
        assert_eq!(serde_json::to_string(&FieldValue::Absent).unwrap(), "null");
    }
}
