use std::{cell::RefCell, rc::Rc};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use once_cell::unsync::OnceCell;
use regex::Regex;
use scraper::ElementRef;

use super::Kabuyoho;
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, Document, FieldValue, NewsRecord, Page, Webpage, Website},
    },
    declare::{Money, NewsCategory, SecurityCode},
    error::{Result, ScrapeError},
    logging,
    util::http::element,
};

lazy_static! {
    static ref PAGE_RE: Regex = Regex::new(r"[?&]page=(\d+)").unwrap();
}

const NEWS_LIST: &str = "div.sp_news_list > ul";
/// 天気アイコンの共通クラス
const WEATHER_SENTINEL: &str = "wthr";

/// How many pages of a news listing to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// At most this many pages, capped by the pager. Zero reads as one.
    Pages(u32),
    /// Every page the pager offers.
    All,
}

impl Default for PageLimit {
    fn default() -> Self {
        PageLimit::Pages(1)
    }
}

/// One page of a listing and the records parsed from it.
struct ListingPage {
    page: Page,
    records: Field<Vec<NewsRecord>>,
}

impl ListingPage {
    fn new(page: Page) -> Self {
        ListingPage {
            page,
            records: Field::new(),
        }
    }

    async fn records(&self, site: &Kabuyoho) -> Result<Vec<NewsRecord>> {
        self.page
            .evaluate(&self.records, |d| news_records(d, site))
            .await
    }
}

/// `https://kabuyoho.jp/sp/reportNews?bcode=<code>[&cat=<n>][&page=<n>]`
///
/// The first page is loaded on first use like any other page. Later pages are
/// created when a fetch walks to them and kept, so walking again costs nothing.
pub struct NewsListing {
    site: Kabuyoho,
    security_code: SecurityCode,
    category: Option<NewsCategory>,
    first: ListingPage,
    following: RefCell<Vec<Rc<ListingPage>>>,
    last_page: Field<u32>,
    price: Field<Option<Money>>,
}

impl NewsListing {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode, category: Option<NewsCategory>) -> Self {
        NewsListing {
            site: site.clone(),
            security_code: security_code.clone(),
            category,
            first: ListingPage::new(Self::page_at(site, security_code, category, 1)),
            following: RefCell::new(Vec::new()),
            last_page: Field::new(),
            price: Field::new(),
        }
    }

    fn page_at(
        site: &Kabuyoho,
        security_code: &SecurityCode,
        category: Option<NewsCategory>,
        number: u32,
    ) -> Page {
        let category = category.map(|c| c.serial().to_string());
        let number = (number > 1).then(|| number.to_string());

        let mut query = vec![("bcode", security_code.as_str())];
        if let Some(category) = &category {
            query.push(("cat", category.as_str()));
        }
        if let Some(number) = &number {
            query.push(("page", number.as_str()));
        }

        Page::new(site, &Kabuyoho::report_path("reportNews"), &query)
    }

    /// URL of the first page.
    pub fn url(&self) -> &str {
        self.first.page.url()
    }

    pub fn category(&self) -> Option<NewsCategory> {
        self.category
    }

    pub async fn price(&self) -> Result<Option<Money>> {
        self.first.page.evaluate(&self.price, super::price).await
    }

    /// Records of the first page, in document order.
    pub async fn news(&self) -> Result<Vec<NewsRecord>> {
        self.first.records(&self.site).await
    }

    /// Highest page number the pager of the first page links to, 1 without a pager.
    pub async fn last_page(&self) -> Result<u32> {
        self.first.page.evaluate(&self.last_page, last_page).await
    }

    /// Walks the listing from page 1 and returns every record in page order.
    ///
    /// Pages after the first are requested one by one, each after the site's
    /// page delay. A page already walked by an earlier call is not requested again.
    pub async fn fetch(&self, limit: PageLimit) -> Result<Vec<NewsRecord>> {
        let mut news = self.news().await?;
        let last_page = self.last_page().await?;
        let until = match limit {
            PageLimit::All => last_page,
            PageLimit::Pages(pages) => pages.min(last_page),
        };

        for number in 2..=until {
            let listing_page = self.nth_page(number);
            if !listing_page.page.is_loaded() {
                let delay = self.site.page_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                logging::info_file_async(format!(
                    "walk {} ({}/{})",
                    listing_page.page.url(),
                    number,
                    until
                ));
            }

            news.extend(listing_page.records(&self.site).await?);
        }

        Ok(news)
    }

    /// Page `number` (2 or more), created on first request.
    fn nth_page(&self, number: u32) -> Rc<ListingPage> {
        let index = (number - 2) as usize;
        let mut following = self.following.borrow_mut();
        while following.len() <= index {
            let next = following.len() as u32 + 2;
            following.push(Rc::new(ListingPage::new(Self::page_at(
                &self.site,
                &self.security_code,
                self.category,
                next,
            ))));
        }

        following[index].clone()
    }

    /// Pages walked so far, the first one included once loaded.
    pub fn loaded_pages(&self) -> usize {
        let first = usize::from(self.first.page.is_loaded());
        first
            + self
                .following
                .borrow()
                .iter()
                .filter(|p| p.page.is_loaded())
                .count()
    }
}

fn last_page(document: &Document<'_>) -> std::result::Result<u32, ScrapeError> {
    let last = document
        .select("div.pager a")?
        .iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGE_RE.captures(href))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(1);

    Ok(last.max(1))
}

/// Every row of the list. A present but empty list is an empty result; a
/// missing list is `ElementNotFound`.
///
/// Rows are strict: one row without its time, title, category or link fails
/// the whole page with `ElementNotFound`.
fn news_records(
    document: &Document<'_>,
    site: &Kabuyoho,
) -> std::result::Result<Vec<NewsRecord>, ScrapeError> {
    let list = document.select_one(NEWS_LIST)?;

    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "li")
        .map(|row| news_record(document, site, &row))
        .collect()
}

fn news_record(
    document: &Document<'_>,
    site: &Kabuyoho,
    row: &ElementRef<'_>,
) -> std::result::Result<NewsRecord, ScrapeError> {
    let time = element::trimmed_text(&first_in(document, row, "span.time")?);
    let title = element::trimmed_text(&first_in(document, row, "p.list_title")?);
    let category = element::trimmed_text(&first_in(document, row, "span.ctgr")?);
    let href = first_in(document, row, "a")?
        .value()
        .attr("href")
        .map(str::to_string)
        .ok_or_else(|| document.not_found(format!("{} > li a[href]", NEWS_LIST)))?;

    let weather = element::select_in(row, "span.wthr")?
        .first()
        .and_then(|span| {
            element::classes_without(span, WEATHER_SENTINEL)
                .first()
                .map(|class| class.to_string())
        });

    Ok(NewsRecord {
        date: published_at(&time)?,
        title,
        category,
        weather,
        url: site.absolute_url(&href)?,
    })
}

fn first_in<'a>(
    document: &Document<'_>,
    row: &ElementRef<'a>,
    css: &str,
) -> std::result::Result<ElementRef<'a>, ScrapeError> {
    element::select_in(row, css)?
        .into_iter()
        .next()
        .ok_or_else(|| document.not_found(format!("{} > li {}", NEWS_LIST, css)))
}

/// `2023/08/09 15:01` and other separators alike.
fn published_at(label: &str) -> std::result::Result<NaiveDateTime, ScrapeError> {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M")
        .map_err(|_| ScrapeError::unexpected("news time", label))
}

/// `https://kabuyoho.jp/sp/reportNews?bcode=<code>`: all news of a stock, with
/// one listing per category on the side.
pub struct ReportNews {
    all: NewsListing,
    listings: [OnceCell<NewsListing>; 4],
}

impl ReportNews {
    pub fn new(site: &Kabuyoho, security_code: &SecurityCode) -> Self {
        ReportNews {
            all: NewsListing::new(site, security_code, None),
            listings: Default::default(),
        }
    }

    /// The listing of every category.
    pub fn all(&self) -> &NewsListing {
        &self.all
    }

    pub fn listing(&self, category: NewsCategory) -> &NewsListing {
        self.listings[category.index()].get_or_init(|| {
            NewsListing::new(&self.all.site, &self.all.security_code, Some(category))
        })
    }

    /// マーケット
    pub fn market_report(&self) -> &NewsListing {
        self.listing(NewsCategory::Market)
    }

    /// 業績速報
    pub fn flash_report(&self) -> &NewsListing {
        self.listing(NewsCategory::FlashReport)
    }

    pub async fn price(&self) -> Result<Option<Money>> {
        self.all.price().await
    }

    /// First page of every category.
    pub async fn news(&self) -> Result<Vec<NewsRecord>> {
        self.all.news().await
    }

    pub async fn fetch(&self, limit: PageLimit) -> Result<Vec<NewsRecord>> {
        self.all.fetch(limit).await
    }
}

#[async_trait(?Send)]
impl Webpage for ReportNews {
    const FIELDS: &'static [&'static str] = &["price", "news"];

    fn page(&self) -> &Page {
        &self.all.first.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "price" => self.price().await.map(Into::into),
            "news" => self.news().await.map(Into::into),
            _ => Err(unknown_field(name)),
        }
    }

    fn security_code(&self) -> &SecurityCode {
        &self.all.security_code
    }
}
