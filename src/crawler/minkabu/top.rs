use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{th_to_td, Minkabu};
use crate::{
    crawler::{
        field::Field,
        webpage::{unknown_field, Document, FieldValue, Page, Webpage},
    },
    declare::{MarketSegment, Money, PerformanceWeather, SecurityCode},
    error::{Result, ScrapeError},
    util::{http::element, text},
};

lazy_static! {
    /// 市場区分ラベルの前に付く銘柄コードと空白
    static ref SEGMENT_NOISE_RE: Regex = Regex::new(r"[\d+\s]").unwrap();
}

type Extracted<T> = std::result::Result<T, ScrapeError>;

/// `https://minkabu.jp/stock/<code>`
pub struct Top {
    page: Page,
    security_code: SecurityCode,
    fields: Fields,
}

#[derive(Default)]
struct Fields {
    name: Field<String>,
    market_segment: Field<Option<MarketSegment>>,
    price: Field<Option<Money>>,
    business_category: Field<String>,
    business_description: Field<String>,
    related_themes: Field<Vec<String>>,
    previous_close_price: Field<Option<Money>>,
    open_price: Field<Option<Money>>,
    daily_highest_price: Field<Option<Money>>,
    daily_lowest_price: Field<Option<Money>>,
    dividend_yield: Field<Option<f64>>,
    share_unit: Field<Option<i64>>,
    adjusted_per: Field<Option<f64>>,
    psr: Field<Option<f64>>,
    pbr: Field<Option<f64>>,
    volume: Field<Option<i64>>,
    market_capitalization: Field<Option<Money>>,
    issued_shares: Field<Option<i64>>,
    shareholder_benefits: Field<Option<String>>,
    lowest_purchase_price: Field<Option<Money>>,
    performance_weather_rating: Field<Option<PerformanceWeather>>,
}

fn money_of(document: &Document<'_>, header: &str) -> Extracted<Option<Money>> {
    Ok(text::parse_money(&th_to_td(document, header)?))
}

fn float_of(document: &Document<'_>, header: &str) -> Extracted<Option<f64>> {
    Ok(text::parse_float(&th_to_td(document, header)?))
}

fn int_of(document: &Document<'_>, header: &str) -> Extracted<Option<i64>> {
    Ok(text::parse_int(&th_to_td(document, header)?))
}

impl Top {
    pub fn new(site: &Minkabu, security_code: &SecurityCode) -> Self {
        let path = format!("stock/{}", urlencoding::encode(security_code.as_str()));
        Top {
            page: Page::new(site, &path, &[]),
            security_code: security_code.clone(),
            fields: Fields::default(),
        }
    }

    /// 銘柄名
    pub async fn name(&self) -> Result<String> {
        self.page
            .evaluate(&self.fields.name, |d| {
                Ok(element::trimmed_text(&d.select_one("p.md_stockBoard_stockName")?))
            })
            .await
    }

    /// 市場区分. Markets other than the three TSE segments give `None`.
    pub async fn market_segment(&self) -> Result<Option<MarketSegment>> {
        self.page
            .evaluate(&self.fields.market_segment, |d| {
                let label = element::text(&d.select_one("div.stock_label")?);
                Ok(MarketSegment::from_label(
                    &SEGMENT_NOISE_RE.replace_all(&label, ""),
                ))
            })
            .await
    }

    /// 株価, from the `data-price` attribute the page hands to its trading widget.
    pub async fn price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.price, |d| {
                let widget = d.select_one("div#stock-for-securities-company")?;
                let amount = widget
                    .value()
                    .attr("data-price")
                    .ok_or_else(|| d.not_found("div#stock-for-securities-company[data-price]"))?;
                Ok(text::parse_money(amount))
            })
            .await
    }

    /// 業種
    pub async fn business_category(&self) -> Result<String> {
        self.page
            .evaluate(&self.fields.business_category, |d| {
                Ok(element::trimmed_text(&d.select_adjacent("span", &["業種"], "a")?))
            })
            .await
    }

    /// 事業内容, whitespace removed.
    pub async fn business_description(&self) -> Result<String> {
        self.page
            .evaluate(&self.fields.business_description, |d| {
                let description = d.select_adjacent("div", &["業種"], "div")?;
                Ok(text::remove_whitespace(&element::text(&description)))
            })
            .await
    }

    /// 関連テーマ, in page order.
    pub async fn related_themes(&self) -> Result<Vec<String>> {
        self.page
            .evaluate(&self.fields.related_themes, related_themes)
            .await
    }

    /// 前日終値
    pub async fn previous_close_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.previous_close_price, |d| money_of(d, "前日終値"))
            .await
    }

    /// 始値
    pub async fn open_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.open_price, |d| money_of(d, "始値"))
            .await
    }

    /// 高値
    pub async fn daily_highest_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.daily_highest_price, |d| money_of(d, "高値"))
            .await
    }

    /// 安値
    pub async fn daily_lowest_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.daily_lowest_price, |d| money_of(d, "安値"))
            .await
    }

    /// 配当利回り, in percent.
    pub async fn dividend_yield(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.dividend_yield, |d| float_of(d, "配当利回り"))
            .await
    }

    /// 単元株数
    pub async fn share_unit(&self) -> Result<Option<i64>> {
        self.page
            .evaluate(&self.fields.share_unit, |d| int_of(d, "単元株数"))
            .await
    }

    /// PER(調整後)
    pub async fn adjusted_per(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.adjusted_per, |d| float_of(d, "PER(調整後)"))
            .await
    }

    pub async fn psr(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.psr, |d| float_of(d, "PSR"))
            .await
    }

    pub async fn pbr(&self) -> Result<Option<f64>> {
        self.page
            .evaluate(&self.fields.pbr, |d| float_of(d, "PBR"))
            .await
    }

    /// 出来高, in shares.
    pub async fn volume(&self) -> Result<Option<i64>> {
        self.page
            .evaluate(&self.fields.volume, |d| int_of(d, "出来高"))
            .await
    }

    /// 時価総額
    pub async fn market_capitalization(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.market_capitalization, |d| money_of(d, "時価総額"))
            .await
    }

    /// 発行済株数
    pub async fn issued_shares(&self) -> Result<Option<i64>> {
        self.page
            .evaluate(&self.fields.issued_shares, |d| int_of(d, "発行済株数"))
            .await
    }

    /// 株主優待, as printed.
    pub async fn shareholder_benefits(&self) -> Result<Option<String>> {
        self.page
            .evaluate(&self.fields.shareholder_benefits, |d| {
                Ok(text::non_placeholder(&th_to_td(d, "株主優待")?))
            })
            .await
    }

    /// Purchase price of one share unit at the cheapest online broker (購入金額).
    pub async fn lowest_purchase_price(&self) -> Result<Option<Money>> {
        self.page
            .evaluate(&self.fields.lowest_purchase_price, |d| money_of(d, "購入金額"))
            .await
    }

    /// 業績評価
    pub async fn performance_weather_rating(&self) -> Result<Option<PerformanceWeather>> {
        self.page
            .evaluate(&self.fields.performance_weather_rating, |d| {
                let weather = d.select_adjacent("div", &["業績評価"], "div")?;
                Ok(PerformanceWeather::from_label(&element::trimmed_text(&weather)))
            })
            .await
    }
}

fn related_themes(document: &Document<'_>) -> Extracted<Vec<String>> {
    let heading = document.select_one_containing("ul > li", &["関連テーマ"])?;

    Ok(element::following_element_siblings(&heading)
        .iter()
        .filter(|e| e.value().name() == "li")
        .map(|li| text::remove_whitespace(&element::text(li)))
        .collect())
}

#[async_trait(?Send)]
impl Webpage for Top {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "market_segment",
        "price",
        "business_category",
        "business_description",
        "related_themes",
        "previous_close_price",
        "open_price",
        "daily_highest_price",
        "daily_lowest_price",
        "dividend_yield",
        "share_unit",
        "adjusted_per",
        "psr",
        "pbr",
        "volume",
        "market_capitalization",
        "issued_shares",
        "shareholder_benefits",
        "lowest_purchase_price",
        "performance_weather_rating",
    ];

    fn page(&self) -> &Page {
        &self.page
    }

    async fn field(&self, name: &str) -> Result<FieldValue> {
        match name {
            "name" => self.name().await.map(Into::into),
            "market_segment" => self.market_segment().await.map(Into::into),
            "price" => self.price().await.map(Into::into),
            "business_category" => self.business_category().await.map(Into::into),
            "business_description" => self.business_description().await.map(Into::into),
            "related_themes" => self.related_themes().await.map(Into::into),
            "previous_close_price" => self.previous_close_price().await.map(Into::into),
            "open_price" => self.open_price().await.map(Into::into),
            "daily_highest_price" => self.daily_highest_price().await.map(Into::into),
            "daily_lowest_price" => self.daily_lowest_price().await.map(Into::into),
            "dividend_yield" => self.dividend_yield().await.map(Into::into),
            "share_unit" => self.share_unit().await.map(Into::into),
            "adjusted_per" => self.adjusted_per().await.map(Into::into),
            "psr" => self.psr().await.map(Into::into),
            "pbr" => self.pbr().await.map(Into::into),
            "volume" => self.volume().await.map(Into::into),
            "market_capitalization" => self.market_capitalization().await.map(Into::into),
            "issued_shares" => self.issued_shares().await.map(Into::into),
            "shareholder_benefits" => self.shareholder_benefits().await.map(Into::into),
            "lowest_purchase_price" => self.lowest_purchase_price().await.map(Into::into),
            "performance_weather_rating" => {
                self.performance_weather_rating().await.map(Into::into)
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

    use rust_decimal_macros::dec;

    use super::*;
    use crate::crawler::testing::{self, FixtureFetcher, MINKABU};

    const URL_6758: &str = "https://minkabu.jp/stock/6758";
    const URL_7837: &str = "https://minkabu.jp/stock/7837";

    fn site() -> (Minkabu, Rc<FixtureFetcher>) {
        let fetcher = Rc::new(
            FixtureFetcher::new()
                .with(URL_6758, testing::minkabu::TOP_6758)
                .with(URL_7837, testing::minkabu::TOP_7837),
        );
        (Minkabu::with_fetcher(MINKABU, fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_properties_6758() {
        let (minkabu, fetcher) = site();
        let stock = minkabu.stock(6758u32);
        let top = stock.top();

        assert_eq!(top.name().await.unwrap(), "ソニーグループ");
        assert_eq!(top.market_segment().await.unwrap(), Some(MarketSegment::TsePrime));
        assert_eq!(top.price().await.unwrap(), Some(Money::jpy(dec!(12930.0))));
        assert_eq!(top.business_category().await.unwrap(), "電気機器");
        assert_eq!(
            top.business_description().await.unwrap(),
            "AV機器世界大手。映画、ゲーム、音楽、金融を展開。センサー等デバイス事業も拡大。"
        );
        assert_eq!(
            top.related_themes().await.unwrap(),
            vec![
                "電気機器",
                "国際優良株",
                "ブルーレイ",
                "プレイステーション",
                "CMOSセンサー",
                "ウェアラブル端末",
                "4K・8Kテレビ",
                "VR",
                "一眼レフカメラ",
                "AIスピーカー",
            ]
        );
        assert_eq!(top.previous_close_price().await.unwrap(), Some(Money::jpy(dec!(12645.0))));
        assert_eq!(top.open_price().await.unwrap(), Some(Money::jpy(dec!(12840.0))));
        assert_eq!(top.daily_highest_price().await.unwrap(), Some(Money::jpy(dec!(12980.0))));
        assert_eq!(top.daily_lowest_price().await.unwrap(), Some(Money::jpy(dec!(12765.0))));
        assert_eq!(top.dividend_yield().await.unwrap(), None);
        assert_eq!(top.share_unit().await.unwrap(), Some(100));
        assert_eq!(top.adjusted_per().await.unwrap(), Some(17.04));
        assert_eq!(top.psr().await.unwrap(), Some(1.41));
        assert_eq!(top.pbr().await.unwrap(), Some(2.44));
        assert_eq!(top.volume().await.unwrap(), Some(5_199_800));
        assert_eq!(
            top.market_capitalization().await.unwrap(),
            Some(Money::jpy(dec!(16305787000000)))
        );
        assert_eq!(top.issued_shares().await.unwrap(), Some(1_261_081_000));
        assert_eq!(
            top.shareholder_benefits().await.unwrap().as_deref(),
            Some("自社商品割引券")
        );
        assert_eq!(
            top.lowest_purchase_price().await.unwrap(),
            Some(Money::jpy(dec!(1293440)))
        );
        assert_eq!(
            top.performance_weather_rating().await.unwrap(),
            Some(PerformanceWeather::Cloudy)
        );

        assert_eq!(fetcher.hits(), 1);
    }

    #[tokio::test]
    async fn test_properties_7837() {
        let (minkabu, _) = site();
        let stock = minkabu.stock("7837");
        let top = stock.top();

        assert_eq!(top.name().await.unwrap(), "アールシーコア");
        assert_eq!(top.market_segment().await.unwrap(), Some(MarketSegment::TseStandard));
        assert_eq!(top.price().await.unwrap(), Some(Money::jpy(dec!(501))));
        assert_eq!(top.business_category().await.unwrap(), "その他製品");
        assert_eq!(
            top.business_description().await.unwrap(),
            "丸太組み工法のログハウスで首位。自然派の提案型住宅に強み。別荘運営も。"
        );
        assert_eq!(top.related_themes().await.unwrap(), vec!["建設", "建設資材"]);
        assert_eq!(top.previous_close_price().await.unwrap(), Some(Money::jpy(dec!(495))));
        assert_eq!(top.dividend_yield().await.unwrap(), Some(0.0));
        assert_eq!(top.adjusted_per().await.unwrap(), None);
        assert_eq!(top.psr().await.unwrap(), Some(0.16));
        assert_eq!(top.pbr().await.unwrap(), Some(2.57));
        assert_eq!(top.volume().await.unwrap(), Some(13_700));
        assert_eq!(
            top.market_capitalization().await.unwrap(),
            Some(Money::jpy(dec!(2272000000)))
        );
        assert_eq!(top.issued_shares().await.unwrap(), Some(4_536_000));
        assert_eq!(
            top.shareholder_benefits().await.unwrap().as_deref(),
            Some("ホテル宿泊割引券、オリジナルカレンダー")
        );
        assert_eq!(top.lowest_purchase_price().await.unwrap(), Some(Money::jpy(dec!(50188))));
        assert_eq!(
            top.performance_weather_rating().await.unwrap(),
            Some(PerformanceWeather::Sunny)
        );
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let (minkabu, _) = site();
        let stock = minkabu.stock(7837u32);
        let snapshot = stock.top().snapshot().await;

        let values: serde_json::Map<String, serde_json::Value> = snapshot
            .into_iter()
            .map(|(name, value)| (name.to_string(), serde_json::to_value(value.unwrap()).unwrap()))
            .collect();

        assert_eq!(values["market_segment"], "tse_standard");
        assert_eq!(values["performance_weather_rating"], "sunny");
        assert_eq!(values["adjusted_per"], serde_json::Value::Null);
        assert_eq!(values["related_themes"], serde_json::json!(["建設", "建設資材"]));
    }

    #[tokio::test]
    async fn test_unknown_market_and_weather() {
        let html = testing::minkabu::TOP_7837
            .replace("7837 東証スタンダード", "7837 名証メイン")
            .replace(">晴れ<", ">霧<");
        let fetcher = Rc::new(FixtureFetcher::new().with(URL_7837, &html));
        let stock = Minkabu::with_fetcher(MINKABU, fetcher).stock(7837u32);

        assert_eq!(stock.top().market_segment().await.unwrap(), None);
        assert_eq!(stock.top().performance_weather_rating().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_raise_element_not_found() {
        let fetcher = Rc::new(FixtureFetcher::new().with(URL_6758, testing::NO_BODY));
        let stock = Minkabu::with_fetcher(MINKABU, fetcher).stock(6758u32);
        let top = stock.top();

        for name in Top::FIELDS {
            let err = top.field(name).await.unwrap_err();
            assert!(err.is_element_not_found(), "{}: {:?}", name, err);
        }
    }
}
