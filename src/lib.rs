//! Typed figures of Japanese listed stocks, scraped from kabuyoho.jp and minkabu.jp.
//!
//! ```no_run
//! use kabu_crawler::crawler::Kabuyoho;
//!
//! # async fn run() -> kabu_crawler::error::Result<()> {
//! let kabuyoho = Kabuyoho::new()?;
//! let sony = kabuyoho.stock("6758");
//! println!("{:?}", sony.price().await?);
//! println!("{:?}", sony.report_target().price_target().await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod logging;
pub mod util;

pub use crate::{
    config::Settings,
    crawler::{kabuyoho::PageLimit, Kabuyoho, Minkabu, Webpage},
    declare::{Money, SecurityCode},
    error::{Error, Result, ScrapeError},
};
