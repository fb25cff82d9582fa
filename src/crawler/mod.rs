//! Page machinery shared by every site, and one module per site.
//!
//! A site hands out a `Stock` facade per security code. Each report of the
//! facade is a page type that fetches its document on first use and keeps
//! every field it computes.

/// 株予報
pub mod kabuyoho;
/// みんかぶ
pub mod minkabu;

pub mod field;
pub mod webpage;

#[cfg(test)]
pub(crate) mod testing;

pub use field::Field;
pub use kabuyoho::Kabuyoho;
pub use minkabu::Minkabu;
pub use webpage::{
    DividendRecord, Document, FieldValue, NewsRecord, Page, Webpage, Website,
};
