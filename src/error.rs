use thiserror::Error;

/// Failures produced while reading values out of an already loaded document.
///
/// These are deterministic for a given document, which is why a typed field
/// keeps them in its memo and hands the same error back on every access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    /// A node the page layout requires is absent. The page is malformed or the
    /// site changed its layout.
    #[error("element `{selector}` not found in {url}")]
    ElementNotFound { selector: String, url: String },
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// The node exists but its text cannot be read as the expected type.
    #[error("unexpected {what}: '{text}'")]
    UnexpectedFormat { what: String, text: String },
}

impl ScrapeError {
    pub fn not_found(selector: impl Into<String>, url: impl Into<String>) -> Self {
        ScrapeError::ElementNotFound {
            selector: selector.into(),
            url: url.into(),
        }
    }

    pub fn unexpected(what: impl Into<String>, text: impl Into<String>) -> Self {
        ScrapeError::UnexpectedFormat {
            what: what.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    /// Transport failures are handed through from the HTTP layer untouched.
    #[error(transparent)]
    Fetch(#[from] anyhow::Error),
}

impl Error {
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, Error::Scrape(ScrapeError::ElementNotFound { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_is_element_not_found() {
        let e: Error = ScrapeError::not_found("main dt", "https://kabuyoho.jp/sp/reportTop").into();
        assert!(e.is_element_not_found());
        assert_eq!(
            e.to_string(),
            "element `main dt` not found in https://kabuyoho.jp/sp/reportTop"
        );

        let e: Error = ScrapeError::unexpected("date", "2023/13").into();
        assert!(!e.is_element_not_found());

        let e: Error = anyhow!("connection reset").into();
        assert!(!e.is_element_not_found());
        assert_eq!(e.to_string(), "connection reset");
    }
}
