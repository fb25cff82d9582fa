use scraper::{ElementRef, Selector};

use crate::error::ScrapeError;

/// Compiles a CSS selector, reporting the parser's reason on failure.
pub fn parse_selector(css_selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css_selector).map_err(|why| ScrapeError::InvalidSelector {
        selector: css_selector.to_string(),
        reason: format!("{:?}", why),
    })
}

/// All text below the element, concatenated in document order.
pub fn text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

/// Trimmed text of the element.
pub fn trimmed_text(element: &ElementRef) -> String {
    text(element).trim().to_string()
}

/// Whether the element's text contains every one of `needles`.
///
/// This stands in for the `:-soup-contains(...)` pseudo class the site
/// selectors were first written with.
pub fn contains_all(element: &ElementRef, needles: &[&str]) -> bool {
    let content = text(element);
    needles.iter().all(|n| content.contains(n))
}

/// The next sibling that is an element, skipping text and comments.
pub fn next_element_sibling<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Every element sibling after this one, in document order (the `~` combinator).
pub fn following_element_siblings<'a>(element: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    element.next_siblings().filter_map(ElementRef::wrap).collect()
}

/// Descendants of `element` matching `css_selector`, in document order.
pub fn select_in<'a>(
    element: &ElementRef<'a>,
    css_selector: &str,
) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    let selector = parse_selector(css_selector)?;
    Ok(element.select(&selector).collect())
}

/// First descendant of `element` matching `css_selector` whose text contains `needle`.
pub fn find_containing<'a>(
    element: &ElementRef<'a>,
    css_selector: &str,
    needle: &str,
) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    Ok(select_in(element, css_selector)?
        .into_iter()
        .find(|e| contains_all(e, &[needle])))
}

/// The next element sibling, if it matches `css_selector`, as in `left + right`.
pub fn adjacent<'a>(
    element: &ElementRef<'a>,
    css_selector: &str,
) -> Result<Option<ElementRef<'a>>, ScrapeError> {
    let selector = parse_selector(css_selector)?;
    Ok(next_element_sibling(element).filter(|e| selector.matches(e)))
}

/// Class names of the element other than `sentinel`.
pub fn classes_without<'a>(element: &ElementRef<'a>, sentinel: &str) -> Vec<&'a str> {
    element
        .value()
        .classes()
        .filter(|c| *c != sentinel)
        .collect()
}
