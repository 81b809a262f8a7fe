//! Shared helpers for local HTML parsing

use scout_core::{Error, Result};
use scraper::{ElementRef, Selector};

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::message(format!("Invalid CSS selector '{}': {:?}", css, e)))
}

/// Whitespace-normalized text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_of_collapses_whitespace() {
        let doc = Html::parse_fragment("<p>  Hello\n   <b>big</b>   world </p>");
        let p = doc.select(&selector("p").unwrap()).next().unwrap();
        assert_eq!(text_of(p), "Hello big world");
    }

    #[test]
    fn test_invalid_selector_is_error() {
        assert!(selector("a[").is_err());
    }
}
