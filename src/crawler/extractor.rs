//! Page extractor
//!
//! Turns listing pages into detail references and detail pages into records.
//! Markup that does not match degrades to `NOT_AVAILABLE`; nothing here fails
//! on page content.

use crate::config::SelectorConfig;
use crate::output::{Record, NOT_AVAILABLE};
use crate::units::WorkUnit;
use crate::HarvestError;
use scraper::{Html, Selector};
use url::Url;

/// A detail page link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailReference {
    pub url: Url,
    pub unit: WorkUnit,
}

/// Compiled selectors plus the site root used to resolve links
#[derive(Debug)]
pub struct Extractor {
    root: Url,
    listing_links: Selector,
    call_sign: Selector,
    name_original: Selector,
    name_english: Selector,
}

impl Extractor {
    /// Compiles the configured selectors
    ///
    /// # Arguments
    ///
    /// * `root` - Site root that relative detail links are joined to
    /// * `selectors` - CSS selectors for links and record fields
    ///
    /// # Returns
    ///
    /// * `Ok(Extractor)` - Every selector compiled
    /// * `Err(HarvestError::Selector)` - A selector is invalid
    pub fn new(root: Url, selectors: &SelectorConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            root,
            listing_links: compile(&selectors.listing_links)?,
            call_sign: compile(&selectors.call_sign)?,
            name_original: compile(&selectors.name_original)?,
            name_english: compile(&selectors.name_english)?,
        })
    }

    /// Extracts the detail links of a listing page
    ///
    /// Anchors without `href` and hrefs that cannot be resolved are skipped.
    /// A page with no matching anchor yields an empty list.
    ///
    /// # Example
    ///
    /// ```
    /// use callbook_harvest::config::SelectorConfig;
    /// use callbook_harvest::crawler::Extractor;
    /// use callbook_harvest::units::work_units;
    /// use url::Url;
    ///
    /// let root = Url::parse("https://www.qrz.com").unwrap();
    /// let extractor = Extractor::new(root, &SelectorConfig::default()).unwrap();
    /// let unit = work_units(2024).unwrap()[0];
    ///
    /// let html = r#"<table><tr><td><a href="/db/AA1AA">AA1AA</a></td></tr></table>"#;
    /// let refs = extractor.extract_listing(html, unit);
    /// assert_eq!(refs[0].url.as_str(), "https://www.qrz.com/db/AA1AA");
    /// ```
    pub fn extract_listing(&self, content: &str, unit: WorkUnit) -> Vec<DetailReference> {
        let document = Html::parse_document(content);

        document
            .select(&self.listing_links)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| {
                let href = href.trim();
                if href.is_empty() {
                    return None;
                }
                match self.root.join(href) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::debug!("Skipping link '{}' on {}: {}", href, unit, e);
                        None
                    }
                }
            })
            .map(|url| DetailReference { url, unit })
            .collect()
    }

    /// Extracts one record from a detail page
    ///
    /// Each field takes the first match of its selector with whitespace
    /// collapsed; no match (or only whitespace) gives `NOT_AVAILABLE`.
    pub fn extract_detail(&self, content: &str, unit: WorkUnit) -> Record {
        let document = Html::parse_document(content);

        Record::new(
            first_text(&document, &self.call_sign),
            first_text(&document, &self.name_original),
            first_text(&document, &self.name_english),
            &unit,
        )
    }
}

fn compile(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|element| {
            element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
