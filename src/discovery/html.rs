use super::{walk_pages, CandidateSource, CatalogQuery, Discovery, PageParse, Transport};
use crate::models::candidate::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static ASSET_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/asset/(\d+)").expect("valid regex"));
static STARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d(?:\.\d)?)\s*stars").expect("valid regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid regex"));
static OBSERVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"by\s+([A-Za-z0-9 .'-]+)").expect("valid regex"));

static ASSET_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/asset/']").expect("valid selector"));
static ASSET_NODES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-asset-id]").expect("valid selector"));

/// Catalog result page scraper, used when the structured search yields nothing.
pub struct HtmlCatalog<'a> {
    transport: &'a dyn Transport,
    url: String,
}

impl<'a> HtmlCatalog<'a> {
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

impl CandidateSource for HtmlCatalog<'_> {
    fn discover(&self, query: &CatalogQuery) -> Discovery {
        walk_pages(self.transport, &self.url, query, parse_page)
    }
}

/// Every asset link becomes a candidate, with whatever metadata its card text carries.
/// Bare `data-asset-id` nodes add identifiers only.
pub(crate) fn parse_page(body: &str) -> PageParse {
    let document = Html::parse_document(body);
    let mut out = Vec::new();

    for anchor in document.select(&ASSET_LINKS) {
        let href = anchor.value().attr("href").unwrap_or("");
        let Some(ml_id) = ASSET_ID_RE.captures(href).map(|c| c[1].to_string()) else {
            continue;
        };
        let card = anchor
            .parent()
            .and_then(ElementRef::wrap)
            .map(text_content)
            .unwrap_or_else(|| text_content(anchor));

        let rating = STARS_RE
            .captures(&card)
            .and_then(|c| c[1].parse::<f64>().ok());
        let observed_on = DATE_RE.captures(&card).map(|c| c[1].to_string());
        let observer = OBSERVER_RE
            .captures(&card)
            .map(|c| c[1].trim().to_string());

        out.push(
            Candidate::new(ml_id)
                .with_rating(rating)
                .with_observer(observer)
                .with_observed_on(observed_on)
                .with_href(Some(href)),
        );
    }

    for node in document.select(&ASSET_NODES) {
        let Some(id) = node.value().attr("data-asset-id").map(str::trim) else {
            continue;
        };
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
            out.push(Candidate::new(id));
        }
    }

    PageParse::Items(out)
}

fn text_content(elem: ElementRef<'_>) -> String {
    elem.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
