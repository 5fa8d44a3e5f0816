//! Candidate discovery against the remote media catalog.
//!
//! Each source walks result pages for one species query, merges the pages in order and
//! reports per-page problems as data. Duplicate identifiers across pages are left in
//! place; the sampler removes them.

pub mod cache;
pub mod html;
pub mod json;
pub mod transport;

pub use cache::CandidateCache;
pub use html::HtmlCatalog;
pub use json::JsonCatalog;
pub use transport::{Download, HttpTransport, Transport};

use crate::models::candidate::Candidate;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Catalog media kinds the tools can work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Photo,
    Audio,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Photo => "photo",
            MediaType::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "photos" | "image" => Ok(MediaType::Photo),
            "audio" | "sound" => Ok(MediaType::Audio),
            other => bail!("Unknown media type: {other}"),
        }
    }
}

/// One species query against the catalog.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub species: String,
    pub media_type: MediaType,
    /// Number of result pages to walk, starting at 1.
    pub pages: u32,
}

impl CatalogQuery {
    pub fn new(species: impl Into<String>, media_type: MediaType, pages: u32) -> Self {
        Self {
            species: species.into(),
            media_type,
            pages,
        }
    }

    pub(crate) fn page_params(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("mediaType", self.media_type.to_string()),
            ("q", self.species.clone()),
            ("sort", "rating_rank_desc".into()),
            ("page", page.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageIssueReason {
    /// Request failed or returned a non-success status; paging stopped here.
    Transport,
    /// Body could not be parsed; the page was skipped.
    Malformed,
}

/// Problem with a single catalog page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageIssue {
    pub page: u32,
    pub reason: PageIssueReason,
    pub message: String,
}

impl PageIssue {
    pub fn new(page: u32, reason: PageIssueReason, message: impl Into<String>) -> Self {
        Self {
            page,
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for PageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.reason {
            PageIssueReason::Transport => "request failed",
            PageIssueReason::Malformed => "unreadable",
        };
        write!(f, "page {} {}: {}", self.page, what, self.message)
    }
}

/// Merged result of walking the pages of one query.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub issues: Vec<PageIssue>,
    pub pages_fetched: u32,
}

impl Discovery {
    /// True when nothing was found and every attempted page failed.
    pub fn failed_outright(&self) -> bool {
        self.candidates.is_empty() && !self.issues.is_empty() && self.pages_fetched == 0
    }
}

/// Anything able to produce candidates for a species query.
pub trait CandidateSource {
    fn discover(&self, query: &CatalogQuery) -> Discovery;
}

/// Outcome of parsing one page body.
pub(crate) enum PageParse {
    Items(Vec<Candidate>),
    Malformed(String),
}

/// Shared paging loop: stop on transport errors or an empty page, skip malformed pages.
pub(crate) fn walk_pages<T, F>(
    transport: &T,
    url: &str,
    query: &CatalogQuery,
    parse: F,
) -> Discovery
where
    T: Transport + ?Sized,
    F: Fn(&str) -> PageParse,
{
    let mut discovery = Discovery::default();
    for page in 1..=query.pages {
        let body = match transport.get_text(url, &query.page_params(page)) {
            Ok(body) => body,
            Err(err) => {
                warn!(species = %query.species, page, error = %format!("{err:#}"), "catalog request failed");
                discovery.issues.push(PageIssue::new(
                    page,
                    PageIssueReason::Transport,
                    format!("{err:#}"),
                ));
                break;
            }
        };
        discovery.pages_fetched += 1;
        match parse(&body) {
            PageParse::Items(items) if items.is_empty() => {
                debug!(species = %query.species, page, "empty page, stopping");
                break;
            }
            PageParse::Items(items) => {
                debug!(species = %query.species, page, found = items.len(), "catalog page parsed");
                discovery.candidates.extend(items);
            }
            PageParse::Malformed(message) => {
                warn!(species = %query.species, page, reason = %message, "skipping unreadable catalog page");
                discovery
                    .issues
                    .push(PageIssue::new(page, PageIssueReason::Malformed, message));
            }
        }
    }
    discovery
}

/// Tries the primary source and falls back to the secondary when it finds nothing.
pub struct FallbackSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: CandidateSource, S: CandidateSource> CandidateSource for FallbackSource<P, S> {
    fn discover(&self, query: &CatalogQuery) -> Discovery {
        let first = self.primary.discover(query);
        if !first.candidates.is_empty() {
            return first;
        }
        debug!(species = %query.species, "primary source found nothing, trying fallback");
        let mut second = self.secondary.discover(query);
        let mut issues = first.issues;
        issues.append(&mut second.issues);
        second.issues = issues;
        second.pages_fetched += first.pages_fetched;
        second
    }
}

impl<T: CandidateSource + ?Sized> CandidateSource for Box<T> {
    fn discover(&self, query: &CatalogQuery) -> Discovery {
        (**self).discover(query)
    }
}
