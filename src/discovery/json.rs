use super::{walk_pages, CandidateSource, CatalogQuery, Discovery, PageParse, Transport};
use crate::models::candidate::Candidate;
use serde_json::Value;

/// Structured catalog search (`catalog.json`).
pub struct JsonCatalog<'a> {
    transport: &'a dyn Transport,
    url: String,
}

impl<'a> JsonCatalog<'a> {
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

impl CandidateSource for JsonCatalog<'_> {
    fn discover(&self, query: &CatalogQuery) -> Discovery {
        walk_pages(self.transport, &self.url, query, parse_page)
    }
}

pub(crate) fn parse_page(body: &str) -> PageParse {
    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(err) => return PageParse::Malformed(format!("invalid JSON: {err}")),
    };
    let items = match data.get("results").or_else(|| data.get("data")) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(_) => return PageParse::Malformed("result list is not an array".into()),
    };
    PageParse::Items(items.iter().filter_map(candidate_from_item).collect())
}

fn candidate_from_item(item: &Value) -> Option<Candidate> {
    let ml_id = first_text(item, &["assetId", "id"])?;
    let rating = item.get("rating").and_then(number);
    // Any integer rank counts, negative included.
    let rank = item.get("rank").and_then(Value::as_i64);
    Some(
        Candidate::new(ml_id)
            .with_rating(rating)
            .with_observer(first_text(item, &["userDisplayName", "user"]))
            .with_region(first_text(item, &["regionCode", "subnational1Code", "countryCode"]))
            .with_observed_on(first_text(item, &["observedOn", "date"]))
            .with_quality_rank(rank)
            .with_href(first_text(item, &["href", "assetPage"])),
    )
}

/// First of `keys` holding a non-blank string or a number, as text.
fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
