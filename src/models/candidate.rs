use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Observer bucket shared by every candidate without a known contributor.
pub const UNKNOWN_OBSERVER: &str = "_unknown_";

/// Media asset discovered in the catalog, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ml_id: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub observer: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub observed_on: Option<String>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub quality_rank: Option<i64>,
    #[serde(default)]
    pub href: Option<String>,
}

impl Candidate {
    /// Bare candidate carrying only an identifier.
    pub fn new(ml_id: impl Into<String>) -> Self {
        Self {
            ml_id: ml_id.into().trim().to_string(),
            rating: None,
            observer: None,
            region: None,
            observed_on: None,
            month: None,
            quality_rank: None,
            href: None,
        }
    }

    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.rating = rating.filter(|r| r.is_finite());
        self
    }

    pub fn with_observer(mut self, observer: Option<impl Into<String>>) -> Self {
        self.observer = non_blank(observer);
        self
    }

    pub fn with_region(mut self, region: Option<impl Into<String>>) -> Self {
        self.region = non_blank(region);
        self
    }

    /// Records the observation date and derives the month from it when parseable.
    pub fn with_observed_on(mut self, observed_on: Option<impl Into<String>>) -> Self {
        self.observed_on = non_blank(observed_on);
        self.month = self
            .observed_on
            .as_deref()
            .and_then(crate::sampling::month_from_date);
        self
    }

    pub fn with_month(mut self, month: Option<u32>) -> Self {
        self.month = month.filter(|m| (1..=12).contains(m));
        self
    }

    pub fn with_quality_rank(mut self, rank: Option<i64>) -> Self {
        self.quality_rank = rank;
        self
    }

    pub fn with_href(mut self, href: Option<impl Into<String>>) -> Self {
        self.href = non_blank(href);
        self
    }

    /// Key used for per-observer capping.
    pub fn observer_key(&self) -> &str {
        self.observer
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or(UNKNOWN_OBSERVER)
    }
}

fn non_blank(value: Option<impl Into<String>>) -> Option<String> {
    value
        .map(Into::into)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Knobs applied by the sampler to one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConstraints {
    /// Maximum number of picks.
    pub limit: usize,
    /// Candidates with a known rating below this are dropped.
    pub min_rating: f64,
    pub max_per_observer: usize,
    /// Allowed observation months (1-12). `None` or empty means any month.
    #[serde(default)]
    pub months: Option<BTreeSet<u32>>,
    /// Case-insensitive substring matched against the candidate region.
    #[serde(default)]
    pub region: Option<String>,
    /// Share of `limit` filled from the realistic pool instead of the top-rated one.
    pub low_quality_frac: f64,
}

impl SamplingConstraints {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            min_rating: 3.5,
            max_per_observer: 2,
            months: None,
            region: None,
            low_quality_frac: 0.3,
        }
    }

    /// Number of picks meant to come from the top-rated window.
    pub fn top_cut(&self) -> usize {
        let frac = self.low_quality_frac.clamp(0.0, 1.0);
        let wanted = (self.limit as f64 * (1.0 - frac)).round_ties_even();
        (wanted as usize).max(1)
    }

    pub fn admits(&self, candidate: &Candidate) -> bool {
        self.admits_rating(candidate) && self.admits_region(candidate) && self.admits_month(candidate)
    }

    fn admits_rating(&self, candidate: &Candidate) -> bool {
        candidate.rating.map_or(true, |r| r >= self.min_rating)
    }

    fn admits_region(&self, candidate: &Candidate) -> bool {
        let Some(wanted) = self.region.as_deref().filter(|r| !r.is_empty()) else {
            return true;
        };
        match candidate.region.as_deref().filter(|r| !r.is_empty()) {
            Some(region) => region.to_lowercase().contains(&wanted.to_lowercase()),
            None => true,
        }
    }

    fn admits_month(&self, candidate: &Candidate) -> bool {
        let Some(months) = self.months.as_ref().filter(|m| !m.is_empty()) else {
            return true;
        };
        candidate.month.map_or(true, |m| months.contains(&m))
    }
}
