use crate::config::SamplingDefaults;
use crate::models::candidate::SamplingConstraints;
use crate::sampling::parse_months_field;
use crate::tabular::Record;
use anyhow::{Context, Result};
use std::collections::BTreeSet;

pub const REQUIRED_SPEC_COLUMNS: &[&str] = &["Species", "Limit"];

/// One row of the fetch-spec CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSpec {
    pub species: String,
    pub limit: usize,
    pub tags: String,
    pub region: Option<String>,
    pub months: Option<BTreeSet<u32>>,
    pub min_rating: Option<f64>,
    pub max_per_observer: Option<usize>,
    pub low_quality_frac: Option<f64>,
}

/// Run-wide values that win over per-row cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingOverrides {
    pub min_rating: Option<f64>,
    pub max_per_observer: Option<usize>,
    pub low_quality_frac: Option<f64>,
}

impl SpeciesSpec {
    pub fn from_record(record: &Record<'_>) -> Result<Self> {
        let species = record.get("Species").to_string();
        let limit_cell = record.get("Limit");
        let limit = parse_limit(limit_cell)
            .with_context(|| format!("Invalid Limit '{limit_cell}' for {species}"))?;
        Ok(Self {
            species: species.clone(),
            limit,
            tags: record.get("Tags").to_string(),
            region: record.opt("Region").map(str::to_string),
            months: record.opt("Months").and_then(parse_months_field),
            min_rating: parse_opt(record, "MinRating", &species)?,
            max_per_observer: parse_opt(record, "MaxPerObserver", &species)?,
            low_quality_frac: parse_opt(record, "LowQualityFrac", &species)?,
        })
    }

    /// Precedence per knob: run override, then this row, then configured default.
    pub fn constraints(
        &self,
        overrides: &SamplingOverrides,
        defaults: &SamplingDefaults,
    ) -> SamplingConstraints {
        SamplingConstraints {
            limit: self.limit,
            min_rating: overrides
                .min_rating
                .or(self.min_rating)
                .unwrap_or(defaults.min_rating),
            max_per_observer: overrides
                .max_per_observer
                .or(self.max_per_observer)
                .unwrap_or(defaults.max_per_observer),
            months: self.months.clone(),
            region: self.region.clone(),
            low_quality_frac: overrides
                .low_quality_frac
                .or(self.low_quality_frac)
                .unwrap_or(defaults.low_quality_frac),
        }
    }
}

/// Negative limits select nothing; `"10.0"` reads as 10.
fn parse_limit(cell: &str) -> Result<usize> {
    if let Ok(n) = cell.parse::<i64>() {
        return Ok(n.max(0) as usize);
    }
    let f: f64 = cell.parse()?;
    anyhow::ensure!(f.is_finite(), "not a finite number");
    Ok(f.max(0.0) as usize)
}

fn parse_opt<T>(record: &Record<'_>, column: &str, species: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    record
        .opt(column)
        .map(|cell| {
            cell.parse::<T>()
                .with_context(|| format!("Invalid {column} '{cell}' for {species}"))
        })
        .transpose()
}
