use super::error::{SpeciesIssue, SpeciesIssueReason};
use crate::config::SamplingDefaults;
use crate::discovery::{CandidateCache, CandidateSource, CatalogQuery, MediaType};
use crate::models::{Candidate, SamplingOverrides, SpeciesSpec, REQUIRED_SPEC_COLUMNS};
use crate::orchestration::{EventType, RunLog};
use crate::sampling;
use crate::tabular::{remove_stale, write_table, Table};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header of the selection CSV consumed by the deck builder.
pub const SELECTION_HEADERS: [&str; 3] = ["ML_ID", "Species", "Tags"];
pub const FETCH_ERRORS_FILE: &str = "errors_fetch.csv";
const FETCH_ERROR_HEADERS: [&str; 2] = ["Species", "Error"];

/// Reads and validates a fetch-spec CSV.
pub fn load_species_specs(path: &Path) -> Result<Vec<SpeciesSpec>> {
    let table = Table::read(path)?;
    table.require_columns(REQUIRED_SPEC_COLUMNS)?;
    table
        .records()
        .filter(|r| !r.get("Species").is_empty())
        .map(|r| SpeciesSpec::from_record(&r))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid fetch spec in {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub out: PathBuf,
    pub media_type: MediaType,
    pub pages: u32,
    pub seed: u64,
    pub overrides: SamplingOverrides,
    pub cache_dir: Option<PathBuf>,
    /// Report counts only; write nothing.
    pub dry_run: bool,
}

/// One row of the selection CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRow {
    pub ml_id: String,
    pub species: String,
    pub tags: String,
}

impl SelectionRow {
    fn to_row(&self) -> Vec<String> {
        vec![self.ml_id.clone(), self.species.clone(), self.tags.clone()]
    }
}

/// Per-species counts, reported in dry runs and the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesOutcome {
    pub species: String,
    pub gathered: usize,
    pub picked: usize,
}

impl SpeciesOutcome {
    pub fn describe(&self) -> String {
        format!(
            "{}: gathered={} picks={}",
            self.species, self.gathered, self.picked
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub outcomes: Vec<SpeciesOutcome>,
    pub rows: Vec<SelectionRow>,
    pub issues: Vec<SpeciesIssue>,
    /// Selection CSV, when one was written.
    pub out_path: Option<PathBuf>,
    /// Error report, when one was written.
    pub errors_path: Option<PathBuf>,
}

/// Walks the species list: discover, sample, collect rows. A failure for one species is
/// recorded and the loop moves on.
pub struct FetchRunner<'a, S> {
    source: S,
    options: FetchOptions,
    defaults: SamplingDefaults,
    log: Option<&'a RunLog>,
}

impl<'a, S: CandidateSource> FetchRunner<'a, S> {
    pub fn new(source: S, options: FetchOptions, defaults: SamplingDefaults) -> Self {
        Self {
            source,
            options,
            defaults,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a RunLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn run(&self, specs: &[SpeciesSpec]) -> Result<FetchSummary> {
        let mut rng = StdRng::seed_from_u64(self.options.seed);
        let cache = self.options.cache_dir.as_ref().map(CandidateCache::new);
        let mut summary = FetchSummary::default();
        self.record(
            EventType::FetchStarted,
            json!({
                "species": specs.len(),
                "media_type": self.options.media_type,
                "pages": self.options.pages,
                "seed": self.options.seed,
                "dry_run": self.options.dry_run
            }),
        );

        for spec in specs {
            info!(species = %spec.species, limit = spec.limit, "processing species");
            let query = CatalogQuery::new(&spec.species, self.options.media_type, self.options.pages);
            let cached = cache
                .as_ref()
                .map(|c| c.load(&spec.species))
                .unwrap_or_default();
            let discovery = self.source.discover(&query);

            if !discovery.issues.is_empty() {
                let reason = if discovery.failed_outright() {
                    SpeciesIssueReason::DiscoveryFailed
                } else {
                    SpeciesIssueReason::CatalogPages
                };
                let message = discovery
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                self.record(
                    EventType::SpeciesFailed,
                    json!({ "species": spec.species, "reason": reason, "message": message }),
                );
                summary
                    .issues
                    .push(SpeciesIssue::new(&spec.species, reason, message));
            }

            let pool: Vec<Candidate> = cached
                .iter()
                .chain(&discovery.candidates)
                .cloned()
                .collect();
            let constraints = spec.constraints(&self.options.overrides, &self.defaults);
            let picks = sampling::sample(&pool, &constraints, &mut rng);
            let outcome = SpeciesOutcome {
                species: spec.species.clone(),
                gathered: pool.len(),
                picked: picks.len(),
            };

            if picks.is_empty() {
                warn!(species = %spec.species, gathered = pool.len(), "no picks, skipping species");
                self.record(
                    EventType::SpeciesSkipped,
                    json!({ "species": spec.species, "gathered": pool.len() }),
                );
            } else {
                info!(species = %spec.species, gathered = pool.len(), picks = picks.len(), "species sampled");
                self.record(
                    EventType::SpeciesSampled,
                    json!({
                        "species": spec.species,
                        "gathered": pool.len(),
                        "picks": picks.len(),
                        "ml_ids": picks.iter().map(|c| c.ml_id.as_str()).collect::<Vec<_>>()
                    }),
                );
            }

            if !self.options.dry_run {
                if let Some(cache) = cache.as_ref().filter(|_| !discovery.candidates.is_empty()) {
                    if let Err(err) = cache.store(&spec.species, &cached, &discovery.candidates) {
                        warn!(species = %spec.species, error = %format!("{err:#}"), "failed to update candidate cache");
                        summary.issues.push(SpeciesIssue::new(
                            &spec.species,
                            SpeciesIssueReason::CacheWrite,
                            format!("{err:#}"),
                        ));
                    }
                }
                summary.rows.extend(picks.iter().map(|c| SelectionRow {
                    ml_id: c.ml_id.clone(),
                    species: spec.species.clone(),
                    tags: spec.tags.clone(),
                }));
            }
            summary.outcomes.push(outcome);
        }

        if !self.options.dry_run {
            self.write_outputs(&mut summary)?;
        }
        self.record(
            EventType::FetchCompleted,
            json!({
                "species": specs.len(),
                "rows": summary.rows.len(),
                "issues": summary.issues.len(),
                "out": summary.out_path,
                "errors": summary.errors_path
            }),
        );
        Ok(summary)
    }

    fn write_outputs(&self, summary: &mut FetchSummary) -> Result<()> {
        let out = &self.options.out;
        write_table(out, &SELECTION_HEADERS, summary.rows.iter().map(SelectionRow::to_row))?;
        info!(rows = summary.rows.len(), path = %out.display(), "wrote selection");
        summary.out_path = Some(out.clone());

        let errors_path = sibling(out, FETCH_ERRORS_FILE);
        if summary.issues.is_empty() {
            remove_stale(&errors_path)?;
        } else {
            write_table(
                &errors_path,
                &FETCH_ERROR_HEADERS,
                summary.issues.iter().map(SpeciesIssue::to_row),
            )?;
            warn!(issues = summary.issues.len(), path = %errors_path.display(), "wrote fetch error report");
            summary.errors_path = Some(errors_path);
        }
        Ok(())
    }

    fn record(&self, event_type: EventType, details: serde_json::Value) {
        if let Some(log) = self.log {
            if let Err(err) = log.log(event_type, details) {
                warn!(error = %format!("{err:#}"), "failed to append run event");
            }
        }
    }
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
