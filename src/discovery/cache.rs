use crate::media::clean_name;
use crate::models::candidate::Candidate;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Per-species JSON store of previously discovered candidates.
///
/// Cached candidates are offered to the sampler ahead of fresh ones, so a species keeps
/// its older finds even when a later catalog walk comes back short.
pub struct CandidateCache {
    root: PathBuf,
}

impl CandidateCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, species: &str) -> PathBuf {
        self.root.join(format!("{}.json", clean_name(species)))
    }

    /// Cached candidates for a species; a missing or unreadable file reads as empty.
    pub fn load(&self, species: &str) -> Vec<Candidate> {
        let path = self.path_for(species);
        if !path.exists() {
            return Vec::new();
        }
        match read_candidates(&path) {
            Ok(items) => items,
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "ignoring unreadable candidate cache");
                Vec::new()
            }
        }
    }

    /// Rewrites the cache with the union of cached and fresh candidates, first seen wins.
    pub fn store(&self, species: &str, cached: &[Candidate], fresh: &[Candidate]) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create cache directory {}", self.root.display()))?;
        let mut seen = HashSet::new();
        let mut merged: Vec<&Candidate> = cached
            .iter()
            .chain(fresh)
            .filter(|&c| seen.insert(c.ml_id.as_str()))
            .collect();
        merged.sort_by(|a, b| a.ml_id.cmp(&b.ml_id));
        let path = self.path_for(species);
        let data = serde_json::to_string_pretty(&merged)?;
        fs::write(&path, data)
            .with_context(|| format!("Failed to write candidate cache {}", path.display()))?;
        Ok(())
    }
}

fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
