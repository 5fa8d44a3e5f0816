use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesIssueReason {
    /// One or more catalog pages failed; the species may still have picks.
    CatalogPages,
    /// Nothing could be discovered at all.
    DiscoveryFailed,
    CacheWrite,
}

/// Non-fatal problem met while processing one species.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesIssue {
    pub species: String,
    pub reason: SpeciesIssueReason,
    pub message: String,
}

impl SpeciesIssue {
    pub fn new(species: &str, reason: SpeciesIssueReason, message: impl Into<String>) -> Self {
        Self {
            species: species.to_string(),
            reason,
            message: message.into(),
        }
    }

    pub(crate) fn to_row(&self) -> Vec<String> {
        vec![self.species.clone(), self.message.clone()]
    }
}

/// Asset that could not be turned into a deck note.
#[derive(Debug, Clone, Serialize)]
pub struct DeckIssue {
    pub ml_id: String,
    pub message: String,
}

impl DeckIssue {
    pub fn new(ml_id: &str, message: impl Into<String>) -> Self {
        Self {
            ml_id: ml_id.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn to_row(&self) -> Vec<String> {
        vec![self.ml_id.clone(), self.message.clone()]
    }
}
