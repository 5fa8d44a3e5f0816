//! Species-level drivers: the fetch loop that turns a species list into a selection CSV,
//! and the deck builder that turns a selection into media files plus an Anki import.

pub mod deck;
pub mod error;
pub mod fetch;

pub use deck::{DeckBuilder, DeckNote, DeckOptions, DeckSummary, DECK_HEADERS};
pub use error::{DeckIssue, SpeciesIssue, SpeciesIssueReason};
pub use fetch::{
    load_species_specs, FetchOptions, FetchRunner, FetchSummary, SelectionRow, SpeciesOutcome,
    FETCH_ERRORS_FILE, SELECTION_HEADERS,
};
