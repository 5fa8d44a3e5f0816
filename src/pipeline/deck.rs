use super::error::DeckIssue;
use crate::config::NetworkSettings;
use crate::discovery::{MediaType, Transport};
use crate::media::{build_filename, extension_for_content_type};
use crate::orchestration::{EventType, RunLog};
use crate::tabular::{remove_stale, write_table, Table};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const REQUIRED_DECK_COLUMNS: &[&str] = &["ML_ID", "Species"];
pub const DECK_HEADERS: [&str; 6] = ["Front", "Back", "Media", "Species", "ML", "Tags"];
const DECK_ERROR_HEADERS: [&str; 2] = ["ML_ID", "Error"];
const PROMPT: &str = "What is this bird?";

#[derive(Debug, Clone)]
pub struct DeckOptions {
    pub out_dir: PathBuf,
    pub media_dir: PathBuf,
    pub media_type: MediaType,
}

impl DeckOptions {
    pub fn import_path(&self) -> PathBuf {
        self.out_dir.join(match self.media_type {
            MediaType::Photo => "anki_import_visual.csv",
            MediaType::Audio => "anki_import_audio.csv",
        })
    }

    pub fn errors_path(&self) -> PathBuf {
        self.out_dir.join(match self.media_type {
            MediaType::Photo => "errors_visual.csv",
            MediaType::Audio => "errors_audio.csv",
        })
    }
}

/// Anki note fields for one downloaded asset.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckNote {
    pub front: String,
    pub back: String,
    pub media: String,
    pub species: String,
    pub ml: String,
    pub tags: String,
}

impl DeckNote {
    pub fn new(media_type: MediaType, file_name: &str, ml_id: &str, species: &str, tags: &str) -> Self {
        let (front, media) = match media_type {
            MediaType::Photo => {
                let img = format!("<img src=\"{file_name}\">");
                (format!("{PROMPT}<br>{img}"), img)
            }
            MediaType::Audio => (PROMPT.to_string(), format!("[sound:{file_name}]")),
        };
        Self {
            front,
            back: species.to_string(),
            media,
            species: species.to_string(),
            ml: format!("ML{ml_id}"),
            tags: tags.to_string(),
        }
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.front.clone(),
            self.back.clone(),
            self.media.clone(),
            self.species.clone(),
            self.ml.clone(),
            self.tags.clone(),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeckSummary {
    pub notes: Vec<DeckNote>,
    pub media_files: Vec<PathBuf>,
    pub issues: Vec<DeckIssue>,
    pub import_path: PathBuf,
    pub errors_path: Option<PathBuf>,
}

/// Downloads every selected asset and writes the Anki import file. A failing asset is
/// reported in the error CSV and skipped.
pub struct DeckBuilder<'a> {
    transport: &'a dyn Transport,
    network: &'a NetworkSettings,
    options: DeckOptions,
    log: Option<&'a RunLog>,
}

impl<'a> DeckBuilder<'a> {
    pub fn new(transport: &'a dyn Transport, network: &'a NetworkSettings, options: DeckOptions) -> Self {
        Self {
            transport,
            network,
            options,
            log: None,
        }
    }

    pub fn with_log(mut self, log: &'a RunLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(&self, selection: &Table) -> Result<DeckSummary> {
        selection.require_columns(REQUIRED_DECK_COLUMNS)?;
        for dir in [&self.options.out_dir, &self.options.media_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        self.record(
            EventType::DeckStarted,
            json!({
                "rows": selection.rows.len(),
                "media_type": self.options.media_type,
                "media_dir": self.options.media_dir
            }),
        );

        let mut summary = DeckSummary {
            import_path: self.options.import_path(),
            ..Default::default()
        };
        for record in selection.records() {
            let ml_id = record.get("ML_ID");
            let species = record.get("Species");
            if ml_id.is_empty() {
                summary
                    .issues
                    .push(DeckIssue::new(ml_id, format!("missing ML_ID for {species}")));
                continue;
            }
            match self.fetch_asset(ml_id, species) {
                Ok((file_name, path)) => {
                    debug!(ml_id, path = %path.display(), "saved asset");
                    summary.notes.push(DeckNote::new(
                        self.options.media_type,
                        &file_name,
                        ml_id,
                        species,
                        record.get("Tags"),
                    ));
                    summary.media_files.push(path);
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(ml_id, error = %message, "asset skipped");
                    self.record(
                        EventType::AssetFailed,
                        json!({ "ml_id": ml_id, "species": species, "error": message }),
                    );
                    summary.issues.push(DeckIssue::new(ml_id, message));
                }
            }
        }

        write_table(
            &summary.import_path,
            &DECK_HEADERS,
            summary.notes.iter().map(DeckNote::to_row),
        )?;
        info!(notes = summary.notes.len(), path = %summary.import_path.display(), "wrote Anki import file");

        let errors_path = self.options.errors_path();
        if summary.issues.is_empty() {
            remove_stale(&errors_path)?;
        } else {
            write_table(
                &errors_path,
                &DECK_ERROR_HEADERS,
                summary.issues.iter().map(DeckIssue::to_row),
            )?;
            warn!(issues = summary.issues.len(), path = %errors_path.display(), "wrote deck error report");
            summary.errors_path = Some(errors_path);
        }

        self.record(
            EventType::DeckCompleted,
            json!({
                "notes": summary.notes.len(),
                "issues": summary.issues.len(),
                "import_path": summary.import_path
            }),
        );
        Ok(summary)
    }

    fn fetch_asset(&self, ml_id: &str, species: &str) -> Result<(String, PathBuf)> {
        let url = self.network.asset_url(ml_id);
        let download = self
            .transport
            .get_bytes(&url)
            .context("download error")?;
        let ext = extension_for_content_type(download.content_type.as_deref());
        let file_name = build_filename(species, ml_id, ext);
        let path = self.options.media_dir.join(&file_name);
        fs::write(&path, &download.bytes)
            .with_context(|| format!("write error: {}", path.display()))?;
        Ok((file_name, path))
    }

    fn record(&self, event_type: EventType, details: serde_json::Value) {
        if let Some(log) = self.log {
            if let Err(err) = log.log(event_type, details) {
                warn!(error = %format!("{err:#}"), "failed to append run event");
            }
        }
    }
}
