use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Type of run events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FetchStarted,
    SpeciesSampled,
    SpeciesSkipped,
    SpeciesFailed,
    FetchCompleted,
    DeckStarted,
    AssetFailed,
    DeckCompleted,
}

/// Run event stored as one JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Append-only event log shared by every run, one file per workspace.
pub struct RunLog {
    run_id: Uuid,
    events_path: PathBuf,
}

impl RunLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            events_path: logs_dir.join("events.jsonl"),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    pub fn log(&self, event_type: EventType, details: serde_json::Value) -> Result<()> {
        let event = RunEvent {
            event_id: Uuid::new_v4(),
            run_id: self.run_id,
            event_type,
            timestamp: Utc::now(),
            details,
        };
        self.append_event(&event)
    }

    pub fn append_event(&self, event: &RunEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .with_context(|| format!("Failed to open run log {:?}", self.events_path))?;
        file.write_all(serde_json::to_string(event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    pub fn load_events(&self) -> Result<Vec<RunEvent>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.events_path)?;
        let mut events = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let event: RunEvent = serde_json::from_str(line)?;
            events.push(event);
        }
        Ok(events)
    }

    /// Events written by this run only.
    pub fn load_run_events(&self) -> Result<Vec<RunEvent>> {
        Ok(self
            .load_events()?
            .into_iter()
            .filter(|event| event.run_id == self.run_id)
            .collect())
    }
}
