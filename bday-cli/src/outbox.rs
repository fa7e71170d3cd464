//! File-backed delivery primitive.
//!
//! Reminders live in `$BDAY_HOME/outbox.json`. Clears and registrations
//! stage in memory; `flush` commits the whole set with a temp-file rename so
//! a reader never sees a half-written pass.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bday_core::{Authorization, CandidateEvent, DeliveryError, DeliveryPrimitive};

#[derive(Debug)]
pub struct FileOutbox {
    path: PathBuf,
    authorization: Authorization,
    ceiling: usize,
    events: Vec<CandidateEvent>,
}

impl FileOutbox {
    pub fn open(path: impl Into<PathBuf>, authorization: Authorization, ceiling: usize) -> Result<Self> {
        let path = path.into();
        let events = read_events(&path)?;
        Ok(Self {
            path,
            authorization,
            ceiling,
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Outstanding reminders on disk, in trigger order. Empty when the file is
/// missing.
pub fn read_events(path: &Path) -> Result<Vec<CandidateEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut events: Vec<CandidateEvent> =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    events.sort_by_key(|e| e.trigger_at);
    Ok(events)
}

#[async_trait::async_trait]
impl DeliveryPrimitive for FileOutbox {
    async fn authorization(&self) -> Authorization {
        self.authorization
    }

    async fn clear_all_outstanding(&mut self) -> Result<(), DeliveryError> {
        self.events.clear();
        Ok(())
    }

    async fn register(&mut self, event: &CandidateEvent) -> Result<(), DeliveryError> {
        if let Some(existing) = self.events.iter_mut().find(|e| e.id == event.id) {
            *existing = event.clone();
            return Ok(());
        }
        if self.events.len() >= self.ceiling {
            return Err(DeliveryError::CapacityExceeded { ceiling: self.ceiling });
        }
        self.events.push(event.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DeliveryError> {
        let json = serde_json::to_string_pretty(&self.events)
            .map_err(|e| DeliveryError::Unavailable(format!("serialize outbox: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), events = self.events.len(), "outbox written");
        Ok(())
    }

    async fn outstanding(&self) -> Result<Vec<CandidateEvent>, DeliveryError> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.trigger_at);
        Ok(events)
    }

    fn name(&self) -> &str {
        "outbox"
    }
}
