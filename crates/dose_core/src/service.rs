use std::sync::Arc;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use tracing::{info, instrument};

use crate::calculator::{self, EntryInput};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::dose::CalculationResult;
use crate::error::{DoseError, HistoryError, SubmitError};
use crate::history::{HistoryRecord, HistoryStore};
use crate::projector::{DateProjector, REFERENCE_TIMEZONE};
use crate::storage::{FileBackend, MemoryBackend, StorageBackend};

/// Calculation plus history bookkeeping, as driven by the view layer.
pub struct DoseService {
    projector: DateProjector,
    history: HistoryStore<Box<dyn StorageBackend>>,
}

pub struct DoseServiceBuilder {
    timezone: Tz,
    clock: Arc<dyn Clock>,
    backend: Option<Box<dyn StorageBackend>>,
}

impl Default for DoseServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DoseServiceBuilder {
    pub fn new() -> Self {
        Self {
            timezone: REFERENCE_TIMEZONE,
            clock: Arc::new(SystemClock),
            backend: None,
        }
    }

    /// File-backed history under the configured directory.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .timezone(config.timezone)
            .backend(Box::new(FileBackend::new(&config.history_dir)))
    }

    pub fn timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(mut self, backend: Box<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<DoseService> {
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(MemoryBackend::new()));
        let service = DoseService {
            projector: DateProjector::new(self.timezone).with_clock(self.clock),
            history: HistoryStore::new(backend),
        };
        let existing = service
            .history
            .len()
            .context("failed to read calculation history")?;
        info!(timezone = %self.timezone, records = existing, "dose service ready");
        Ok(service)
    }
}

impl DoseService {
    pub fn builder() -> DoseServiceBuilder {
        DoseServiceBuilder::new()
    }

    pub fn projector(&self) -> &DateProjector {
        &self.projector
    }

    pub fn today_string(&self) -> String {
        self.projector.today_string()
    }

    /// Validates and projects without touching history.
    pub fn calculate(
        &self,
        appointment: Option<&str>,
        entries: &[EntryInput],
    ) -> Result<CalculationResult, DoseError> {
        calculator::calculate(&self.projector, appointment, entries)
    }

    /// Calculates and, only on success, records the result at the front of the history.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn submit(
        &self,
        appointment: Option<&str>,
        entries: &[EntryInput],
    ) -> Result<CalculationResult, SubmitError> {
        let result = self.calculate(appointment, entries)?;
        self.record(&result)?;
        Ok(result)
    }

    /// Saves an already-computed result at the front of the history, stamped with now.
    pub fn record(&self, result: &CalculationResult) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord::from_result(result, self.projector.now_display());
        self.history.append(record.clone())?;
        Ok(record)
    }

    pub fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.history
            .load()
            .context("failed to read calculation history")
    }

    /// Callers confirm with the user before deleting.
    #[instrument(skip(self))]
    pub fn delete_history(&self, index: usize) -> Result<Option<HistoryRecord>> {
        self.history
            .delete_at(index)
            .with_context(|| format!("failed to delete history entry {index}"))
    }

    /// Callers confirm with the user before clearing.
    #[instrument(skip(self))]
    pub fn clear_history(&self) -> Result<()> {
        self.history
            .clear()
            .context("failed to clear calculation history")
    }
}
