use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dose::{CalculationResult, DoseLine};
use crate::error::HistoryError;
use crate::storage::StorageBackend;

/// Storage key holding the whole history list.
pub const HISTORY_KEY: &str = "calculationHistory";

/// Snapshot of one successful calculation as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "date")]
    pub calculated_at: String,
    #[serde(rename = "appointmentDate")]
    pub appointment_date: String,
    #[serde(rename = "daysDiff")]
    pub days_until_appointment: i64,
    #[serde(rename = "results")]
    pub lines: Vec<DoseLine>,
}

impl HistoryRecord {
    pub fn from_result(result: &CalculationResult, calculated_at: impl Into<String>) -> Self {
        Self {
            calculated_at: calculated_at.into(),
            appointment_date: result.appointment_date.clone(),
            days_until_appointment: result.days_until_appointment,
            lines: result.lines.clone(),
        }
    }
}

/// Newest-first list of past calculations. Every mutation reads the full list and
/// rewrites it; concurrent writers race with last-write-wins.
#[derive(Debug)]
pub struct HistoryStore<B> {
    backend: B,
}

impl<B: StorageBackend> HistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Unreadable or mismatched data loads as an empty history.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let Some(raw) = self.backend.read(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<HistoryRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(%err, "discarding unreadable calculation history");
                Ok(Vec::new())
            }
        }
    }

    pub fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let mut records = self.load()?;
        records.insert(0, record);
        self.save(&records)?;
        info!(count = records.len(), "history record added");
        Ok(())
    }

    /// Removes the record at display position `index`. Out-of-range indices are ignored
    /// and leave storage untouched.
    pub fn delete_at(&self, index: usize) -> Result<Option<HistoryRecord>, HistoryError> {
        let mut records = self.load()?;
        if index >= records.len() {
            return Ok(None);
        }
        let removed = records.remove(index);
        self.save(&records)?;
        info!(index, remaining = records.len(), "history record deleted");
        Ok(Some(removed))
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        self.backend.remove(HISTORY_KEY)?;
        info!("history cleared");
        Ok(())
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(records)?;
        self.backend.write(HISTORY_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn record(tag: i64) -> HistoryRecord {
        HistoryRecord {
            calculated_at: format!("2026/10/16 9:00:{tag:02}"),
            appointment_date: "2026-10-26".into(),
            days_until_appointment: tag,
            lines: vec![DoseLine {
                index: 1,
                dose: tag as f64,
            }],
        }
    }

    fn store_with(n: i64) -> HistoryStore<MemoryBackend> {
        let store = HistoryStore::new(MemoryBackend::new());
        for tag in 0..n {
            store.append(record(tag)).unwrap();
        }
        store
    }

    #[test]
    fn append_puts_newest_first() {
        let store = store_with(3);
        let records = store.load().unwrap();
        let tags: Vec<i64> = records.iter().map(|r| r.days_until_appointment).collect();
        assert_eq!(tags, vec![2, 1, 0]);

        store.append(record(9)).unwrap();
        assert_eq!(store.load().unwrap()[0], record(9));
    }

    #[test]
    fn delete_at_removes_exactly_one() {
        for index in 0..4 {
            let store = store_with(4);
            let mut expected = store.load().unwrap();
            let original = expected.remove(index);

            assert_eq!(store.delete_at(index).unwrap(), Some(original));
            assert_eq!(store.load().unwrap(), expected);
        }
    }

    #[test]
    fn delete_out_of_range_is_a_no_op() {
        let store = store_with(2);
        let before = store.load().unwrap();
        assert_eq!(store.delete_at(2).unwrap(), None);
        assert_eq!(store.delete_at(usize::MAX).unwrap(), None);
        assert_eq!(store.load().unwrap(), before);

        let empty = store_with(0);
        assert_eq!(empty.delete_at(0).unwrap(), None);
        assert_eq!(empty.backend().read(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn clear_removes_everything() {
        let store = store_with(3);
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.backend().read(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_data_loads_as_empty() {
        let backend = MemoryBackend::new();
        for raw in ["not json", "{}", "null", r#"[{"date": 5}]"#] {
            backend.write(HISTORY_KEY, raw).unwrap();
            let store = HistoryStore::new(&backend);
            assert!(store.load().unwrap().is_empty(), "{raw} should load as empty");
        }
    }

    #[test]
    fn reads_records_written_with_integer_doses() {
        let backend = MemoryBackend::new();
        backend
            .write(
                HISTORY_KEY,
                r#"[{"date":"2026/10/16 9:05:03","appointmentDate":"2026-10-26","daysDiff":10,"results":[{"index":1,"dose":20}]}]"#,
            )
            .unwrap();
        let records = HistoryStore::new(&backend).load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].days_until_appointment, 10);
        assert_eq!(records[0].lines[0].dose, 20.0);
    }
}
