use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dose::{CalculationResult, DoseEntry, DoseLine, DoseUnit};
use crate::error::DoseError;
use crate::projector::{self, DateProjector};

/// Unvalidated drug row as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    pub amount: String,
    pub unit: DoseUnit,
}

impl EntryInput {
    pub fn new(amount: impl Into<String>, unit: DoseUnit) -> Self {
        Self {
            amount: amount.into(),
            unit,
        }
    }

    /// Parses the amount, accepting only finite positive numbers.
    pub fn to_entry(&self) -> Option<DoseEntry> {
        let amount = self.amount.trim().parse::<f64>().ok()?;
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        Some(DoseEntry {
            amount,
            unit: self.unit,
        })
    }
}

/// Validates the form and projects every entry. Any invalid amount rejects the whole
/// calculation; no partial results are produced.
pub fn calculate(
    projector: &DateProjector,
    appointment: Option<&str>,
    entries: &[EntryInput],
) -> Result<CalculationResult, DoseError> {
    let appointment = appointment
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(DoseError::MissingAppointmentDate)?;

    let target = projector::parse_date(appointment)?;
    let days = projector.days_until_date(target);
    if days < 0 {
        return Err(DoseError::PastDate { days });
    }

    if entries.is_empty() {
        return Err(DoseError::NoEntries);
    }

    let parsed: Vec<DoseEntry> = entries
        .iter()
        .map(EntryInput::to_entry)
        .collect::<Option<_>>()
        .ok_or(DoseError::InvalidAmount)?;

    let lines = parsed
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            projector::project_dose(entry.amount, entry.unit, days).map(|dose| DoseLine {
                index: position + 1,
                dose,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(appointment, days, entries = lines.len(), "calculated doses");
    Ok(CalculationResult {
        appointment_date: appointment.to_string(),
        days_until_appointment: days,
        lines,
    })
}
