use crate::dose::{CalculationResult, DoseLine};
use crate::error::DoseError;
use crate::history::HistoryRecord;

pub const EMPTY_HISTORY: &str = "No history yet.";

/// ①..⑳ for 1 through 20, plain digits beyond that.
pub fn circled_number(n: usize) -> String {
    let glyph = match n {
        1..=20 => char::from_u32(0x2460 + (n as u32 - 1)),
        _ => None,
    };
    glyph.map_or_else(|| n.to_string(), String::from)
}

pub fn drug_label(n: usize) -> String {
    format!("Drug {}", circled_number(n))
}

pub fn dose_line_text(line: &DoseLine) -> String {
    format!("{}: {} tablets", drug_label(line.index), line.dose)
}

pub fn days_text(days: i64) -> String {
    format!("{days} days until the appointment")
}

pub fn history_header(record: &HistoryRecord) -> String {
    format!(
        "Calculated: {} / Appointment: {} ({} days left)",
        record.calculated_at, record.appointment_date, record.days_until_appointment
    )
}

/// What the result panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPanel {
    Error(String),
    Success { days: i64, lines: Vec<String> },
}

impl ResultPanel {
    pub fn from_outcome(outcome: &Result<CalculationResult, DoseError>) -> Self {
        match outcome {
            Ok(result) => ResultPanel::Success {
                days: result.days_until_appointment,
                lines: result.lines.iter().map(dose_line_text).collect(),
            },
            Err(err) => ResultPanel::Error(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultPanel::Error(_))
    }
}
