use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Dosing periodicity. A month is a fixed 28 days, not a calendar month.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    #[default]
    Day,
    Week,
    Month,
}

impl DoseUnit {
    pub const ALL: [DoseUnit; 3] = [DoseUnit::Day, DoseUnit::Week, DoseUnit::Month];

    /// Length of one dosing period in days.
    pub fn period_days(self) -> i64 {
        match self {
            DoseUnit::Day => 1,
            DoseUnit::Week => 7,
            DoseUnit::Month => 28,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoseUnit::Day => "day",
            DoseUnit::Week => "week",
            DoseUnit::Month => "month",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DoseUnit::Day => "per day",
            DoseUnit::Week => "per week",
            DoseUnit::Month => "per month",
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(DoseUnit::Day),
            "week" => Ok(DoseUnit::Week),
            "month" => Ok(DoseUnit::Month),
            other => Err(anyhow!("unknown dose unit `{other}`")),
        }
    }
}

/// One drug's dosing parameters after validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseEntry {
    pub amount: f64,
    pub unit: DoseUnit,
}

/// Required dose for the drug at 1-based position `index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseLine {
    pub index: usize,
    pub dose: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub appointment_date: String,
    pub days_until_appointment: i64,
    pub lines: Vec<DoseLine>,
}
