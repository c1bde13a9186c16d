use thiserror::Error;

/// Rejections of a single calculation attempt. The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DoseError {
    #[error("Please set an appointment date.")]
    MissingAppointmentDate,
    #[error("`{0}` is not a valid date (expected YYYY-MM-DD).")]
    InvalidDate(String),
    #[error("Error: a past date cannot be selected.")]
    PastDate { days: i64 },
    #[error("Please add at least one drug.")]
    NoEntries,
    #[error("Please enter a valid dose amount for every drug.")]
    InvalidAmount,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage I/O failed for `{key}`")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode history")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of a calculate-and-record attempt: either the input was rejected or the
/// history could not be written.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] DoseError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
