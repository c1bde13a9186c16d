pub mod calculator;
pub mod clock;
pub mod config;
pub mod dose;
pub mod error;
pub mod form;
pub mod history;
pub mod projector;
pub mod render;
pub mod service;
pub mod storage;

pub use crate::error::{DoseError, HistoryError, SubmitError};
pub use crate::service::{DoseService, DoseServiceBuilder};
