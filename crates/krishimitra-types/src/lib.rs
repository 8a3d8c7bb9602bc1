//! Record types for the KrishiMitra offline store.
//!
//! This crate provides the plain data records shared by the store
//! (krishimitra-store) and the sync layer (krishimitra-sync).
//!
//! # Records
//!
//! | Type | Stored as |
//! |------|-----------|
//! | [`WeatherSnapshot`] | newest-first list, capped at 10 |
//! | [`SoilHistoryEntry`] | newest-first list |
//! | [`Advisory`] | newest-first list |
//! | [`PendingAction`] | FIFO queue |
//!
//! # Example
//!
//! ```
//! use krishimitra_types::{Advisory, AdvisoryCategory, Validate};
//!
//! let advisory = Advisory::new("advisory_1", "Weather Alert", "Light rain expected", AdvisoryCategory::Weather)
//!     .with_language("hi");
//! assert!(advisory.validate().is_valid);
//! ```

pub mod error;
pub mod types;
pub mod validation;

pub use error::{ParseError, ParseResult};
pub use types::{
    now_millis, to_datetime, ActionKind, Advisory, AdvisoryCategory, PendingAction,
    SoilHistoryEntry, Timestamp, WeatherSnapshot, HOUR_MS,
};
pub use validation::{Validate, ValidationResult, ValidationWarning};
