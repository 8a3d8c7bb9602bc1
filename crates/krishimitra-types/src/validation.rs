//! Shape and bounds checks for records read back from storage.
//!
//! Decoding a record only proves the JSON had the right fields. These checks
//! catch values that decode fine but cannot be real (negative timestamps,
//! pH of 40). Fatal findings make the record invalid; the rest are warnings
//! the store logs and keeps.
//!
//! # Example
//!
//! ```
//! use krishimitra_types::{SoilHistoryEntry, Validate};
//!
//! let entry = SoilHistoryEntry {
//!     id: "soil_1".to_string(),
//!     ph: 6.5,
//!     nitrogen: 40.0,
//!     phosphorus: 20.0,
//!     potassium: 30.0,
//!     moisture: 18.0,
//!     location: "North field".to_string(),
//!     timestamp: 1_700_000_000_000,
//! };
//!
//! let result = entry.validate();
//! assert!(result.is_valid);
//! assert!(!result.has_warnings());
//! ```

use std::fmt;

use crate::types::{Advisory, PendingAction, SoilHistoryEntry, Timestamp, WeatherSnapshot};

/// Highest pH a soil test can report.
pub const MAX_PH: f64 = 14.0;

/// Findings produced by [`Validate::validate`].
///
/// This enum is marked `#[non_exhaustive]` to allow adding new checks
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationWarning {
    /// Timestamp is zero or negative.
    NonPositiveTimestamp { value: Timestamp },
    /// A required identifier is empty.
    EmptyId,
    /// pH outside 0-14.
    PhOutOfRange { value: f64 },
    /// A measured quantity is negative.
    NegativeValue { field: &'static str, value: f64 },
    /// A measured quantity is NaN or infinite.
    NonFiniteValue { field: &'static str },
    /// A descriptive field is empty. Not fatal.
    EmptyField { field: &'static str },
}

impl ValidationWarning {
    /// Whether this finding makes the record unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ValidationWarning::EmptyField { .. })
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::NonPositiveTimestamp { value } => {
                write!(f, "timestamp {} is not positive", value)
            }
            ValidationWarning::EmptyId => write!(f, "identifier is empty"),
            ValidationWarning::PhOutOfRange { value } => {
                write!(f, "pH {} is out of valid range (0-{})", value, MAX_PH)
            }
            ValidationWarning::NegativeValue { field, value } => {
                write!(f, "{} {} is negative", field, value)
            }
            ValidationWarning::NonFiniteValue { field } => {
                write!(f, "{} is not a finite number", field)
            }
            ValidationWarning::EmptyField { field } => write!(f, "{} is empty", field),
        }
    }
}

/// Result of validating a record.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the record can be used.
    pub is_valid: bool,
    /// Everything found, fatal or not.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    fn from_warnings(warnings: Vec<ValidationWarning>) -> Self {
        Self {
            is_valid: !warnings.iter().any(ValidationWarning::is_fatal),
            warnings,
        }
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Render all findings as one line for logging.
    pub fn summary(&self) -> String {
        self.warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Records that can check their own values.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

fn check_timestamp(timestamp: Timestamp, warnings: &mut Vec<ValidationWarning>) {
    if timestamp <= 0 {
        warnings.push(ValidationWarning::NonPositiveTimestamp { value: timestamp });
    }
}

fn check_quantity(field: &'static str, value: f64, warnings: &mut Vec<ValidationWarning>) {
    if !value.is_finite() {
        warnings.push(ValidationWarning::NonFiniteValue { field });
    } else if value < 0.0 {
        warnings.push(ValidationWarning::NegativeValue { field, value });
    }
}

impl Validate for WeatherSnapshot {
    fn validate(&self) -> ValidationResult {
        let mut warnings = Vec::new();
        check_timestamp(self.timestamp, &mut warnings);
        if self.condition.is_empty() {
            warnings.push(ValidationWarning::EmptyField { field: "condition" });
        }
        ValidationResult::from_warnings(warnings)
    }
}

impl Validate for SoilHistoryEntry {
    fn validate(&self) -> ValidationResult {
        let mut warnings = Vec::new();
        check_timestamp(self.timestamp, &mut warnings);

        if !self.ph.is_finite() {
            warnings.push(ValidationWarning::NonFiniteValue { field: "ph" });
        } else if !(0.0..=MAX_PH).contains(&self.ph) {
            warnings.push(ValidationWarning::PhOutOfRange { value: self.ph });
        }

        check_quantity("nitrogen", self.nitrogen, &mut warnings);
        check_quantity("phosphorus", self.phosphorus, &mut warnings);
        check_quantity("potassium", self.potassium, &mut warnings);
        check_quantity("moisture", self.moisture, &mut warnings);

        if self.id.is_empty() {
            warnings.push(ValidationWarning::EmptyField { field: "id" });
        }

        ValidationResult::from_warnings(warnings)
    }
}

impl Validate for Advisory {
    fn validate(&self) -> ValidationResult {
        let mut warnings = Vec::new();
        check_timestamp(self.timestamp, &mut warnings);
        if self.id.is_empty() {
            warnings.push(ValidationWarning::EmptyId);
        }
        if self.title.is_empty() {
            warnings.push(ValidationWarning::EmptyField { field: "title" });
        }
        ValidationResult::from_warnings(warnings)
    }
}

impl Validate for PendingAction {
    fn validate(&self) -> ValidationResult {
        let mut warnings = Vec::new();
        check_timestamp(self.timestamp, &mut warnings);
        if matches!(&self.id, Some(id) if id.is_empty()) {
            warnings.push(ValidationWarning::EmptyId);
        }
        ValidationResult::from_warnings(warnings)
    }
}
