use std::fmt;
use thiserror::Error;

/// Which side of a range a value fell off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    TooSmall { min: i64 },
    TooLarge { max: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TooSmall { min } => write!(f, "smaller than min {}", min),
            Violation::TooLarge { max } => write!(f, "larger than max {}", max),
        }
    }
}

/// Engine errors that a host is expected to match on
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{field}: expected an integer, found {found}")]
    TypeMismatch { field: String, found: String },
    #[error("min, {min}, can't be bigger than max, {max}")]
    RangeOrder { min: i64, max: i64 },
    #[error("{field}: {value} is {violation}")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        violation: Violation,
    },
    #[error("Data pointer {pointer} is out of range for a tape of size {size}")]
    PointerOutOfRange { pointer: i64, size: usize },
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),
    #[error("No input request is pending")]
    NoPendingInput,
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// For engine operations where we want specific error handling
pub type EngineResult<T> = std::result::Result<T, EngineError>;

// For the host binary, where errors are only reported
pub type Result<T> = anyhow::Result<T>;

pub fn ensure_min_max(min: i64, max: i64) -> EngineResult<()> {
    if min > max {
        return Err(EngineError::RangeOrder { min, max });
    }
    Ok(())
}

pub fn ensure_in_range(field: &'static str, value: i64, min: i64, max: i64) -> EngineResult<()> {
    ensure_min_max(min, max)?;
    if value < min {
        return Err(EngineError::ValueOutOfRange {
            field,
            value,
            violation: Violation::TooSmall { min },
        });
    }
    if value > max {
        return Err(EngineError::ValueOutOfRange {
            field,
            value,
            violation: Violation::TooLarge { max },
        });
    }
    Ok(())
}

/// Parses host-supplied text as an integer.
pub fn parse_int(field: &str, text: &str) -> EngineResult<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| EngineError::TypeMismatch {
            field: field.to_string(),
            found: format!("{:?}", text),
        })
}

/// Reads an integer out of a JSON value, rejecting fractions, strings and the like.
pub fn expect_int(field: &str, value: &serde_json::Value) -> EngineResult<i64> {
    value.as_i64().ok_or_else(|| EngineError::TypeMismatch {
        field: field.to_string(),
        found: value.to_string(),
    })
}
