//! Bounded integer cells with modular wraparound.

use crate::errors::{ensure_min_max, EngineResult};

/// Wraps `value` into `[min, max]`.
///
/// Computed in `i128` so the full `i64` range never overflows.
pub fn wrap(value: i64, min: i64, max: i64) -> EngineResult<i64> {
    ensure_min_max(min, max)?;
    Ok(wrap_unchecked(value as i128, min, max))
}

fn wrap_unchecked(value: i128, min: i64, max: i64) -> i64 {
    let span = max as i128 - min as i128 + 1;
    ((value - min as i128).rem_euclid(span) + min as i128) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapDirection {
    Underflow,
    Overflow,
}

/// What a single write or re-bound did to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellEvent {
    /// Stored value before the operation.
    pub previous: i64,
    /// Value before wrapping: the assigned value, or the old value on a re-bound.
    /// Saturates at the ends of `i64`, so `offset(1)` on `i64::MAX` reports `i64::MAX`.
    pub raw: i64,
    /// Stored value after the operation.
    pub current: i64,
    /// True when the caller assigned a value, false for a re-bound.
    pub assigned: bool,
    wrap: Option<WrapDirection>,
}

impl CellEvent {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }

    pub fn wrap_direction(&self) -> Option<WrapDirection> {
        self.wrap
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedCell {
    value: i64,
    min: i64,
    max: i64,
}

impl BoundedCell {
    pub fn new(value: i64, min: i64, max: i64) -> EngineResult<Self> {
        ensure_min_max(min, max)?;
        Ok(Self {
            value: wrap_unchecked(value as i128, min, max),
            min,
            max,
        })
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn set(&mut self, value: i64) -> CellEvent {
        self.store(value as i128, true)
    }

    /// `set(value + delta)` without overflowing at the edges of `i64`.
    pub fn offset(&mut self, delta: i64) -> CellEvent {
        self.store(self.value as i128 + delta as i128, true)
    }

    pub fn set_min(&mut self, min: i64) -> EngineResult<CellEvent> {
        self.set_bounds(min, self.max)
    }

    pub fn set_max(&mut self, max: i64) -> EngineResult<CellEvent> {
        self.set_bounds(self.min, max)
    }

    /// Changes both bounds at once and re-wraps the held value.
    pub fn set_bounds(&mut self, min: i64, max: i64) -> EngineResult<CellEvent> {
        ensure_min_max(min, max)?;
        self.min = min;
        self.max = max;
        Ok(self.store(self.value as i128, false))
    }

    fn store(&mut self, raw: i128, assigned: bool) -> CellEvent {
        let previous = self.value;
        let wrap = if raw < self.min as i128 {
            Some(WrapDirection::Underflow)
        } else if raw > self.max as i128 {
            Some(WrapDirection::Overflow)
        } else {
            None
        };
        self.value = wrap_unchecked(raw, self.min, self.max);
        CellEvent {
            previous,
            raw: raw.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            current: self.value,
            assigned,
            wrap,
        }
    }
}
