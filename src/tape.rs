use crate::cell::{BoundedCell, CellEvent};
use crate::errors::{ensure_in_range, ensure_min_max, EngineError, EngineResult, Violation};

/// Largest tape an engine will allocate.
pub const MAX_MEMORY_SIZE: usize = 30000;

pub fn ensure_memory_size(len: usize) -> EngineResult<()> {
    if len > MAX_MEMORY_SIZE {
        return Err(EngineError::ValueOutOfRange {
            field: "memory size",
            value: len as i64,
            violation: Violation::TooLarge {
                max: MAX_MEMORY_SIZE as i64,
            },
        });
    }
    ensure_in_range("memory size", len as i64, 1, MAX_MEMORY_SIZE as i64)
}

/// The memory tape. Every cell shares the tape's bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<BoundedCell>,
    min: i64,
    max: i64,
}

impl Tape {
    pub fn new(len: usize, fill: i64, min: i64, max: i64) -> EngineResult<Self> {
        ensure_memory_size(len)?;
        ensure_in_range("default value", fill, min, max)?;
        let cell = BoundedCell::new(fill, min, max)?;
        Ok(Tape {
            cells: vec![cell; len],
            min,
            max,
        })
    }

    /// Seeds a tape from explicit contents. Out-of-range values are wrapped.
    pub fn from_values(values: &[i64], min: i64, max: i64) -> EngineResult<Self> {
        ensure_memory_size(values.len())?;
        let cells = values
            .iter()
            .map(|&v| BoundedCell::new(v, min, max))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Tape { cells, min, max })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        self.cells.get(index).map(BoundedCell::value)
    }

    pub fn values(&self) -> Vec<i64> {
        self.cells.iter().map(BoundedCell::value).collect()
    }

    pub fn set(&mut self, index: usize, value: i64) -> EngineResult<CellEvent> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(EngineError::PointerOutOfRange {
                pointer: index as i64,
                size: len,
            })?;
        Ok(cell.set(value))
    }

    /// Adds `delta` to one cell. `None` if the index is off the tape.
    pub fn offset(&mut self, index: usize, delta: i64) -> Option<CellEvent> {
        self.cells.get_mut(index).map(|cell| cell.offset(delta))
    }

    pub fn fill(&mut self, value: i64) -> Vec<(usize, CellEvent)> {
        self.cells
            .iter_mut()
            .map(|cell| cell.set(value))
            .enumerate()
            .collect()
    }

    /// Re-bounds every cell. Only cells whose value actually moved are reported.
    pub fn set_bounds(&mut self, min: i64, max: i64) -> EngineResult<Vec<(usize, CellEvent)>> {
        ensure_min_max(min, max)?;
        self.min = min;
        self.max = max;
        let mut events = Vec::new();
        for (index, cell) in self.cells.iter_mut().enumerate() {
            let event = cell.set_bounds(min, max)?;
            if event.changed() || event.wrap_direction().is_some() {
                events.push((index, event));
            }
        }
        Ok(events)
    }

    /// Grows with `fill` or truncates from the tail.
    pub fn resize(&mut self, len: usize, fill: i64) -> EngineResult<()> {
        ensure_memory_size(len)?;
        ensure_in_range("default value", fill, self.min, self.max)?;
        let cell = BoundedCell::new(fill, self.min, self.max)?;
        self.cells.resize(len, cell);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resize() {
        let mut tape = Tape::from_values(&[1, 2, 3], 0, 255).unwrap();
        tape.resize(5, 9).unwrap();
        assert_eq!(tape.values(), vec![1, 2, 3, 9, 9]);
        tape.resize(2, 0).unwrap();
        assert_eq!(tape.values(), vec![1, 2]);
    }

    #[test]
    fn test_memory_size_limits() {
        assert!(Tape::new(0, 0, 0, 255).is_err());
        assert!(Tape::new(MAX_MEMORY_SIZE + 1, 0, 0, 255).is_err());
        assert_eq!(Tape::new(MAX_MEMORY_SIZE, 0, 0, 255).unwrap().len(), MAX_MEMORY_SIZE);
    }

    #[test]
    fn test_fill_value_must_be_in_bounds() {
        let mut tape = Tape::new(2, 0, 0, 9).unwrap();
        assert!(matches!(
            tape.resize(4, 10),
            Err(EngineError::ValueOutOfRange { field: "default value", .. })
        ));
        assert_eq!(tape.len(), 2);
    }

    #[test]
    fn test_seed_values_wrap() {
        let tape = Tape::from_values(&[-1, 256, 7], 0, 255).unwrap();
        assert_eq!(tape.values(), vec![255, 0, 7]);
    }

    #[test]
    fn test_bounds_propagate() {
        let mut tape = Tape::from_values(&[0, 5, 200], 0, 255).unwrap();
        let events = tape.set_bounds(0, 99).unwrap();
        assert_eq!(tape.values(), vec![0, 5, 0]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, 2);
        assert_eq!((tape.min(), tape.max()), (0, 99));
    }

    #[test]
    fn test_set_out_of_tape() {
        let mut tape = Tape::new(3, 0, 0, 255).unwrap();
        assert!(matches!(
            tape.set(3, 1),
            Err(EngineError::PointerOutOfRange { pointer: 3, size: 3 })
        ));
    }
}
