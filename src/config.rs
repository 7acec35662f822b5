use serde_json::{Map, Value};

use crate::errors::{expect_int, EngineError, EngineResult, Violation};

/// Construction and reconfiguration input. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: Option<String>,
    pub memory_size: Option<usize>,
    pub tape: Option<Vec<i64>>,
    pub cell_min: Option<i64>,
    pub cell_max: Option<i64>,
    /// Defaults to the cell minimum.
    pub condition_value: Option<i64>,
    /// Fill for cells added by growing the tape. Defaults to the cell minimum.
    pub default_value: Option<i64>,
    pub instruction_pointer: Option<usize>,
    pub data_pointer: Option<usize>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn memory_size(mut self, size: usize) -> Self {
        self.memory_size = Some(size);
        self
    }

    pub fn tape(mut self, values: Vec<i64>) -> Self {
        self.tape = Some(values);
        self
    }

    pub fn cell_bounds(mut self, min: i64, max: i64) -> Self {
        self.cell_min = Some(min);
        self.cell_max = Some(max);
        self
    }

    pub fn condition_value(mut self, value: i64) -> Self {
        self.condition_value = Some(value);
        self
    }

    pub fn default_value(mut self, value: i64) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn instruction_pointer(mut self, ip: usize) -> Self {
        self.instruction_pointer = Some(ip);
        self
    }

    pub fn data_pointer(mut self, dp: usize) -> Self {
        self.data_pointer = Some(dp);
        self
    }

    /// Parses a JSON object, reporting the offending field on a type error.
    pub fn from_json(text: &str) -> EngineResult<Self> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(&root)
    }

    pub(crate) fn from_value(root: &Value) -> EngineResult<Self> {
        let obj = root.as_object().ok_or_else(|| EngineError::TypeMismatch {
            field: "config".to_string(),
            found: root.to_string(),
        })?;

        let tape = match field(obj, "tape") {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| expect_int(&format!("tape[{}]", i), v))
                    .collect::<EngineResult<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(EngineError::TypeMismatch {
                    field: "tape".to_string(),
                    found: other.to_string(),
                })
            }
            None => None,
        };

        let program = match field(obj, "program") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(EngineError::TypeMismatch {
                    field: "program".to_string(),
                    found: other.to_string(),
                })
            }
            None => None,
        };

        Ok(EngineConfig {
            program,
            memory_size: index_field(obj, "memory_size")?,
            tape,
            cell_min: int_field(obj, "cell_min")?,
            cell_max: int_field(obj, "cell_max")?,
            condition_value: int_field(obj, "condition_value")?,
            default_value: int_field(obj, "default_value")?,
            instruction_pointer: index_field(obj, "instruction_pointer")?,
            data_pointer: index_field(obj, "data_pointer")?,
        })
    }
}

// null counts as absent
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn int_field(obj: &Map<String, Value>, name: &'static str) -> EngineResult<Option<i64>> {
    field(obj, name).map(|v| expect_int(name, v)).transpose()
}

fn index_field(obj: &Map<String, Value>, name: &'static str) -> EngineResult<Option<usize>> {
    match int_field(obj, name)? {
        Some(v) if v < 0 => Err(EngineError::ValueOutOfRange {
            field: name,
            value: v,
            violation: Violation::TooSmall { min: 0 },
        }),
        Some(v) => Ok(Some(v as usize)),
        None => Ok(None),
    }
}
