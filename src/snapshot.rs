use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::EngineResult;

/// Plain-data picture of an engine, for saving and inspection.
///
/// `ended`, `loop_pairs` and `unmatched_loops` are derived from the program;
/// restoring recomputes them rather than trusting the stored copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub program: String,
    pub instruction_pointer: usize,
    pub data_pointer: usize,
    pub tape: Vec<i64>,
    pub cell_min: i64,
    pub cell_max: i64,
    /// `None` while the condition follows the cell minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<i64>,
    pub ended: bool,
    #[serde(default)]
    pub loop_pairs: BTreeMap<usize, usize>,
    #[serde(default)]
    pub unmatched_loops: Vec<usize>,
}

impl Snapshot {
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Integer fields are type-checked the same way `EngineConfig::from_json` does.
    pub fn from_json(text: &str) -> EngineResult<Self> {
        let root: serde_json::Value = serde_json::from_str(text)?;
        EngineConfig::from_value(&root)?;
        Ok(serde_json::from_str(text)?)
    }

    /// The configuration that rebuilds this state.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            program: Some(self.program.clone()),
            memory_size: None,
            tape: Some(self.tape.clone()),
            cell_min: Some(self.cell_min),
            cell_max: Some(self.cell_max),
            condition_value: self.condition_value,
            default_value: self.default_value,
            instruction_pointer: Some(self.instruction_pointer),
            data_pointer: Some(self.data_pointer),
        }
    }
}
