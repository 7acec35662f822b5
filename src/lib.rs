pub mod cell;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hooks;
pub mod loops;
pub mod snapshot;
pub mod tape;

pub use cell::{wrap, BoundedCell, CellEvent, WrapDirection};
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, StepOutcome};
pub use errors::{EngineError, EngineResult, Violation};
pub use hooks::{Hooks, InputReply, InputRequest, NoHooks, PointerRecovery};
pub use loops::LoopMap;
pub use snapshot::Snapshot;
pub use tape::{Tape, MAX_MEMORY_SIZE};
