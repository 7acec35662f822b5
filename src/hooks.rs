//! Notification and I/O surface between the engine and its host.
//!
//! Every method has a default, so a host only overrides what it displays.
//! Notifications are delivered in the order the engine mutates its state.

/// What the engine knows when it asks for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRequest {
    /// Position of the `,` being executed.
    pub instruction_pointer: usize,
    /// Cell that will receive the value.
    pub cell: usize,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReply {
    /// Value is available now; the step completes immediately.
    Value(i64),
    /// Host will answer later through `Engine::resolve_input`.
    Pending,
}

/// How to continue after the data pointer left the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRecovery {
    /// Abort the instruction with `EngineError::PointerOutOfRange`.
    Fail,
    /// Move to the nearest end of the tape and carry on.
    Clamp,
    /// Move to a specific cell and carry on.
    Relocate(usize),
}

pub trait Hooks {
    fn input(&mut self, request: &InputRequest) -> InputReply {
        InputReply::Value(request.min)
    }

    fn output(&mut self, _value: i64) {}

    fn instruction_pointer_changed(&mut self, _old: usize, _new: usize) {}

    fn data_pointer_changed(&mut self, _old: usize, _new: usize) {}

    fn data_pointer_underflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        PointerRecovery::Fail
    }

    fn data_pointer_overflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        PointerRecovery::Fail
    }

    fn program_ended(&mut self) {}

    /// `raw` is the value before wrapping, `wrapped` what was stored.
    fn cell_underflow(&mut self, _index: usize, _raw: i64, _wrapped: i64) {}

    fn cell_overflow(&mut self, _index: usize, _raw: i64, _wrapped: i64) {}

    fn cell_changed(&mut self, _index: usize, _old: i64, _new: i64) {}

    /// Fires on every explicit write, changed or not.
    fn cell_set(&mut self, _index: usize, _value: i64) {}
}

/// The default subscription.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl Hooks for NoHooks {}
