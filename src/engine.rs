use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::cell::{CellEvent, WrapDirection};
use crate::config::EngineConfig;
use crate::errors::{ensure_in_range, ensure_min_max, EngineError, EngineResult};
use crate::hooks::{Hooks, InputReply, InputRequest, NoHooks, PointerRecovery};
use crate::loops::LoopMap;
use crate::snapshot::Snapshot;
use crate::tape::{ensure_memory_size, Tape};

pub const DEFAULT_CELL_MIN: i64 = 0;
pub const DEFAULT_CELL_MAX: i64 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Program loaded or reconfigured, nothing executed since.
    Ready,
    Running,
    /// A `,` is waiting for `Engine::resolve_input`.
    Suspended,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More instructions remain.
    Continue,
    AwaitingInput(InputRequest),
    Ended,
}

/// Step-wise interpreter over a bounded, wrapping tape.
#[derive(Clone)]
pub struct Engine {
    code: Vec<char>,
    loops: LoopMap,
    tape: Tape,
    pc: usize,
    ptr: usize,
    condition: Option<i64>,
    default_value: Option<i64>,
    started: bool,
    pending: Option<InputRequest>,
    hooks: Rc<RefCell<dyn Hooks>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pc", &self.pc)
            .field("ptr", &self.ptr)
            .field("code_len", &self.code.len())
            .field("memory_size", &self.tape.len())
            .field("cell_bounds", &(self.tape.min(), self.tape.max()))
            .field("condition", &self.condition_value())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Builds an engine. Either `memory_size` or `tape` must be given.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        if config.memory_size.is_none() && config.tape.is_none() {
            return Err(EngineError::MissingConfiguration("memory size or initial tape"));
        }
        let min = config.cell_min.unwrap_or(DEFAULT_CELL_MIN);
        let max = config.cell_max.unwrap_or(DEFAULT_CELL_MAX);
        let fill = config.default_value.unwrap_or(min);
        let mut engine = Engine {
            code: Vec::new(),
            loops: LoopMap::default(),
            tape: Tape::new(1, fill, min, max)?,
            pc: 0,
            ptr: 0,
            condition: None,
            default_value: None,
            started: false,
            pending: None,
            hooks: Rc::new(RefCell::new(NoHooks)),
        };
        engine.configure(config)?;
        Ok(engine)
    }

    pub fn restore(snapshot: &Snapshot) -> EngineResult<Self> {
        Self::new(snapshot.config())
    }

    /// Replaces the whole subscription.
    pub fn subscribe(&mut self, hooks: Rc<RefCell<dyn Hooks>>) {
        self.hooks = hooks;
    }

    /// Value copy of the engine. With `include_hooks` the copy shares this
    /// engine's subscription, otherwise it starts with none.
    pub fn duplicate(&self, include_hooks: bool) -> Engine {
        let mut copy = self.clone();
        if !include_hooks {
            copy.hooks = Rc::new(RefCell::new(NoHooks));
        }
        copy
    }

    /// Applies a partial reconfiguration.
    ///
    /// Everything is validated before anything is committed. Pointers keep
    /// their values unless the config sets them, and a pending input request
    /// is dropped.
    pub fn configure(&mut self, config: EngineConfig) -> EngineResult<()> {
        let min = config.cell_min.unwrap_or(self.tape.min());
        let max = config.cell_max.unwrap_or(self.tape.max());
        ensure_min_max(min, max)?;

        let condition = config.condition_value.or(self.condition);
        if let Some(c) = condition {
            ensure_in_range("condition value", c, min, max)?;
        }
        let default_value = config.default_value.or(self.default_value);
        if let Some(d) = default_value {
            ensure_in_range("default value", d, min, max)?;
        }
        if let Some(values) = &config.tape {
            ensure_memory_size(values.len())?;
        }
        if let Some(size) = config.memory_size {
            ensure_memory_size(size)?;
        }

        let new_len = config
            .memory_size
            .or(config.tape.as_ref().map(Vec::len))
            .unwrap_or(self.tape.len());
        let requested_ptr = config.data_pointer.unwrap_or(self.ptr);
        let ptr = self.recover_pointer(requested_ptr as i64, new_len)?;

        // validated; commit
        self.abandon_input();
        let was_ended = self.is_ended();

        match config.tape {
            Some(values) => self.tape = Tape::from_values(&values, min, max)?,
            None if (min, max) != (self.tape.min(), self.tape.max()) => {
                let events = self.tape.set_bounds(min, max)?;
                for (index, event) in &events {
                    self.emit_cell_event(*index, event);
                }
            }
            None => {}
        }
        self.condition = condition;
        self.default_value = default_value;
        if new_len != self.tape.len() {
            self.tape.resize(new_len, default_value.unwrap_or(min))?;
        }

        if let Some(program) = config.program {
            self.replace_program(&program);
        }
        self.started = false;

        debug!(
            memory_size = self.tape.len(),
            min,
            max,
            condition = self.condition_value(),
            "engine configured"
        );

        self.move_data_pointer_to(ptr);
        if let Some(pc) = config.instruction_pointer {
            self.move_instruction_pointer_to(pc);
        }
        self.settle(was_ended);
        Ok(())
    }

    /// Replaces the program, keeping both pointers where they are.
    pub fn load_program(&mut self, program: &str) {
        self.abandon_input();
        let was_ended = self.is_ended();
        self.replace_program(program);
        self.started = false;
        self.settle(was_ended);
    }

    pub fn set_memory_size(&mut self, size: usize) -> EngineResult<()> {
        self.configure(EngineConfig::new().memory_size(size))
    }

    pub fn set_cell_bounds(&mut self, min: i64, max: i64) -> EngineResult<()> {
        self.configure(EngineConfig::new().cell_bounds(min, max))
    }

    pub fn set_condition_value(&mut self, value: i64) -> EngineResult<()> {
        self.configure(EngineConfig::new().condition_value(value))
    }

    pub fn set_instruction_pointer(&mut self, pc: usize) {
        self.abandon_input();
        self.started = false;
        self.advance(pc);
    }

    /// Out-of-range values go through the pointer handlers, as during execution.
    pub fn set_data_pointer(&mut self, ptr: i64) -> EngineResult<()> {
        let target = self.recover_pointer(ptr, self.tape.len())?;
        self.abandon_input();
        self.started = false;
        self.move_data_pointer_to(target);
        Ok(())
    }

    /// Both pointers back to zero. Tape contents are kept.
    pub fn reset(&mut self) {
        self.abandon_input();
        self.started = false;
        self.move_data_pointer_to(0);
        self.advance(0);
    }

    pub fn set_cell(&mut self, index: usize, value: i64) -> EngineResult<()> {
        let event = self.tape.set(index, value)?;
        self.emit_cell_event(index, &event);
        Ok(())
    }

    pub fn set_current_cell(&mut self, value: i64) -> EngineResult<()> {
        self.set_cell(self.ptr, value)
    }

    /// Writes `value` to every cell.
    pub fn fill(&mut self, value: i64) {
        for (index, event) in self.tape.fill(value) {
            self.emit_cell_event(index, &event);
        }
    }

    pub fn program(&self) -> String {
        self.code.iter().collect()
    }

    pub fn instruction_pointer(&self) -> usize {
        self.pc
    }

    pub fn data_pointer(&self) -> usize {
        self.ptr
    }

    pub fn memory_size(&self) -> usize {
        self.tape.len()
    }

    /// Copy of the tape contents.
    pub fn tape(&self) -> Vec<i64> {
        self.tape.values()
    }

    pub fn cell(&self, index: usize) -> Option<i64> {
        self.tape.get(index)
    }

    pub fn current_cell(&self) -> i64 {
        self.tape.get(self.ptr).unwrap_or(self.tape.min())
    }

    pub fn cell_min(&self) -> i64 {
        self.tape.min()
    }

    pub fn cell_max(&self) -> i64 {
        self.tape.max()
    }

    pub fn condition_value(&self) -> i64 {
        self.condition.unwrap_or(self.tape.min())
    }

    pub fn default_value(&self) -> i64 {
        self.default_value.unwrap_or(self.tape.min())
    }

    pub fn loop_pairs(&self) -> BTreeMap<usize, usize> {
        self.loops.pairs().clone()
    }

    pub fn unmatched_loops(&self) -> Vec<usize> {
        self.loops.unmatched().to_vec()
    }

    pub fn is_ended(&self) -> bool {
        self.pc >= self.code.len()
    }

    pub fn pending_input(&self) -> Option<InputRequest> {
        self.pending
    }

    pub fn state(&self) -> EngineState {
        if self.pending.is_some() {
            EngineState::Suspended
        } else if self.is_ended() {
            EngineState::Ended
        } else if self.started {
            EngineState::Running
        } else {
            EngineState::Ready
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            program: self.program(),
            instruction_pointer: self.pc,
            data_pointer: self.ptr,
            tape: self.tape(),
            cell_min: self.tape.min(),
            cell_max: self.tape.max(),
            condition_value: self.condition,
            default_value: self.default_value,
            ended: self.is_ended(),
            loop_pairs: self.loop_pairs(),
            unmatched_loops: self.unmatched_loops(),
        }
    }

    /// Executes one instruction.
    ///
    /// On error nothing from the failing instruction is committed and the
    /// instruction pointer stays on it. While suspended this returns the
    /// pending request again without side effects.
    pub fn step(&mut self) -> EngineResult<StepOutcome> {
        if let Some(request) = self.pending {
            return Ok(StepOutcome::AwaitingInput(request));
        }
        if self.is_ended() {
            return Ok(StepOutcome::Ended);
        }
        self.started = true;

        let pc = self.pc;
        let instruction = self.code[pc];
        trace!(pc, %instruction, ptr = self.ptr, cell = self.current_cell(), "step");

        let next = match instruction {
            '+' => {
                self.offset_current(1);
                pc + 1
            }
            '-' => {
                self.offset_current(-1);
                pc + 1
            }
            '>' => {
                let target = self.recover_pointer(self.ptr as i64 + 1, self.tape.len())?;
                self.move_data_pointer_to(target);
                pc + 1
            }
            '<' => {
                let target = self.recover_pointer(self.ptr as i64 - 1, self.tape.len())?;
                self.move_data_pointer_to(target);
                pc + 1
            }
            '.' => {
                let value = self.current_cell();
                self.hooks.borrow_mut().output(value);
                pc + 1
            }
            ',' => {
                let request = InputRequest {
                    instruction_pointer: pc,
                    cell: self.ptr,
                    min: self.tape.min(),
                    max: self.tape.max(),
                };
                let reply = self.hooks.borrow_mut().input(&request);
                match reply {
                    InputReply::Value(value) => {
                        self.set_cell(self.ptr, value)?;
                        pc + 1
                    }
                    InputReply::Pending => {
                        debug!(pc, cell = self.ptr, "suspended on input");
                        self.pending = Some(request);
                        return Ok(StepOutcome::AwaitingInput(request));
                    }
                }
            }
            // an unmatched bracket is a no-op
            '[' => match self.loops.partner(pc) {
                Some(tail) if self.current_cell() == self.condition_value() => tail + 1,
                _ => pc + 1,
            },
            ']' => match self.loops.partner(pc) {
                Some(head) if self.current_cell() != self.condition_value() => head + 1,
                _ => pc + 1,
            },
            _ => pc + 1, // Ignore other characters
        };

        self.advance(next);
        Ok(self.outcome())
    }

    /// Supplies the value for a suspended `,` and completes that step.
    pub fn resolve_input(&mut self, value: i64) -> EngineResult<StepOutcome> {
        let request = self.pending.ok_or(EngineError::NoPendingInput)?;
        self.set_cell(request.cell, value)?;
        self.pending = None;
        debug!(pc = request.instruction_pointer, value, "input resolved");
        self.advance(request.instruction_pointer + 1);
        Ok(self.outcome())
    }

    /// Drops a pending input request; the `,` will ask again on the next step.
    pub fn abandon_input(&mut self) -> Option<InputRequest> {
        let request = self.pending.take();
        if let Some(request) = &request {
            debug!(pc = request.instruction_pointer, "pending input abandoned");
        }
        request
    }

    /// Steps until the program ends or input is awaited. Call again after
    /// `resolve_input` to carry on.
    pub fn run_to_end(&mut self) -> EngineResult<StepOutcome> {
        loop {
            match self.step()? {
                StepOutcome::Continue => {}
                outcome => return Ok(outcome),
            }
        }
    }

    /// Like `run_to_end` but gives up after `max_steps`, returning `Continue`.
    pub fn run_for(&mut self, max_steps: u64) -> EngineResult<StepOutcome> {
        for _ in 0..max_steps {
            match self.step()? {
                StepOutcome::Continue => {}
                outcome => return Ok(outcome),
            }
        }
        Ok(self.outcome())
    }

    fn outcome(&self) -> StepOutcome {
        match self.pending {
            Some(request) => StepOutcome::AwaitingInput(request),
            None if self.is_ended() => StepOutcome::Ended,
            None => StepOutcome::Continue,
        }
    }

    fn replace_program(&mut self, program: &str) {
        self.code = program.chars().collect();
        self.loops = LoopMap::build(&self.code);
        debug!(
            len = self.code.len(),
            unmatched = self.loops.unmatched().len(),
            "program loaded"
        );
    }

    fn offset_current(&mut self, delta: i64) {
        let event = self.tape.offset(self.ptr, delta);
        if let Some(event) = event {
            self.emit_cell_event(self.ptr, &event);
        }
    }

    /// Maps a candidate pointer onto the tape, consulting the handlers when
    /// it falls off either end.
    fn recover_pointer(&self, pointer: i64, len: usize) -> EngineResult<usize> {
        if pointer >= 0 && (pointer as usize) < len {
            return Ok(pointer as usize);
        }
        let recovery = if pointer < 0 {
            self.hooks.borrow_mut().data_pointer_underflow(pointer, len)
        } else {
            self.hooks.borrow_mut().data_pointer_overflow(pointer, len)
        };
        let target = match recovery {
            PointerRecovery::Fail => {
                return Err(EngineError::PointerOutOfRange { pointer, size: len })
            }
            PointerRecovery::Clamp if pointer < 0 => 0,
            PointerRecovery::Clamp => len - 1,
            PointerRecovery::Relocate(target) if target < len => target,
            PointerRecovery::Relocate(target) => {
                return Err(EngineError::PointerOutOfRange {
                    pointer: target as i64,
                    size: len,
                })
            }
        };
        warn!(pointer, target, len, "data pointer recovered");
        Ok(target)
    }

    fn move_data_pointer_to(&mut self, ptr: usize) {
        let old = self.ptr;
        self.ptr = ptr;
        if old != ptr {
            self.hooks.borrow_mut().data_pointer_changed(old, ptr);
        }
    }

    fn advance(&mut self, pc: usize) {
        let was_ended = self.is_ended();
        self.move_instruction_pointer_to(pc);
        self.settle(was_ended);
    }

    fn move_instruction_pointer_to(&mut self, pc: usize) {
        let old = self.pc;
        self.pc = pc;
        if old != pc {
            self.hooks.borrow_mut().instruction_pointer_changed(old, pc);
        }
    }

    // fires program_ended once per transition into the ended state
    fn settle(&mut self, was_ended: bool) {
        if !was_ended && self.is_ended() {
            debug!(pc = self.pc, "program ended");
            self.hooks.borrow_mut().program_ended();
        }
    }

    fn emit_cell_event(&self, index: usize, event: &CellEvent) {
        let mut hooks = self.hooks.borrow_mut();
        match event.wrap_direction() {
            Some(WrapDirection::Underflow) => hooks.cell_underflow(index, event.raw, event.current),
            Some(WrapDirection::Overflow) => hooks.cell_overflow(index, event.raw, event.current),
            None => {}
        }
        if event.changed() {
            hooks.cell_changed(index, event.previous, event.current);
        }
        if event.assigned {
            hooks.cell_set(index, event.current);
        }
    }
}
