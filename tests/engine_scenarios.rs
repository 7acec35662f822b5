use bf_stepper::{
    Engine, EngineConfig, EngineError, EngineState, Hooks, InputReply, InputRequest,
    PointerRecovery, Snapshot, StepOutcome,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

/// A host that answers input later and records what it sees.
#[derive(Default)]
struct Terminal {
    output: Vec<i64>,
    overflows: Vec<(i64, i64)>,
    changes: Vec<(i64, i64)>,
    requests: Vec<InputRequest>,
    ended: usize,
    clamp: bool,
}

impl Hooks for Terminal {
    fn input(&mut self, request: &InputRequest) -> InputReply {
        self.requests.push(*request);
        InputReply::Pending
    }

    fn output(&mut self, value: i64) {
        self.output.push(value);
    }

    fn data_pointer_underflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        if self.clamp {
            PointerRecovery::Clamp
        } else {
            PointerRecovery::Fail
        }
    }

    fn data_pointer_overflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        if self.clamp {
            PointerRecovery::Clamp
        } else {
            PointerRecovery::Fail
        }
    }

    fn program_ended(&mut self) {
        self.ended += 1;
    }

    fn cell_overflow(&mut self, _index: usize, raw: i64, wrapped: i64) {
        self.overflows.push((raw, wrapped));
    }

    fn cell_changed(&mut self, _index: usize, old: i64, new: i64) {
        self.changes.push((old, new));
    }
}

fn terminal_engine(config: EngineConfig) -> (Engine, Rc<RefCell<Terminal>>) {
    let terminal = Rc::new(RefCell::new(Terminal::default()));
    let mut engine = Engine::new(config).unwrap();
    engine.subscribe(terminal.clone());
    (engine, terminal)
}

#[test]
fn test_scenario_output_after_three_increments() {
    let (mut engine, terminal) = terminal_engine(
        EngineConfig::new()
            .program("+++.")
            .memory_size(1)
            .cell_bounds(0, 255)
            .condition_value(0),
    );
    for _ in 0..3 {
        assert_eq!(engine.step().unwrap(), StepOutcome::Continue);
    }
    assert_eq!(engine.current_cell(), 3);
    assert!(terminal.borrow().output.is_empty());

    assert_eq!(engine.step().unwrap(), StepOutcome::Ended);
    assert_eq!(terminal.borrow().output, vec![3]);
}

#[test]
fn test_scenario_loop_exits_on_condition() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program("+[-]").memory_size(1));

    engine.step().unwrap();
    assert_eq!(engine.current_cell(), 1);
    engine.step().unwrap();
    assert_eq!(engine.instruction_pointer(), 2);
    engine.step().unwrap();
    assert_eq!(engine.current_cell(), 0);
    assert_eq!(engine.step().unwrap(), StepOutcome::Ended);
    assert_eq!(engine.instruction_pointer(), 4);
    assert!(engine.is_ended());
    assert_eq!(terminal.borrow().ended, 1);
}

#[test]
fn test_scenario_cell_overflow() {
    let (mut engine, terminal) = terminal_engine(
        EngineConfig::new().program("+").tape(vec![255]).cell_bounds(0, 255),
    );
    engine.step().unwrap();
    assert_eq!(engine.current_cell(), 0);
    assert_eq!(terminal.borrow().overflows, vec![(256, 0)]);
    assert_eq!(terminal.borrow().changes, vec![(255, 0)]);
}

#[test]
fn test_scenario_pointer_overflow_default_policy() {
    let mut engine = Engine::new(EngineConfig::new().program(">").memory_size(8).data_pointer(7)).unwrap();
    match engine.step() {
        Err(EngineError::PointerOutOfRange { pointer, size }) => {
            assert_eq!((pointer, size), (8, 8));
        }
        other => panic!("Expected PointerOutOfRange, got: {:?}", other),
    }
    assert_eq!(engine.data_pointer(), 7);
}

#[test]
fn test_clamp_and_continue() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program("<<+>>>+").memory_size(2));
    terminal.borrow_mut().clamp = true;
    assert_eq!(engine.run_to_end().unwrap(), StepOutcome::Ended);
    assert_eq!(engine.tape(), vec![1, 1]);
    assert_eq!(engine.data_pointer(), 1);
}

#[test]
fn test_input_suspends_until_resolved() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program(",.").memory_size(1));

    let request = match engine.step().unwrap() {
        StepOutcome::AwaitingInput(request) => request,
        other => panic!("Expected AwaitingInput, got: {:?}", other),
    };
    assert_eq!(request.instruction_pointer, 0);
    assert_eq!(request.cell, 0);
    assert_eq!(engine.state(), EngineState::Suspended);
    assert_eq!(engine.instruction_pointer(), 0);

    // stepping again does not re-ask
    assert_eq!(engine.step().unwrap(), StepOutcome::AwaitingInput(request));
    assert_eq!(terminal.borrow().requests.len(), 1);

    assert_eq!(engine.resolve_input(65).unwrap(), StepOutcome::Continue);
    assert_eq!(engine.current_cell(), 65);
    assert_eq!(engine.instruction_pointer(), 1);
    assert_eq!(engine.state(), EngineState::Running);

    assert_eq!(engine.step().unwrap(), StepOutcome::Ended);
    assert_eq!(terminal.borrow().output, vec![65]);
}

#[test]
fn test_run_to_end_chains_suspensions() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program(",+.,+.").memory_size(1));
    let mut typed = "HI".chars();

    let mut outcome = engine.run_to_end().unwrap();
    while let StepOutcome::AwaitingInput(_) = outcome {
        let c = typed.next().unwrap();
        engine.resolve_input(c as i64).unwrap();
        outcome = engine.run_to_end().unwrap();
    }
    assert_eq!(outcome, StepOutcome::Ended);
    assert_eq!(terminal.borrow().output, vec!['I' as i64, 'J' as i64]);
    assert_eq!(terminal.borrow().requests.len(), 2);
}

#[test]
fn test_input_value_wraps() {
    let (mut engine, _) = terminal_engine(EngineConfig::new().program(",").memory_size(1).cell_bounds(0, 9));
    engine.step().unwrap();
    engine.resolve_input(-1).unwrap();
    assert_eq!(engine.current_cell(), 9);
}

#[test]
fn test_resolve_without_request() {
    let mut engine = Engine::new(EngineConfig::new().program(",").memory_size(1)).unwrap();
    assert!(matches!(engine.resolve_input(1), Err(EngineError::NoPendingInput)));
}

#[test]
fn test_default_input_is_cell_minimum() {
    let mut engine = Engine::new(
        EngineConfig::new().program("+,").memory_size(1).cell_bounds(-3, 3),
    )
    .unwrap();
    assert_eq!(engine.run_to_end().unwrap(), StepOutcome::Ended);
    assert_eq!(engine.current_cell(), -3);
}

#[test]
fn test_reset_abandons_pending_input() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program(",").memory_size(1));
    engine.step().unwrap();
    engine.reset();
    assert_eq!(engine.pending_input(), None);
    assert_eq!(engine.state(), EngineState::Ready);
    assert!(matches!(engine.step().unwrap(), StepOutcome::AwaitingInput(_)));
    assert_eq!(terminal.borrow().requests.len(), 2);
}

#[test]
fn test_duplicate_is_independent() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().program("+.+.").memory_size(2));
    engine.run_for(2).unwrap();

    let mut detached = engine.duplicate(false);
    let mut shared = engine.duplicate(true);
    detached.run_to_end().unwrap();
    assert_eq!(terminal.borrow().output, vec![1]);
    assert_eq!(detached.current_cell(), 2);
    assert_eq!(engine.current_cell(), 1);

    shared.run_to_end().unwrap();
    assert_eq!(terminal.borrow().output, vec![1, 2]);
    assert_eq!(engine.instruction_pointer(), 2);
}

#[test]
fn test_snapshot_restores_equivalent_engine() {
    let mut engine = Engine::new(
        EngineConfig::new()
            .program("++[>+<-]]")
            .memory_size(4)
            .cell_bounds(-8, 7)
            .condition_value(0),
    )
    .unwrap();
    engine.run_for(5).unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.unmatched_loops, vec![8]);
    assert_eq!(snapshot.loop_pairs.get(&2), Some(&7));

    let json = snapshot.to_json().unwrap();
    let mut restored = Engine::restore(&Snapshot::from_json(&json).unwrap()).unwrap();
    assert_eq!(restored.snapshot(), snapshot);

    engine.run_to_end().unwrap();
    restored.run_to_end().unwrap();
    assert_eq!(restored.tape(), engine.tape());
    assert_eq!(restored.tape(), vec![0, 2, 0, 0]);
}

#[test]
fn test_config_from_json() {
    let config = EngineConfig::from_json(r#"{"program": "-.", "memory_size": 3, "cell_min": -1, "cell_max": 1}"#).unwrap();
    let (mut engine, terminal) = terminal_engine(config);
    engine.run_to_end().unwrap();
    assert_eq!(terminal.borrow().output, vec![1]);
    assert_eq!(engine.condition_value(), -1);
}

#[test]
fn test_hello_world_with_comments() {
    let (mut engine, terminal) = terminal_engine(EngineConfig::new().memory_size(30000));
    engine.load_program(
        "print Hello World!
         ++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.",
    );
    assert_eq!(engine.run_to_end().unwrap(), StepOutcome::Ended);
    let text: String = terminal.borrow().output.iter().map(|&v| v as u8 as char).collect();
    assert_eq!(text, "Hello World!\n");
}

#[test]
fn test_restored_condition_keeps_following_minimum() {
    let mut engine = Engine::new(EngineConfig::new().program("+").memory_size(2)).unwrap();
    let mut restored = Engine::restore(&engine.snapshot()).unwrap();

    engine.set_cell_bounds(10, 20).unwrap();
    restored.set_cell_bounds(10, 20).unwrap();
    assert_eq!(restored.condition_value(), 10);
    assert_eq!(restored.condition_value(), engine.condition_value());

    // an explicit condition survives the round trip and still pins the bounds
    let mut pinned = Engine::new(
        EngineConfig::new().program("+").memory_size(2).condition_value(3),
    )
    .unwrap();
    let json = pinned.snapshot().to_json().unwrap();
    let mut restored = Engine::restore(&Snapshot::from_json(&json).unwrap()).unwrap();
    assert!(matches!(
        restored.set_cell_bounds(10, 20),
        Err(EngineError::ValueOutOfRange { field: "condition value", .. })
    ));
    assert!(pinned.set_cell_bounds(10, 20).is_err());
}
