use anyhow::Context;
use bf_stepper::errors::{parse_int, Result};
use bf_stepper::{Engine, EngineConfig, Hooks, InputReply, InputRequest, PointerRecovery, StepOutcome};
use clap::Parser;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "bf_stepper")]
#[command(about = "Run or step through a brainfuck program")]
struct Cli {
    /// Program file
    file: PathBuf,

    #[arg(long, default_value = "30000")]
    memory_size: usize,

    /// Initial tape contents, comma separated
    #[arg(long)]
    tape: Option<String>,

    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    min: i64,

    #[arg(long, default_value = "255", allow_hyphen_values = true)]
    max: i64,

    /// Cell value that skips `[` and exits `]` (defaults to --min)
    #[arg(long, allow_hyphen_values = true)]
    condition: Option<i64>,

    /// Keep the data pointer on the tape instead of failing
    #[arg(long)]
    clamp: bool,

    /// Print the machine state after every instruction
    #[arg(long)]
    step: bool,

    /// Print the first N cells when the program ends
    #[arg(long)]
    dump: Option<usize>,
}

struct Console {
    clamp: bool,
}

impl Hooks for Console {
    fn input(&mut self, _request: &InputRequest) -> InputReply {
        // answered from the main loop so stdout can be flushed first
        InputReply::Pending
    }

    fn output(&mut self, value: i64) {
        let c = u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        print!("{}", c);
    }

    fn data_pointer_underflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        self.policy()
    }

    fn data_pointer_overflow(&mut self, _pointer: i64, _tape_len: usize) -> PointerRecovery {
        self.policy()
    }
}

impl Console {
    fn policy(&self) -> PointerRecovery {
        if self.clamp {
            PointerRecovery::Clamp
        } else {
            PointerRecovery::Fail
        }
    }
}

fn parse_tape(text: &str) -> Result<Vec<i64>> {
    let values = text
        .split(',')
        .enumerate()
        .map(|(i, part)| parse_int(&format!("tape[{}]", i), part))
        .collect::<bf_stepper::EngineResult<Vec<_>>>()?;
    Ok(values)
}

/// One byte from stdin, or the cell minimum at end of input.
fn read_input(request: &InputRequest) -> Result<i64> {
    io::stdout().flush().context("Failed to flush output")?;
    let mut buf = [0u8; 1];
    let n = io::stdin().read(&mut buf).context("Failed to read input")?;
    Ok(if n == 0 { request.min } else { buf[0] as i64 })
}

fn feed_input(engine: &mut Engine, request: &InputRequest, value: i64) -> Result<()> {
    engine.resolve_input(value).with_context(|| {
        format!(
            "Failed to store input at instruction {}",
            request.instruction_pointer
        )
    })?;
    Ok(())
}

fn print_state(engine: &Engine) {
    eprintln!(
        "ip={} dp={} cell={} state={:?}",
        engine.instruction_pointer(),
        engine.data_pointer(),
        engine.current_cell(),
        engine.state()
    );
}

fn run(cli: &Cli) -> Result<()> {
    let code = fs::read_to_string(&cli.file)
        .with_context(|| format!("Error reading file {}", cli.file.display()))?;

    let mut config = EngineConfig::new()
        .program(code)
        .memory_size(cli.memory_size)
        .cell_bounds(cli.min, cli.max);
    if let Some(text) = &cli.tape {
        config = config.tape(parse_tape(text)?);
    }
    if let Some(condition) = cli.condition {
        config = config.condition_value(condition);
    }

    let mut engine = Engine::new(config).context("Invalid configuration")?;
    engine.subscribe(Rc::new(RefCell::new(Console { clamp: cli.clamp })));

    let unmatched = engine.unmatched_loops();
    if !unmatched.is_empty() {
        warn!(?unmatched, "unmatched brackets will be skipped");
    }

    loop {
        let outcome = if cli.step {
            let outcome = engine.step();
            print_state(&engine);
            outcome
        } else {
            engine.run_to_end()
        };
        let outcome = outcome.with_context(|| {
            format!(
                "Failed at instruction {} (data pointer {})",
                engine.instruction_pointer(),
                engine.data_pointer()
            )
        })?;

        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::AwaitingInput(request) => {
                let value = read_input(&request)?;
                feed_input(&mut engine, &request, value)?;
                if cli.step {
                    print_state(&engine);
                }
            }
            StepOutcome::Ended => break,
        }
    }
    io::stdout().flush().context("Failed to flush output")?;

    if let Some(n) = cli.dump {
        let tape = engine.tape();
        eprintln!("\ncells: {:?}", &tape[..n.min(tape.len())]);
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bf_stepper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("\nError running program: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_feed_input_completes_the_read() {
        let mut engine = Engine::new(EngineConfig::new().program(",.").memory_size(1)).unwrap();
        engine.subscribe(Rc::new(RefCell::new(Console { clamp: false })));
        let request = match engine.step().unwrap() {
            StepOutcome::AwaitingInput(request) => request,
            other => panic!("Expected AwaitingInput, got: {:?}", other),
        };
        feed_input(&mut engine, &request, 7).unwrap();
        assert_eq!(engine.current_cell(), 7);
        assert_eq!(engine.instruction_pointer(), 1);

        let err = feed_input(&mut engine, &request, 7).unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "Failed to store input at instruction 0: No input request is pending"
        );
    }

    #[test]
    fn test_parse_tape() {
        assert_eq!(parse_tape("1, -2,3").unwrap(), vec![1, -2, 3]);
        assert!(parse_tape("1,x").is_err());
    }
}
