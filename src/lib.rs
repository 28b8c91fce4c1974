// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD
#![warn(missing_docs)]

//! Interpreters for the small virtual machines of Advent of Code
//!
//! Two machines are provided, both driven through the [Machine] trait:
//!
//! * [Interpreter], the [IntCode] computer as completed in [2019 Day 9], with all of its
//!   [Opcodes] and [Parameter Modes].
//! * [RegisterMachine], a fixed-register machine running mnemonic programs in one of several
//!   [dialects](regvm::Dialect): assembunny (2016), duet (2017) and the "WristCalc" device
//!   language (2018).
//!
//! # Example
//!
//! ```rust
//! use machines::prelude::*;
//! let mut interpreter = Interpreter::new(vec![104, 1024, 99]);
//!
//! assert_eq!(
//!     interpreter.run_through_inputs(empty()).unwrap(),
//!     (vec![1024], State::Halted)
//! );
//! ```
//!
//! Register machines are loaded from source text:
//!
//! ```rust
//! use machines::prelude::*;
//! use machines::regvm::parse;
//!
//! let config = Config::new(Dialect::Assembunny);
//! let program = parse("cpy 41 a\ninc a\ninc a\ndec a\njnz a 2\ndec a\n", &config).unwrap();
//! let mut machine = RegisterMachine::new(program, config);
//!
//! assert_eq!(machine.run().unwrap(), State::Halted);
//! assert_eq!(machine.register('a'), Some(42));
//! ```
//!
//! Both machines suspend instead of blocking: [State::Awaiting] when an input instruction finds
//! the input queue empty, and [State::Output] right after a value is produced. Several machines
//! can be wired together with a [ring::Ring].
//!
//! [Interpreter]: intcode::Interpreter
//! [RegisterMachine]: regvm::RegisterMachine
//! [IntCode]: https://esolangs.org/wiki/Intcode
//! [Opcodes]: https://esolangs.org/wiki/Intcode#Opcodes
//! [Parameter Modes]: https://esolangs.org/wiki/Intcode#Parameter_Modes
//! [2019 Day 9]: https://adventofcode.com/2019/day/9

pub mod intcode;
pub mod regvm;
pub mod ring;

use std::error::Error;
use std::fmt::{self, Display};

/// A small module that re-exports items needed when driving the machines
pub mod prelude {
    pub use crate::intcode::Interpreter;
    pub use crate::regvm::{Config, Dialect, RegisterMachine};
    pub use crate::{Machine, State, Status, StepOutcome};
    pub use std::iter::empty;
}

/// The reason a machine stopped running.
///
/// [Awaiting](State::Awaiting) means that the next instruction needs input and the input queue is
/// empty. The instruction pointer has not moved, so the same instruction runs again once input is
/// [pushed](Machine::push).
///
/// [Output](State::Output) means that a value was just appended to the output queue. The pointer
/// has already advanced past the output instruction.
///
/// [Halted](State::Halted) means that the program finished. Once it's been returned, no more
/// instructions will be executed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// Execution is awaiting input
    Awaiting,
    /// Execution produced the contained value, which is also at the back of the output queue
    Output(i64),
    /// Execution has halted
    Halted,
}

/// The result of executing a single instruction
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepOutcome {
    /// The instruction ran and the machine can keep going
    Running,
    /// The machine stopped, for the contained reason
    Stopped(State),
}

/// Where a machine is in its lifecycle
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Status {
    /// Freshly created or reset, nothing executed yet
    #[default]
    Ready,
    /// At least one instruction ran and the last step did not stop the machine
    Running,
    /// Suspended on an input instruction with an empty input queue
    Awaiting,
    /// Suspended right after producing output
    Yielded,
    /// Terminal
    Halted,
}

impl From<State> for Status {
    fn from(state: State) -> Self {
        match state {
            State::Awaiting => Status::Awaiting,
            State::Output(_) => Status::Yielded,
            State::Halted => Status::Halted,
        }
    }
}

/// An error occured when executing an instruction
///
/// All of these are fatal: the machine that returned one is poisoned, and any further
/// [step](Machine::step) returns [InterpreterError::Poisoned] until it is [reset](Machine::reset).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum InterpreterError {
    /// An invalid IntCode opcode was encountered. Contains the whole instruction int.
    UnrecognizedOpcode(i64),
    /// An unknown IntCode parameter mode was encountered
    UnknownMode(i64),
    /// An address resolved to a negative value
    NegativeMemAccess(i64),
    /// An instruction tried to write to an immediate destination
    WriteToImmediate(i64),
    /// An IntCode jump instruction tried to jump to a negative address
    JumpToNegative(i64),
    /// A `mod` instruction at the contained pointer had a divisor of zero
    DivideByZero {
        /// instruction pointer of the failing instruction
        ip: i64,
    },
    /// No register has the given name in this machine
    UnknownRegister(char),
    /// An instruction's operands don't fit its opcode, and the machine is configured to fail on
    /// such instructions instead of skipping them
    InvalidInstruction {
        /// instruction pointer of the failing instruction
        ip: i64,
    },
    /// The machine was stepped after it halted
    Halted,
    /// The machine was stepped after a previous error
    Poisoned,
}

impl Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedOpcode(n) => write!(f, "encountered unrecognized opcode {n}"),
            Self::UnknownMode(mode) => write!(f, "encountered unknown parameter mode {mode}"),
            Self::NegativeMemAccess(n) => write!(f, "attempted to access negative address {n}"),
            Self::WriteToImmediate(i) => write!(f, "code attempted to write to immediate {i}"),
            Self::JumpToNegative(n) => write!(f, "attempted to jump to negative address {n}"),
            Self::DivideByZero { ip } => write!(f, "division by zero at instruction {ip}"),
            Self::UnknownRegister(c) => write!(f, "no register named {c:?}"),
            Self::InvalidInstruction { ip } => write!(f, "invalid instruction at {ip}"),
            Self::Halted => write!(f, "the machine has already halted"),
            Self::Poisoned => write!(f, "a previous error left the machine unusable"),
        }
    }
}

impl Error for InterpreterError {}

/// The driving API shared by every machine in this crate
///
/// Implementors provide single-stepping, the two I/O queues and reset. Running to the next
/// suspension point is built on top of [step](Machine::step).
pub trait Machine {
    /// Execute exactly one instruction
    fn step(&mut self) -> Result<StepOutcome, InterpreterError>;

    /// Append `value` to the back of the input queue
    fn push(&mut self, value: i64);

    /// Remove and return the oldest value in the output queue
    fn pop(&mut self) -> Option<i64>;

    /// Number of values waiting in the input queue
    fn pending_input(&self) -> usize;

    /// The machine's lifecycle status
    fn status(&self) -> Status;

    /// Restore the original program and initial state, clearing both queues
    fn reset(&mut self);

    /// Execute until the machine halts or suspends
    fn run(&mut self) -> Result<State, InterpreterError> {
        loop {
            if let StepOutcome::Stopped(state) = self.step()? {
                break Ok(state);
            }
        }
    }

    /// Like [run](Machine::run), but give up after `max_steps` instructions, returning `Ok(None)`.
    ///
    /// The machine is left intact when the budget runs out, so calling this again resumes it.
    fn run_bounded(&mut self, max_steps: usize) -> Result<Option<State>, InterpreterError> {
        for _ in 0..max_steps {
            if let StepOutcome::Stopped(state) = self.step()? {
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    /// Push every value from `values`, in order
    fn extend_input(&mut self, values: impl IntoIterator<Item = i64>)
    where
        Self: Sized,
    {
        values.into_iter().for_each(|v| self.push(v));
    }

    /// Pop everything in the output queue
    fn drain_output(&mut self) -> Vec<i64>
    where
        Self: Sized,
    {
        std::iter::from_fn(|| self.pop()).collect()
    }

    /// Whether the machine can't make progress until someone pushes input
    fn is_blocked(&self) -> bool {
        self.status() == Status::Awaiting && self.pending_input() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::regvm::parse;

    /// Collect everything both machines output for the same inputs, to check the trait
    /// behaves the same through either implementation
    fn echo_all(machine: &mut impl Machine, inputs: &[i64]) -> Vec<i64> {
        machine.extend_input(inputs.iter().copied());
        let mut outputs = Vec::new();
        loop {
            match machine.run().unwrap() {
                State::Output(v) => {
                    assert_eq!(machine.pop(), Some(v));
                    outputs.push(v);
                }
                State::Awaiting | State::Halted => break outputs,
            }
        }
    }

    #[test]
    fn echo_through_trait() {
        let inputs = [3, -1, 4, 1, -5];
        let mut intcode = Interpreter::new([3, 20, 4, 20, 1105, 1, 0]);
        let config = Config::new(Dialect::Duet);
        let program = parse("rcv a\nsnd a\njgz 1 -2\n", &config).unwrap();
        let mut duet = RegisterMachine::new(program, config);

        assert_eq!(echo_all(&mut intcode, &inputs), inputs);
        assert_eq!(echo_all(&mut duet, &inputs), inputs);
        assert!(intcode.is_blocked());
        assert!(duet.is_blocked());
    }

    #[test]
    fn bounded_run_resumes() {
        // loops forever: JNZ #1, #0
        let mut interp = Interpreter::new([1105, 1, 0]);
        assert_eq!(interp.run_bounded(1000), Ok(None));
        assert_eq!(interp.status(), Status::Running);
        assert_eq!(interp.run_bounded(10), Ok(None));
    }

    #[test]
    fn status_follows_state() {
        assert_eq!(Status::from(State::Output(3)), Status::Yielded);
        assert_eq!(Status::from(State::Awaiting), Status::Awaiting);
        assert_eq!(Status::from(State::Halted), Status::Halted);
    }
}
