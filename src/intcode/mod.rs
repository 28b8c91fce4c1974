// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! The IntCode computer
//!
//! Memory is a sparse array of [`i64`], addressed from 0, holding both code and data. Each
//! instruction is an int whose last two digits are the [opcode](OpCode), and whose remaining
//! digits are the [parameter modes](ParamMode) of its parameters, least significant first.

mod internals;
mod mmu;
pub mod trace;

use crate::{InterpreterError, Machine, State, Status, StepOutcome};
use log::{debug, trace};
use mmu::IntcodeMem;
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::num::ParseIntError;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use std::sync::Arc;
use trace::Trace;

/// Parse comma-separated IntCode, as found in puzzle inputs
///
/// Whitespace around each int is ignored, and a blank string is an empty program.
///
/// ```
/// use machines::intcode::parse_program;
/// assert_eq!(parse_program("1,0, 0,0,99\n"), Ok(vec![1, 0, 0, 0, 99]));
/// assert!(parse_program("1,,2").is_err());
/// ```
pub fn parse_program(text: &str) -> Result<Vec<i64>, ParseIntError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(str::trim).map(str::parse).collect()
}

/// An IntCode interpreter, which provides optional [tracing](Interpreter::start_trace) of
/// instructions executed.
#[derive(Clone)]
pub struct Interpreter {
    index: i64,
    rel_offset: i64,
    code: IntcodeMem,
    program: Arc<[i64]>,
    inputs: VecDeque<i64>,
    outputs: VecDeque<i64>,
    status: Status,
    poisoned: bool,
    trace: Option<Trace>,
}

// ignore the trace field
impl PartialEq for Interpreter {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.rel_offset == other.rel_offset
            && self.code == other.code
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.status == other.status
            && self.poisoned == other.poisoned
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Interpreter")
            .field("code", &self.code)
            .field("rbo", &self.rel_offset)
            .field("ip", &self.index)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("status", &self.status)
            .field("poisoned", &self.poisoned)
            .field("tracing", &self.trace.is_some())
            .finish()
    }
}

/// Direct memory access.
///
/// # Panics
///
/// Panics on a negative address. Use [Interpreter::mem_get] for a fallible read.
impl Index<i64> for Interpreter {
    type Output = i64;

    fn index(&self, i: i64) -> &Self::Output {
        assert!(i >= 0, "negative address {i}");
        self.code.index(i)
    }
}

/// Direct memory access.
///
/// # Panics
///
/// Panics on a negative address. Use [Interpreter::mem_override] for a fallible write.
impl IndexMut<i64> for Interpreter {
    fn index_mut(&mut self, i: i64) -> &mut Self::Output {
        assert!(i >= 0, "negative address {i}");
        self.code.index_mut(i)
    }
}

/// Parameter mode for IntCode instruction
///
/// IntCode instruction parameters each have a mode: [positional], [immediate], or [relative].
///
/// When executing an IntCode instruction, the instruction's parameters are interpreted in
/// accordance with their associated modes.
///
/// [positional]: ParamMode::Positional
/// [immediate]: ParamMode::Immediate
/// [relative]: ParamMode::Relative
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ParamMode {
    /// Positional Mode
    ///
    /// A parameter in positional mode evaluates to the value at the address specified by the
    /// parameter.
    Positional = 0,
    /// Immediate Mode
    ///
    /// A parameter in immediate mode evaluates directly to the value specified. Instructions which
    /// write to memory may not use immediate mode for their destinations.
    #[doc(alias = "#")]
    Immediate = 1,
    /// Relative Mode
    ///
    /// A parameter in relative mode evaluates to the value at the address specified by the
    /// parameter, added to the [Relative Base], which starts out as `0` but can be modified
    /// throughout the program's execution.
    ///
    /// [Relative Base]: https://adventofcode.com/2019/day/9
    #[doc(alias = "@")]
    Relative = 2,
}

impl Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Positional => Ok(()),
            ParamMode::Immediate => write!(f, "#"),
            ParamMode::Relative => write!(f, "@"),
        }
    }
}

impl TryFrom<i64> for ParamMode {
    type Error = InterpreterError;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            0 => Ok(ParamMode::Positional),
            1 => Ok(ParamMode::Immediate),
            2 => Ok(ParamMode::Relative),
            _ => Err(InterpreterError::UnknownMode(i)),
        }
    }
}

impl ParamMode {
    /// Extract the modes of all three parameter slots from an instruction int.
    ///
    /// Digits above the ten thousands' place are ignored.
    pub fn extract(op: i64) -> Result<[Self; 3], InterpreterError> {
        Ok([
            ((op / 100) % 10).try_into()?,   // C (hundreds place)
            ((op / 1000) % 10).try_into()?,  // B (thousands place)
            ((op / 10000) % 10).try_into()?, // A (ten thousands place)
        ])
    }
}

/// An IntCode opcode
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs, reason = "trivial")]
pub enum OpCode {
    Add = 1,
    Mul = 2,
    In = 3,
    Out = 4,
    Jnz = 5,
    Jz = 6,
    Lt = 7,
    Eq = 8,
    Rbo = 9,
    Halt = 99,
}

impl OpCode {
    /// Number of parameters that follow the instruction int
    pub const fn param_count(self) -> usize {
        match self {
            OpCode::Add | OpCode::Mul | OpCode::Lt | OpCode::Eq => 3,
            OpCode::Jnz | OpCode::Jz => 2,
            OpCode::In | OpCode::Out | OpCode::Rbo => 1,
            OpCode::Halt => 0,
        }
    }
}

impl TryFrom<i64> for OpCode {
    type Error = i64;
    fn try_from(i: i64) -> Result<Self, Self::Error> {
        match i {
            1 => Ok(OpCode::Add),
            2 => Ok(OpCode::Mul),
            3 => Ok(OpCode::In),
            4 => Ok(OpCode::Out),
            5 => Ok(OpCode::Jnz),
            6 => Ok(OpCode::Jz),
            7 => Ok(OpCode::Lt),
            8 => Ok(OpCode::Eq),
            9 => Ok(OpCode::Rbo),
            99 => Ok(OpCode::Halt),
            i => Err(i),
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpCode::Add => "ADD",
            OpCode::Mul => "MUL",
            OpCode::In => "IN",
            OpCode::Out => "OUT",
            OpCode::Jnz => "JNZ",
            OpCode::Jz => "JZ",
            OpCode::Lt => "LT",
            OpCode::Eq => "EQ",
            OpCode::Rbo => "RBO",
            OpCode::Halt => "HALT",
        })
    }
}

impl FromStr for Interpreter {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_program(s).map(Self::new)
    }
}

impl Interpreter {
    /// Create a new interpreter. Collects `code` into the starting memory state, which
    /// [reset](Machine::reset) returns to.
    pub fn new(code: impl IntoIterator<Item = i64>) -> Self {
        let program: Arc<[i64]> = code.into_iter().collect();
        Self {
            index: 0,
            rel_offset: 0,
            code: program.iter().copied().collect(),
            program,
            inputs: VecDeque::new(),
            outputs: VecDeque::new(),
            status: Status::Ready,
            poisoned: false,
            trace: None,
        }
    }

    /// The instruction pointer
    pub fn instr_ptr(&self) -> i64 {
        self.index
    }

    /// The relative base used by [ParamMode::Relative] parameters
    pub fn rel_base(&self) -> i64 {
        self.rel_offset
    }

    /// Whether a previous error left this interpreter unusable until [reset](Machine::reset)
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The program this interpreter was created from
    pub fn program(&self) -> &[i64] {
        &self.program
    }

    /// Get the memory at `address`
    #[doc(alias = "peek")]
    pub fn mem_get(&self, address: i64) -> Result<i64, InterpreterError> {
        if address < 0 {
            Err(InterpreterError::NegativeMemAccess(address))
        } else {
            Ok(self.code[address])
        }
    }

    /// Manually set a memory location
    #[doc(alias("poke", "write"))]
    pub fn mem_override(&mut self, address: i64, value: i64) -> Result<(), InterpreterError> {
        if address < 0 {
            Err(InterpreterError::NegativeMemAccess(address))
        } else {
            self.code[address] = value;
            Ok(())
        }
    }

    /// Release memory pages that only hold zeroes
    pub fn shrink_memory(&mut self) {
        self.code.prune();
    }

    /// Execute a single instruction, returning whether the interpreter stopped.
    ///
    /// On error, the interpreter is poisoned: every later call returns
    /// [InterpreterError::Poisoned].
    pub fn exec_instruction(&mut self) -> Result<StepOutcome, InterpreterError> {
        if self.poisoned {
            return Err(InterpreterError::Poisoned);
        }
        if self.status == Status::Halted {
            return Err(InterpreterError::Halted);
        }

        let result = Self::fetch(self.index).and_then(|ip| {
            let op_int = self.code[ip];
            let (opcode, modes) = Self::parse_op(op_int)?;
            trace!(
                "ip: {:>8} | rbo: {:>5} | {op_int:05} {opcode}",
                self.index, self.rel_offset
            );
            let decoded = (op_int, opcode, modes);
            match opcode {
                OpCode::Add => self.op3(decoded, i64::wrapping_add),
                OpCode::Mul => self.op3(decoded, i64::wrapping_mul),
                OpCode::Lt => self.op3(decoded, |a, b| i64::from(a < b)),
                OpCode::Eq => self.op3(decoded, |a, b| i64::from(a == b)),
                OpCode::Jnz => self.jump(decoded, |v| v != 0),
                OpCode::Jz => self.jump(decoded, |v| v == 0),
                OpCode::In => self.input(decoded),
                OpCode::Out => self.output(decoded),
                OpCode::Rbo => self.adjust_base(decoded),
                OpCode::Halt => {
                    self.record(decoded, &[]);
                    Ok(StepOutcome::Stopped(State::Halted))
                }
            }
        });

        match result {
            Ok(outcome) => {
                self.status = match outcome {
                    StepOutcome::Running => Status::Running,
                    StepOutcome::Stopped(state) => {
                        debug!("intcode stopped at {}: {state:?}", self.index);
                        state.into()
                    }
                };
                Ok(outcome)
            }
            Err(e) => {
                debug!("intcode poisoned at {}: {e}", self.index);
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Push `inputs`, then execute until either the program halts, or it tries to read
    /// nonexistent input.
    ///
    /// Returns `Ok((v, s))`, where `v` is a [`Vec<i64>`] containing all outputs produced on the
    /// way, and `s` is the [`State`] at the time it stopped, which is never [State::Output].
    ///
    /// On error, it will return an [`InterpreterError`] that reflects the error.
    pub fn run_through_inputs(
        &mut self,
        inputs: impl IntoIterator<Item = i64>,
    ) -> Result<(Vec<i64>, State), InterpreterError> {
        self.extend_input(inputs);
        let mut outputs = Vec::new();
        loop {
            let state = self.run()?;
            outputs.extend(self.outputs.drain(..));
            if !matches!(state, State::Output(_)) {
                break Ok((outputs, state));
            }
        }
    }
}

impl Machine for Interpreter {
    fn step(&mut self) -> Result<StepOutcome, InterpreterError> {
        self.exec_instruction()
    }

    fn push(&mut self, value: i64) {
        self.inputs.push_back(value);
    }

    fn pop(&mut self) -> Option<i64> {
        self.outputs.pop_front()
    }

    fn pending_input(&self) -> usize {
        self.inputs.len()
    }

    fn status(&self) -> Status {
        self.status
    }

    fn reset(&mut self) {
        debug!("intcode reset");
        self.code = self.program.iter().copied().collect();
        self.index = 0;
        self.rel_offset = 0;
        self.inputs.clear();
        self.outputs.clear();
        self.status = Status::Ready;
        self.poisoned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::iter::empty;

    /// Example program from day 9, which takes no input and outputs its own code
    #[test]
    fn quine() {
        let quine_code = vec![
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];
        let mut interpreter = Interpreter::new(quine_code.clone());
        let (outputs, State::Halted) = interpreter.run_through_inputs(empty()).unwrap() else {
            panic!("Did not halt");
        };
        assert_eq!(quine_code, outputs);
    }

    /// Ensure that stopping due to missing input leaves the interpreter in a sane state that can
    /// be recovered from
    #[test]
    fn missing_input_recoverable() {
        let mut interpreter = Interpreter::new(vec![3, 10, 4, 10, 99]);

        assert_eq!(interpreter.run_through_inputs(empty()), Ok((vec![], State::Awaiting)));
        assert_eq!(interpreter.instr_ptr(), 0);
        assert_eq!(interpreter[10], 0);
        assert_eq!(interpreter.status(), Status::Awaiting);

        // asking again without input changes nothing
        assert_eq!(interpreter.step(), Ok(StepOutcome::Stopped(State::Awaiting)));
        assert_eq!(interpreter.instr_ptr(), 0);

        assert_eq!(
            interpreter.run_through_inputs([1]),
            Ok((vec![1], State::Halted))
        );
    }

    #[test]
    fn halt_only() {
        let mut interpreter = Interpreter::new([99]);
        let before = interpreter.clone();
        assert_eq!(interpreter.step(), Ok(StepOutcome::Stopped(State::Halted)));
        assert_eq!(interpreter.status(), Status::Halted);
        assert_eq!(interpreter.instr_ptr(), 0);
        assert_eq!(interpreter.code, before.code);
        assert_eq!(interpreter.pop(), None);
        assert_eq!(interpreter.step(), Err(InterpreterError::Halted));
    }

    #[test]
    fn output_suspends_after_advancing() {
        let mut interpreter = Interpreter::new([104, 7, 104, 8, 99]);
        assert_eq!(interpreter.run(), Ok(State::Output(7)));
        assert_eq!(interpreter.status(), Status::Yielded);
        assert_eq!(interpreter.instr_ptr(), 2);
        assert_eq!(interpreter.run(), Ok(State::Output(8)));
        assert_eq!(interpreter.drain_output(), vec![7, 8]);
        assert_eq!(interpreter.run(), Ok(State::Halted));
    }

    #[test]
    fn arithmetic_and_comparison_width() {
        for (a, b) in [(3, 4), (-7, 2), (0, 0), (12, 12)] {
            for (op, expected) in [
                (1101, a + b),
                (1102, a * b),
                (1107, i64::from(a < b)),
                (1108, i64::from(a == b)),
            ] {
                let mut interp = Interpreter::new([op, a, b, 5, 99, -1]);
                assert_eq!(interp.step(), Ok(StepOutcome::Running));
                assert_eq!(interp.instr_ptr(), 4);
                assert_eq!(interp[5], expected);
            }
        }
    }

    #[test]
    fn relative_base_offsets_addresses() {
        // RBO #2000, ADD #3, #4, @5, OUT @5, HALT
        let mut interp = Interpreter::new([109, 2000, 21101, 3, 4, 5, 204, 5, 99]);
        let (outputs, state) = interp.run_through_inputs(empty()).unwrap();
        assert_eq!((outputs, state), (vec![7], State::Halted));
        assert_eq!(interp.rel_base(), 2000);
        assert_eq!(interp[2005], 7);
        assert_eq!(interp[5], 5);
    }

    #[test]
    fn errors_poison() {
        macro_rules! fails_with {
            ([$($code: expr),*], $err: expr) => {{
                let mut interp = Interpreter::new([$($code),*]);
                assert_eq!(interp.run_through_inputs(empty()), Err($err));
                assert!(interp.is_poisoned());
                assert_eq!(interp.step(), Err(InterpreterError::Poisoned));
                interp.reset();
                assert!(!interp.is_poisoned());
            }};
        }
        fails_with!([4, -1, 99], InterpreterError::NegativeMemAccess(-1));
        fails_with!([109, -10, 204, 5, 99], InterpreterError::NegativeMemAccess(-5));
        fails_with!([1, 0, 0, -3, 99], InterpreterError::NegativeMemAccess(-3));
        fails_with!([98], InterpreterError::UnrecognizedOpcode(98));
        fails_with!([-1], InterpreterError::UnrecognizedOpcode(-1));
        fails_with!([304, 1, 99], InterpreterError::UnknownMode(3));
        fails_with!([11101, 1, 1, 1, 99], InterpreterError::WriteToImmediate(1));
        fails_with!([1105, 1, -4], InterpreterError::JumpToNegative(-4));
    }

    #[test]
    fn end_of_address_space() {
        // the add at the top of memory has nowhere to read its parameters from
        let mut interp = Interpreter::new([1101, 1, 0, i64::MAX, 1105, 1, i64::MAX]);
        assert_eq!(interp.run(), Err(InterpreterError::NegativeMemAccess(i64::MIN)));
        assert!(interp.is_poisoned());

        // an output just below it runs, then the pointer has nowhere to go
        let mut interp = Interpreter::new([1101, 4, 0, i64::MAX - 1, 1105, 1, i64::MAX - 1]);
        assert_eq!(interp.run(), Ok(State::Output(1101)));
        assert_eq!(interp.instr_ptr(), i64::MIN);
        assert_eq!(interp.run(), Err(InterpreterError::NegativeMemAccess(i64::MIN)));
    }

    #[test]
    fn reset_restores_program() {
        let code = [3, 9, 1001, 9, 5, 9, 4, 9, 99, 0];
        let fresh = Interpreter::new(code);
        let mut interp = fresh.clone();
        let first = interp.run_through_inputs([10]).unwrap();
        assert_eq!(first, (vec![15], State::Halted));
        assert_ne!(interp, fresh);

        interp.reset();
        assert_eq!(interp, fresh);
        assert_eq!(interp.run_through_inputs([10]).unwrap(), first);
    }

    #[test]
    fn parse_from_str() {
        let interp: Interpreter = " 1,9,10,3,2,3,11,0,99,30,40,50\n".parse().unwrap();
        assert_eq!(interp.program(), [1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
        assert!("1,2,x".parse::<Interpreter>().is_err());
    }
}
