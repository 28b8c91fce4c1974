// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Fixed-register machines running mnemonic programs
//!
//! The same machine runs three [dialects](Dialect), which differ in their instruction sets and
//! register names. Programs are loaded from text with [parse], then run by a [RegisterMachine].
//!
//! Code and data are separate: registers hold data, and the program is a list of [instructions]
//! that `tgl` can rewrite while it runs.
//!
//! [instructions]: Instr

mod fold;
mod instr;
mod parse;

pub use instr::{Instr, Op, Operand, Program};
pub use parse::parse;

use crate::{InterpreterError, Machine, State, Status, StepOutcome};
use fold::Fold;
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::sync::Arc;

/// An instruction set, along with its register naming scheme
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Dialect {
    /// Assembunny from [2016 Day 12], [Day 23] and [Day 25]. Registers are `a` through `d`, plus
    /// any other lowercase letter the program uses.
    ///
    /// [2016 Day 12]: https://adventofcode.com/2016/day/12
    /// [Day 23]: https://adventofcode.com/2016/day/23
    /// [Day 25]: https://adventofcode.com/2016/day/25
    Assembunny,
    /// The sound card language of [2017 Day 18], with `snd` and `rcv` sending and receiving
    /// values through the queues. Registers are `a` through `z`.
    ///
    /// [2017 Day 18]: https://adventofcode.com/2017/day/18
    Duet,
    /// The language of the wrist device from [2018 Day 16] and [Day 19]. Registers are numbered
    /// from `0` through `5`, and an `#ip` directive can bind one to the instruction pointer.
    ///
    /// [2018 Day 16]: https://adventofcode.com/2018/day/16
    /// [Day 19]: https://adventofcode.com/2018/day/19
    Wrist,
}

impl Dialect {
    /// Index of the register called `name`, however many registers there are. Registers are
    /// lettered from `a`, except in [Dialect::Wrist], where they are numbered from `0`.
    pub fn register_number(self, name: char) -> Option<usize> {
        match self {
            Dialect::Wrist => name.to_digit(10).map(|n| n as usize),
            Dialect::Assembunny | Dialect::Duet if name.is_ascii_lowercase() => {
                Some(usize::from(name as u8 - b'a'))
            }
            _ => None,
        }
    }

    /// Registers a machine has unless [configured](Config::with_registers) otherwise
    pub const fn default_registers(self) -> usize {
        match self {
            Dialect::Assembunny => 4,
            Dialect::Duet => 26,
            Dialect::Wrist => 6,
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Assembunny => "assembunny",
            Dialect::Duet => "duet",
            Dialect::Wrist => "wrist",
        })
    }
}

/// What to do with an instruction that can't execute as written, such as an `inc` of a literal,
/// or a `cpy` into one. Those mostly come from `tgl`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum OnInvalid {
    /// Treat it as a no-op and move on
    #[default]
    Skip,
    /// Fail with [InterpreterError::InvalidInstruction]
    Fail,
}

/// Settings for parsing and running a register machine program
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Config {
    /// The instruction set and register names
    pub dialect: Dialect,
    /// Number of registers. A machine whose program references more gets enough anyway.
    pub registers: usize,
    /// Handling of instructions that can't execute
    pub on_invalid: OnInvalid,
    /// Whether to recognize addition and multiplication loops and run them in a single step
    pub fold_loops: bool,
}

impl Config {
    /// Defaults for `dialect`: its usual register count, skipping invalid instructions, and
    /// folding loops only in assembunny, which is the dialect that needs it
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            registers: dialect.default_registers(),
            on_invalid: OnInvalid::Skip,
            fold_loops: matches!(dialect, Dialect::Assembunny),
        }
    }

    /// Change the number of registers
    #[must_use]
    pub const fn with_registers(mut self, registers: usize) -> Self {
        self.registers = registers;
        self
    }

    /// Change how invalid instructions are handled
    #[must_use]
    pub const fn with_on_invalid(mut self, policy: OnInvalid) -> Self {
        self.on_invalid = policy;
        self
    }

    /// Turn loop folding on or off
    #[must_use]
    pub const fn with_loop_folding(mut self, fold_loops: bool) -> Self {
        self.fold_loops = fold_loops;
        self
    }

    /// Index of the register called `name`, if it's within the configured count. See
    /// [Dialect::register_number] for the naming scheme.
    ///
    /// ```
    /// use machines::regvm::{Config, Dialect};
    /// assert_eq!(Config::new(Dialect::Assembunny).register_index('c'), Some(2));
    /// assert_eq!(Config::new(Dialect::Assembunny).register_index('e'), None);
    /// assert_eq!(Config::new(Dialect::Wrist).register_index('5'), Some(5));
    /// ```
    pub fn register_index(&self, name: char) -> Option<usize> {
        self.dialect
            .register_number(name)
            .filter(|&index| index < self.registers)
    }
}

/// Remainder with the sign of the divisor, so `7 mod -3` is `-2`
fn floor_mod(a: i64, b: i64) -> i64 {
    let rem = a.wrapping_rem(b);
    if rem != 0 && (rem < 0) != (b < 0) {
        rem.wrapping_add(b)
    } else {
        rem
    }
}

/// Where control goes after an instruction
enum Flow {
    Next,
    Jump(i64),
    Await,
    Output(i64),
}

/// A register machine.
///
/// The instruction pointer is an index into the program, and the machine halts once it moves
/// outside of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterMachine {
    code: Vec<Instr>,
    program: Arc<[Instr]>,
    ip_register: Option<usize>,
    registers: Box<[i64]>,
    initial: Box<[i64]>,
    ip: i64,
    config: Config,
    inputs: VecDeque<i64>,
    outputs: VecDeque<i64>,
    status: Status,
    poisoned: bool,
    steps: u64,
}

impl RegisterMachine {
    /// Create a machine that runs `program` with all registers at 0.
    ///
    /// If the program references registers beyond `config.registers`, the machine gets enough
    /// of them anyway.
    pub fn new(program: Program, config: Config) -> Self {
        let count = config.registers.max(program.registers_used());
        let registers: Box<[i64]> = vec![0; count].into_boxed_slice();
        Self {
            code: program.instrs.clone(),
            program: program.instrs.into(),
            ip_register: program.ip_register,
            initial: registers.clone(),
            registers,
            ip: 0,
            config,
            inputs: VecDeque::new(),
            outputs: VecDeque::new(),
            status: Status::Ready,
            poisoned: false,
            steps: 0,
        }
    }

    /// Set the register called `name` to `value`, both now and after every [reset](Machine::reset)
    ///
    /// ```
    /// use machines::prelude::*;
    /// use machines::regvm::parse;
    ///
    /// let config = Config::new(Dialect::Assembunny);
    /// let mut machine = RegisterMachine::new(parse("inc c", &config).unwrap(), config);
    /// machine.preset('c', 1).unwrap();
    /// machine.run().unwrap();
    /// assert_eq!(machine.register('c'), Some(2));
    /// machine.reset();
    /// assert_eq!(machine.register('c'), Some(1));
    /// ```
    pub fn preset(&mut self, name: char, value: i64) -> Result<(), InterpreterError> {
        let index = self
            .index_of(name)
            .ok_or(InterpreterError::UnknownRegister(name))?;
        self.registers[index] = value;
        self.initial[index] = value;
        Ok(())
    }

    /// The value of the register called `name`, if there is one
    pub fn register(&self, name: char) -> Option<i64> {
        self.index_of(name).map(|index| self.registers[index])
    }

    fn index_of(&self, name: char) -> Option<usize> {
        self.config
            .dialect
            .register_number(name)
            .filter(|&index| index < self.registers.len())
    }

    /// All registers, by index
    pub fn registers(&self) -> &[i64] {
        &self.registers
    }

    /// All registers, by index, for direct modification. Unlike [preset](Self::preset), changes
    /// made through this are lost on [reset](Machine::reset).
    pub fn registers_mut(&mut self) -> &mut [i64] {
        &mut self.registers
    }

    /// The instruction pointer
    pub fn instr_ptr(&self) -> i64 {
        self.ip
    }

    /// The current code, including any changes made by `tgl`
    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    /// The settings this machine runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of steps executed since creation or the last reset. A folded loop counts as one.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether a previous error left this machine unusable until [reset](Machine::reset)
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn current(&self) -> Option<usize> {
        usize::try_from(self.ip)
            .ok()
            .filter(|&index| index < self.code.len())
    }

    fn read(&self, operand: Operand) -> i64 {
        match operand {
            Operand::Reg(r) => self.registers[r],
            Operand::Imm(v) => v,
        }
    }

    /// Write `value` to `target` if it's a register
    fn store(
        &mut self,
        target: Operand,
        value: i64,
        instr: Instr,
    ) -> Result<Flow, InterpreterError> {
        match target {
            Operand::Reg(r) => {
                self.registers[r] = value;
                Ok(Flow::Next)
            }
            Operand::Imm(_) => self.invalid(instr),
        }
    }

    fn invalid(&self, instr: Instr) -> Result<Flow, InterpreterError> {
        match self.config.on_invalid {
            OnInvalid::Skip => {
                warn!("skipping invalid instruction at {}: {instr}", self.ip);
                Ok(Flow::Next)
            }
            OnInvalid::Fail => Err(InterpreterError::InvalidInstruction { ip: self.ip }),
        }
    }

    fn toggle(&mut self, offset: i64) {
        let target = self.ip.wrapping_add(offset);
        match usize::try_from(target)
            .ok()
            .and_then(|index| self.code.get_mut(index))
        {
            Some(instr) => {
                *instr = instr.toggled();
                debug!("toggled instruction {target} into {instr}");
            }
            None => debug!("toggle target {target} is outside the program"),
        }
    }

    /// Run a recognized loop in one go, if its counters are positive
    fn apply_fold(&mut self, fold: Fold) -> bool {
        match fold {
            Fold::Add { acc, counter } => {
                let n = self.registers[counter];
                if n <= 0 {
                    return false;
                }
                self.registers[acc] = self.registers[acc].wrapping_add(n);
                self.registers[counter] = 0;
            }
            Fold::Multiply {
                src,
                acc,
                inner,
                outer,
            } => {
                let (s, n) = (self.read(src), self.registers[outer]);
                if s <= 0 || n <= 0 {
                    return false;
                }
                self.registers[acc] = self.registers[acc].wrapping_add(s.wrapping_mul(n));
                self.registers[inner] = 0;
                self.registers[outer] = 0;
            }
        }
        debug!("folded loop at {}: {fold:?}", self.ip);
        self.ip += fold.len();
        true
    }

    fn execute(&mut self, instr: Instr) -> Result<Flow, InterpreterError> {
        if !instr.fits() {
            return self.invalid(instr);
        }
        let args = instr.args();
        // every operand is read before anything is written
        let mut vals = [0; 3];
        for (val, &arg) in vals.iter_mut().zip(args) {
            *val = self.read(arg);
        }
        let [a, b, _] = vals;
        match instr.op() {
            Op::Cpy => self.store(args[1], a, instr),
            Op::Inc => self.store(args[0], a.wrapping_add(1), instr),
            Op::Dec => self.store(args[0], a.wrapping_sub(1), instr),
            Op::Jnz => Ok(if a != 0 { Flow::Jump(b) } else { Flow::Next }),
            Op::Jgz => Ok(if a > 0 { Flow::Jump(b) } else { Flow::Next }),
            Op::Tgl => {
                self.toggle(a);
                Ok(Flow::Next)
            }
            Op::Out | Op::Snd => Ok(Flow::Output(a)),
            Op::Rcv => match (args[0], self.inputs.front()) {
                (_, None) => Ok(Flow::Await),
                (Operand::Reg(r), Some(&value)) => {
                    self.inputs.pop_front();
                    self.registers[r] = value;
                    Ok(Flow::Next)
                }
                (Operand::Imm(_), Some(_)) => self.invalid(instr),
            },
            Op::Set => self.store(args[0], b, instr),
            Op::Add => self.store(args[0], a.wrapping_add(b), instr),
            Op::Sub => self.store(args[0], a.wrapping_sub(b), instr),
            Op::Mul => self.store(args[0], a.wrapping_mul(b), instr),
            Op::Mod if b == 0 => Err(InterpreterError::DivideByZero { ip: self.ip }),
            Op::Mod => self.store(args[0], floor_mod(a, b), instr),
            Op::Addr | Op::Addi => self.store(args[2], a.wrapping_add(b), instr),
            Op::Mulr | Op::Muli => self.store(args[2], a.wrapping_mul(b), instr),
            Op::Banr | Op::Bani => self.store(args[2], a & b, instr),
            Op::Borr | Op::Bori => self.store(args[2], a | b, instr),
            Op::Setr | Op::Seti => self.store(args[2], a, instr),
            Op::Gtir | Op::Gtri | Op::Gtrr => self.store(args[2], i64::from(a > b), instr),
            Op::Eqir | Op::Eqri | Op::Eqrr => self.store(args[2], i64::from(a == b), instr),
        }
    }

    fn dispatch(&mut self, index: usize) -> Result<StepOutcome, InterpreterError> {
        if self.config.fold_loops && self.ip_register.is_none() {
            if let Some(fold) = fold::detect(&self.code, index) {
                if self.apply_fold(fold) {
                    return Ok(StepOutcome::Running);
                }
            }
        }

        if let Some(r) = self.ip_register {
            self.registers[r] = self.ip;
        }
        let instr = self.code[index];
        trace!("ip: {:>6} | {instr} | {:?}", self.ip, self.registers);
        let flow = self.execute(instr)?;

        let base = self.ip_register.map_or(self.ip, |r| self.registers[r]);
        match flow {
            Flow::Next => self.ip = base.wrapping_add(1),
            Flow::Jump(offset) => self.ip = base.wrapping_add(offset),
            Flow::Await => return Ok(StepOutcome::Stopped(State::Awaiting)),
            Flow::Output(value) => {
                self.outputs.push_back(value);
                self.ip = base.wrapping_add(1);
                return Ok(StepOutcome::Stopped(State::Output(value)));
            }
        }
        Ok(StepOutcome::Running)
    }

    /// Execute a single instruction, or a whole folded loop.
    ///
    /// Once the instruction pointer is outside the program, this reports [State::Halted] without
    /// executing anything. On error, the machine is poisoned: every later call returns
    /// [InterpreterError::Poisoned].
    pub fn exec_instruction(&mut self) -> Result<StepOutcome, InterpreterError> {
        if self.poisoned {
            return Err(InterpreterError::Poisoned);
        }
        if self.status == Status::Halted {
            return Err(InterpreterError::Halted);
        }

        let Some(index) = self.current() else {
            debug!("{} machine halted at {}", self.config.dialect, self.ip);
            self.status = Status::Halted;
            return Ok(StepOutcome::Stopped(State::Halted));
        };

        match self.dispatch(index) {
            Ok(outcome) => {
                self.status = match outcome {
                    StepOutcome::Running => Status::Running,
                    StepOutcome::Stopped(state) => {
                        debug!("{} machine stopped at {}: {state:?}", self.config.dialect, self.ip);
                        state.into()
                    }
                };
                if self.status != Status::Awaiting {
                    self.steps += 1;
                }
                Ok(outcome)
            }
            Err(e) => {
                debug!("{} machine poisoned at {}: {e}", self.config.dialect, self.ip);
                self.poisoned = true;
                Err(e)
            }
        }
    }
}

impl Machine for RegisterMachine {
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
        debug!("{} machine reset", self.config.dialect);
        self.code.clear();
        self.code.extend_from_slice(&self.program);
        self.registers.copy_from_slice(&self.initial);
        self.ip = 0;
        self.inputs.clear();
        self.outputs.clear();
        self.status = Status::Ready;
        self.poisoned = false;
        self.steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(src: &str, config: Config) -> RegisterMachine {
        RegisterMachine::new(parse(src, &config).unwrap(), config)
    }

    fn bunny(src: &str) -> RegisterMachine {
        load(src, Config::new(Dialect::Assembunny))
    }

    #[test]
    fn empty_program_halts() {
        let mut machine = bunny("");
        assert_eq!(machine.step(), Ok(StepOutcome::Stopped(State::Halted)));
        assert_eq!(machine.steps(), 0);
        assert_eq!(machine.step(), Err(InterpreterError::Halted));
    }

    #[test]
    fn output_yields() {
        let mut machine = bunny("cpy 5 x\nout x\n");
        assert_eq!(machine.registers().len(), 24);
        assert_eq!(machine.run(), Ok(State::Output(5)));
        assert_eq!(machine.status(), Status::Yielded);
        assert_eq!(machine.instr_ptr(), 2);
        assert_eq!(machine.drain_output(), vec![5]);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.register('x'), Some(5));
    }

    #[test]
    fn named_access_reaches_grown_registers() {
        let cpy = Instr::new(Op::Cpy, &[Operand::Imm(5), Operand::Reg(23)]);
        let program = Program::new(vec![cpy], None);
        let mut machine = RegisterMachine::new(program, Config::new(Dialect::Assembunny));
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.register('x'), Some(5));
        assert_eq!(machine.register('y'), None);

        machine.preset('x', 9).unwrap();
        machine.reset();
        assert_eq!(machine.register('x'), Some(9));
        assert_eq!(machine.preset('y', 1), Err(InterpreterError::UnknownRegister('y')));
    }

    #[test]
    fn self_toggle_takes_effect_next_time() {
        let mut machine = bunny("tgl a\ndec d\njnz d 2\njnz 1 -3\n");
        machine.preset('d', 1).unwrap();

        assert_eq!(machine.step(), Ok(StepOutcome::Running));
        // the tgl ran as a tgl, and only changed the code
        assert_eq!(machine.register('a'), Some(0));
        assert_eq!(machine.code()[0].to_string(), "inc a");

        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.register('a'), Some(1));
        assert_eq!(machine.register('d'), Some(-1));
    }

    #[test]
    fn toggle_outside_program_is_ignored() {
        let mut machine = bunny("tgl 5\ntgl -2\ninc a\n");
        let before = machine.code().to_vec();
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.code(), before);
        assert_eq!(machine.register('a'), Some(1));
    }

    #[test]
    fn toggled_into_invalid() {
        // toggling the jnz turns it into `cpy 1 2`, which can't be executed
        let src = "tgl 1\njnz 1 2\ninc a\n";
        let mut machine = bunny(src);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.register('a'), Some(1));

        let strict = Config::new(Dialect::Assembunny).with_on_invalid(OnInvalid::Fail);
        let mut machine = load(src, strict);
        assert_eq!(
            machine.run(),
            Err(InterpreterError::InvalidInstruction { ip: 1 })
        );
        assert!(machine.is_poisoned());
        assert_eq!(machine.step(), Err(InterpreterError::Poisoned));
    }

    #[test]
    fn multiplication_folds_to_same_result() {
        let src = "cpy 7 b\ncpy 6 d\ncpy b c\ninc a\ndec c\njnz c -2\ndec d\njnz d -5\n";
        let mut folded = bunny(src);
        let mut unfolded = load(src, Config::new(Dialect::Assembunny).with_loop_folding(false));

        assert_eq!(folded.run(), Ok(State::Halted));
        assert_eq!(unfolded.run(), Ok(State::Halted));
        assert_eq!(folded.registers(), [42, 7, 0, 0]);
        assert_eq!(folded.registers(), unfolded.registers());
        assert_eq!(folded.steps(), 3);
        assert!(unfolded.steps() > 100);
    }

    #[test]
    fn fold_skipped_for_nonpositive_counters() {
        // with d at 0, the outer loop counts down through the negatives, so can't fold
        let src = "cpy b c\ninc a\ndec c\njnz c -2\ndec d\njnz d -5\n";
        let mut machine = bunny(src);
        machine.preset('b', 2).unwrap();
        machine.preset('d', -1).unwrap();
        assert_eq!(machine.run_bounded(100), Ok(None));
        assert!(machine.register('a').unwrap() > 2);
    }

    #[test]
    fn duet_arithmetic() {
        let config = Config::new(Dialect::Duet);
        let mut machine = load("set a -7\nmod a 3\nset b 4\nmul b a\nsub b 1\nadd c b\n", config);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.register('a'), Some(2));
        assert_eq!(machine.register('b'), Some(7));
        assert_eq!(machine.register('c'), Some(7));

        let src = "set a 7\nmod a -3\nset b -7\nmod b -3\nset c 7\nmod c 3\n";
        let mut machine = load(src, config);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.registers()[..3], [-2, -1, 1]);

        let mut machine = load("mod a b\n", config);
        assert_eq!(machine.run(), Err(InterpreterError::DivideByZero { ip: 0 }));
    }

    #[test]
    fn receive_waits_in_place() {
        let mut machine = load("rcv b\nadd b 1\nsnd b\n", Config::new(Dialect::Duet));
        assert_eq!(machine.run(), Ok(State::Awaiting));
        assert_eq!(machine.instr_ptr(), 0);
        assert!(machine.is_blocked());
        machine.push(41);
        assert_eq!(machine.run(), Ok(State::Output(42)));
        assert_eq!(machine.run(), Ok(State::Halted));
    }

    #[test]
    fn wrist_opcodes() {
        let config = Config::new(Dialect::Wrist);
        let src = "seti 12 0 0\nseti 10 0 1\nbanr 0 1 2\nborr 0 1 3\ngtri 0 11 4\neqir 10 1 5\n";
        let mut machine = load(src, config);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.registers(), [12, 10, 8, 14, 1, 1]);
    }

    #[test]
    fn bound_instruction_pointer() {
        // addi 0 1 0 jumps over the next instruction via register 0
        let config = Config::new(Dialect::Wrist);
        let mut machine = load("#ip 0\naddi 0 1 0\nseti 9 0 1\nseti 7 0 2\n", config);
        assert_eq!(machine.run(), Ok(State::Halted));
        assert_eq!(machine.registers()[1], 0);
        assert_eq!(machine.registers()[2], 7);
        // written before the last instruction ran
        assert_eq!(machine.registers()[0], 2);
        assert_eq!(machine.instr_ptr(), 3);
    }

    #[test]
    fn presets_survive_reset() {
        let mut machine = bunny("cpy c a\ninc a\n");
        machine.preset('c', 9).unwrap();
        assert_eq!(machine.preset('e', 1), Err(InterpreterError::UnknownRegister('e')));
        let fresh = machine.clone();
        machine.run().unwrap();
        assert_eq!(machine.register('a'), Some(10));
        machine.registers_mut()[2] = 0;
        machine.reset();
        assert_eq!(machine, fresh);
    }
}
