// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Instructions of the register machine dialects

use super::Dialect;
use std::fmt::{self, Display};

/// A register machine operation, across all [dialects](Dialect)
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[allow(missing_docs, reason = "named after their mnemonics")]
pub enum Op {
    // assembunny
    Cpy,
    Inc,
    Dec,
    Jnz,
    Tgl,
    Out,
    // duet
    Snd,
    Set,
    Add,
    Sub,
    Mul,
    Mod,
    Rcv,
    Jgz,
    // wrist
    Addr,
    Addi,
    Mulr,
    Muli,
    Banr,
    Bani,
    Borr,
    Bori,
    Setr,
    Seti,
    Gtir,
    Gtri,
    Gtrr,
    Eqir,
    Eqri,
    Eqrr,
}

/// What the source text must provide for an operand
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Slot {
    /// a register name or a literal, read from
    Value,
    /// a register name, written to
    Target,
    /// a register number
    Reg,
    /// a literal number
    Imm,
}

impl Op {
    /// Every operation, in declaration order
    pub const ALL: [Op; 30] = [
        Op::Cpy,
        Op::Inc,
        Op::Dec,
        Op::Jnz,
        Op::Tgl,
        Op::Out,
        Op::Snd,
        Op::Set,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Mod,
        Op::Rcv,
        Op::Jgz,
        Op::Addr,
        Op::Addi,
        Op::Mulr,
        Op::Muli,
        Op::Banr,
        Op::Bani,
        Op::Borr,
        Op::Bori,
        Op::Setr,
        Op::Seti,
        Op::Gtir,
        Op::Gtri,
        Op::Gtrr,
        Op::Eqir,
        Op::Eqri,
        Op::Eqrr,
    ];

    /// The dialect this operation belongs to. [Op::Jnz] is shared by assembunny and duet, and
    /// reported as assembunny.
    pub const fn dialect(self) -> Dialect {
        match self {
            Op::Cpy | Op::Inc | Op::Dec | Op::Jnz | Op::Tgl | Op::Out => Dialect::Assembunny,
            Op::Snd | Op::Set | Op::Add | Op::Sub | Op::Mul | Op::Mod | Op::Rcv | Op::Jgz => {
                Dialect::Duet
            }
            _ => Dialect::Wrist,
        }
    }

    pub(crate) const fn slots(self) -> &'static [Slot] {
        use Slot::*;
        match self {
            Op::Inc | Op::Dec | Op::Rcv => &[Target],
            Op::Tgl | Op::Out | Op::Snd => &[Value],
            Op::Cpy => &[Value, Target],
            Op::Jnz | Op::Jgz => &[Value, Value],
            Op::Set | Op::Add | Op::Sub | Op::Mul | Op::Mod => &[Target, Value],
            Op::Addr | Op::Mulr | Op::Banr | Op::Borr | Op::Gtrr | Op::Eqrr => &[Reg, Reg, Reg],
            Op::Addi | Op::Muli | Op::Bani | Op::Bori | Op::Gtri | Op::Eqri => &[Reg, Imm, Reg],
            Op::Gtir | Op::Eqir => &[Imm, Reg, Reg],
            Op::Setr => &[Reg, Imm, Reg],
            Op::Seti => &[Imm, Imm, Reg],
        }
    }

    /// Number of operands the operation takes
    pub const fn arity(self) -> usize {
        self.slots().len()
    }

    /// The operation's name in source text
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Op::Cpy => "cpy",
            Op::Inc => "inc",
            Op::Dec => "dec",
            Op::Jnz => "jnz",
            Op::Tgl => "tgl",
            Op::Out => "out",
            Op::Snd => "snd",
            Op::Set => "set",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Mod => "mod",
            Op::Rcv => "rcv",
            Op::Jgz => "jgz",
            Op::Addr => "addr",
            Op::Addi => "addi",
            Op::Mulr => "mulr",
            Op::Muli => "muli",
            Op::Banr => "banr",
            Op::Bani => "bani",
            Op::Borr => "borr",
            Op::Bori => "bori",
            Op::Setr => "setr",
            Op::Seti => "seti",
            Op::Gtir => "gtir",
            Op::Gtri => "gtri",
            Op::Gtrr => "gtrr",
            Op::Eqir => "eqir",
            Op::Eqri => "eqri",
            Op::Eqrr => "eqrr",
        }
    }

    /// Look up `name` among the operations available in `dialect`
    ///
    /// ```
    /// use machines::regvm::{Dialect, Op};
    /// assert_eq!(Op::from_mnemonic(Dialect::Duet, "jnz"), Some(Op::Jnz));
    /// assert_eq!(Op::from_mnemonic(Dialect::Assembunny, "jgz"), None);
    /// ```
    pub fn from_mnemonic(dialect: Dialect, name: &str) -> Option<Op> {
        Op::ALL
            .into_iter()
            .find(|op| op.mnemonic() == name && op.available_in(dialect))
    }

    /// Whether source text in `dialect` may use this operation
    pub const fn available_in(self, dialect: Dialect) -> bool {
        matches!(
            (self.dialect(), dialect),
            (Dialect::Assembunny, Dialect::Assembunny)
                | (Dialect::Duet, Dialect::Duet)
                | (Dialect::Wrist, Dialect::Wrist)
        ) || matches!((self, dialect), (Op::Jnz, Dialect::Duet))
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// An instruction operand
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Operand {
    /// The register with the contained index
    Reg(usize),
    /// A literal value
    Imm(i64),
}

/// A single instruction: an operation and up to three operands.
///
/// The operand count normally matches the operation's [arity](Op::arity), but an instruction
/// isn't required to be valid. [Toggling](Instr::toggled) can leave a literal where a register
/// is written, which the machine treats according to its [policy](super::OnInvalid).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Instr {
    op: Op,
    args: [Operand; 3],
    len: u8,
}

impl Instr {
    /// Construct an instruction.
    ///
    /// # Panics
    ///
    /// Panics if `args` has more than 3 operands.
    pub fn new(op: Op, args: &[Operand]) -> Self {
        assert!(args.len() <= 3, "instructions have at most 3 operands");
        let mut packed = [Operand::Imm(0); 3];
        packed[..args.len()].copy_from_slice(args);
        Self {
            op,
            args: packed,
            #[allow(clippy::cast_possible_truncation, reason = "checked above")]
            len: args.len() as u8,
        }
    }

    /// The operation
    pub fn op(&self) -> Op {
        self.op
    }

    /// The operands
    pub fn args(&self) -> &[Operand] {
        &self.args[..usize::from(self.len)]
    }

    /// Both at once, for pattern matching
    pub(crate) fn shape(&self) -> (Op, &[Operand]) {
        (self.op, self.args())
    }

    /// Whether the operand count matches the operation
    pub fn fits(&self) -> bool {
        self.args().len() == self.op.arity()
    }

    /// The instruction a `tgl` turns this one into.
    ///
    /// One-operand instructions become `inc`, except `inc` itself which becomes `dec`.
    /// Two-operand instructions become `jnz`, except `jnz` itself which becomes `cpy`.
    /// Operands are never changed, and instructions with three operands are left as they are.
    ///
    /// ```
    /// use machines::regvm::{Instr, Op, Operand};
    /// let jnz = Instr::new(Op::Jnz, &[Operand::Imm(1), Operand::Reg(2)]);
    /// assert_eq!(jnz.toggled(), Instr::new(Op::Cpy, &[Operand::Imm(1), Operand::Reg(2)]));
    /// assert_eq!(jnz.toggled().toggled(), jnz);
    /// ```
    pub fn toggled(self) -> Self {
        let op = match (self.len, self.op) {
            (1, Op::Inc) => Op::Dec,
            (1, _) => Op::Inc,
            (2, Op::Jnz) => Op::Cpy,
            (2, _) => Op::Jnz,
            _ => self.op,
        };
        Self { op, ..self }
    }
}

/// Writes the instruction the way it would appear in source text.
///
/// Registers are written as letters, or as numbers for wrist operations.
impl Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        let numbered = self.op.dialect() == Dialect::Wrist;
        for arg in self.args() {
            match *arg {
                Operand::Imm(n) => write!(f, " {n}")?,
                Operand::Reg(r) if numbered => write!(f, " {r}")?,
                Operand::Reg(r) => match u8::try_from(r).ok().filter(|&r| r < 26) {
                    Some(r) => write!(f, " {}", char::from(b'a' + r))?,
                    None => write!(f, " r{r}")?,
                },
            }
        }
        Ok(())
    }
}

/// A loaded register machine program
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program {
    pub(crate) instrs: Vec<Instr>,
    pub(crate) ip_register: Option<usize>,
}

impl Program {
    /// Build a program directly from instructions, optionally binding the instruction pointer
    /// to a register
    pub fn new(instrs: Vec<Instr>, ip_register: Option<usize>) -> Self {
        Self {
            instrs,
            ip_register,
        }
    }

    /// The instructions
    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// The register bound to the instruction pointer by an `#ip` directive
    pub fn ip_register(&self) -> Option<usize> {
        self.ip_register
    }

    /// One more than the highest register index referenced anywhere
    pub(crate) fn registers_used(&self) -> usize {
        self.instrs
            .iter()
            .flat_map(|i| i.args().iter())
            .filter_map(|arg| match arg {
                Operand::Reg(r) => Some(r + 1),
                Operand::Imm(_) => None,
            })
            .chain(self.ip_register.map(|r| r + 1))
            .max()
            .unwrap_or(0)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(r) = self.ip_register {
            writeln!(f, "#ip {r}")?;
        }
        for instr in &self.instrs {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Operand::{Imm, Reg};

    #[test]
    fn toggle_table() {
        let one = |op| Instr::new(op, &[Reg(0)]);
        let two = |op| Instr::new(op, &[Imm(1), Reg(0)]);

        assert_eq!(one(Op::Inc).toggled().op(), Op::Dec);
        assert_eq!(one(Op::Dec).toggled().op(), Op::Inc);
        assert_eq!(one(Op::Tgl).toggled().op(), Op::Inc);
        assert_eq!(one(Op::Out).toggled().op(), Op::Inc);

        assert_eq!(two(Op::Jnz).toggled().op(), Op::Cpy);
        assert_eq!(two(Op::Cpy).toggled().op(), Op::Jnz);
        assert_eq!(two(Op::Set).toggled().op(), Op::Jnz);

        let three = Instr::new(Op::Addr, &[Reg(0), Reg(1), Reg(2)]);
        assert_eq!(three.toggled(), three);

        // operands never change
        assert_eq!(two(Op::Jnz).toggled().args(), [Imm(1), Reg(0)]);
    }

    #[test]
    fn mnemonics_round_trip() {
        for op in Op::ALL {
            assert_eq!(Op::from_mnemonic(op.dialect(), op.mnemonic()), Some(op));
        }
        assert_eq!(Op::from_mnemonic(Dialect::Wrist, "cpy"), None);
        assert_eq!(Op::from_mnemonic(Dialect::Duet, "tgl"), None);
    }

    #[test]
    fn display() {
        assert_eq!(Instr::new(Op::Cpy, &[Imm(-4), Reg(2)]).to_string(), "cpy -4 c");
        assert_eq!(
            Instr::new(Op::Gtir, &[Imm(7), Reg(1), Reg(5)]).to_string(),
            "gtir 7 1 5"
        );
        let program = Program::new(vec![Instr::new(Op::Seti, &[Imm(5), Imm(0), Reg(1)])], Some(0));
        assert_eq!(program.to_string(), "#ip 0\nseti 5 0 1\n");
        assert_eq!(program.registers_used(), 2);
    }
}
