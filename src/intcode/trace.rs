// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Opt-in record of the instructions an [Interpreter] executed
use std::fmt::{self, Debug, Display};

use super::{Interpreter, OpCode, ParamMode};

#[derive(Clone, Copy, PartialEq, Eq)]
struct PackedModes(u8);

impl PackedModes {
    const fn pack(modes: [ParamMode; 3]) -> Self {
        Self(modes[0] as u8 | ((modes[1] as u8) << 2) | ((modes[2] as u8) << 4))
    }

    const fn unpack(self) -> [ParamMode; 3] {
        const fn unpack_bit_pair(bit_pair: u8) -> ParamMode {
            match bit_pair & 0b11 {
                0b00 => ParamMode::Positional,
                0b01 => ParamMode::Immediate,
                _ => ParamMode::Relative,
            }
        }
        [
            unpack_bit_pair(self.0),
            unpack_bit_pair(self.0 >> 2),
            unpack_bit_pair(self.0 >> 4),
        ]
    }
}

#[derive(Clone, PartialEq, Eq)]
/// One executed instruction. Query it through its accessors, or render it as a line of text with
/// [Display].
pub struct TracedInstr {
    op_int: i64,
    instr_ptr: i64,
    rel_base: i64,
    opcode: OpCode,
    packed_modes: PackedModes,
    /// (raw parameter, resolved value) pairs, of which the first `param_count` are meaningful
    params: [(i64, i64); 3],
    param_count: u8,
}

impl TracedInstr {
    /// Relative base in effect when the instruction ran
    pub fn rel_base(&self) -> i64 {
        self.rel_base
    }

    /// Address the instruction was read from
    pub fn instr_ptr(&self) -> i64 {
        self.instr_ptr
    }

    /// The instruction int, modes included
    pub fn op_int(&self) -> i64 {
        self.op_int
    }

    /// Decoded opcode
    pub fn op_code(&self) -> OpCode {
        self.opcode
    }

    /// Decoded modes of all three parameter slots, used or not
    pub fn param_modes(&self) -> [ParamMode; 3] {
        self.packed_modes.unpack()
    }

    /// Each parameter as it appeared in memory, paired with what it resolved to.
    ///
    /// For destination parameters, the resolved value is the value that was stored.
    pub fn params(&self) -> &[(i64, i64)] {
        &self.params[..usize::from(self.param_count)]
    }

    /// The value written to memory, for instructions that write one
    pub fn stored_val(&self) -> Option<i64> {
        match self.opcode {
            OpCode::Add | OpCode::Mul | OpCode::Lt | OpCode::Eq => Some(self.params[2].1),
            OpCode::In => Some(self.params[0].1),
            OpCode::Out | OpCode::Jnz | OpCode::Jz | OpCode::Rbo | OpCode::Halt => None,
        }
    }
}

impl Interpreter {
    /// Start recording executed instructions. Returns the trace this replaces, if one was
    /// running.
    ///
    /// # Example
    /// ```
    /// use machines::prelude::*;
    /// let mut interp = Interpreter::new([1101, 90, 9, 0, 99]);
    /// interp.start_trace();
    /// interp.run().unwrap();
    /// let trace = interp.end_trace().unwrap();
    /// assert_eq!(trace.0.len(), 2);
    /// assert_eq!(trace.0[0].stored_val(), Some(99));
    /// ```
    pub fn start_trace(&mut self) -> Option<Trace> {
        self.trace.replace(Trace::new())
    }

    /// Stop recording, and take what was recorded since [Interpreter::start_trace]
    pub fn end_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    /// The trace so far, without stopping it
    pub fn show_trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Instructions executed by an [Interpreter] while tracing, oldest first
pub struct Trace(pub Vec<TracedInstr>);

impl Trace {
    pub(crate) fn push(
        &mut self,
        (op_int, opcode, modes): (i64, OpCode, [ParamMode; 3]),
        instr_ptr: i64,
        rel_base: i64,
        resolved_params: &[(i64, i64)],
    ) {
        debug_assert_eq!(resolved_params.len(), opcode.param_count());
        let mut params = [(0, 0); 3];
        params[..resolved_params.len()].copy_from_slice(resolved_params);
        self.0.push(TracedInstr {
            op_int,
            instr_ptr,
            rel_base,
            opcode,
            packed_modes: PackedModes::pack(modes),
            params,
            #[allow(clippy::cast_possible_truncation, reason = "at most 3")]
            param_count: resolved_params.len() as u8,
        });
    }

    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }
}

impl Debug for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedInstr")
            .field("opcode", &self.opcode)
            .field("op_int", &self.op_int)
            .field("instr_ptr", &self.instr_ptr)
            .field("rel_base", &self.rel_base)
            .field("modes", &self.packed_modes.unpack())
            .field("params", &self.params())
            .finish()
    }
}

impl Display for TracedInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ran instruction at {:0>4}: op int {: <5} | [{}",
            self.instr_ptr, self.op_int, self.opcode
        )?;
        let modes = self.packed_modes.unpack();
        let stores_last = self.stored_val().is_some();
        let count = self.params().len();
        for (i, ((raw, resolved), mode)) in self.params().iter().zip(modes).enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            if stores_last && i + 1 == count {
                write!(f, "{sep}{mode}{raw} (stored {resolved})")?;
            } else {
                write!(f, "{sep}{mode}{raw} (resolves to {resolved})")?;
            }
        }
        if self.opcode == OpCode::Rbo {
            write!(
                f,
                " (went from {} to {})",
                self.rel_base,
                self.rel_base.wrapping_add(self.params[0].1)
            )?;
        }
        write!(f, "]")
    }
}
