// SPDX-FileCopyrightText: 2024 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

use super::*;

/// An instruction int along with what it decoded to
pub(super) type Decoded = (i64, OpCode, [ParamMode; 3]);

fn address(n: i64) -> Result<i64, InterpreterError> {
    if n < 0 {
        Err(InterpreterError::NegativeMemAccess(n))
    } else {
        Ok(n)
    }
}

impl Interpreter {
    // Given a 5 digit number, digits ABCDE are used as follows:
    // DE is the two-digit opcode
    // C is the 1st parameter's mode
    // B is the 2nd parameter's mode
    // A is the 3rd parameter's mode
    //
    // So *0*1202 would be parsed as follows:
    //
    // Opcode 02 is multiply
    // C=2: 1st parameter is in relative mode
    // B=1: 2nd parameter is in immediate mode
    // A=0: 3rd parameter is in positional mode
    pub(crate) fn parse_op(op: i64) -> Result<(OpCode, [ParamMode; 3]), InterpreterError> {
        Ok((
            OpCode::try_from(op % 100).map_err(|_| InterpreterError::UnrecognizedOpcode(op))?,
            ParamMode::extract(op)?,
        ))
    }

    /// Address of the instruction at `ip`. A pointer that ran off the end of the address space
    /// has wrapped around to a negative value, and has nothing to fetch.
    pub(super) fn fetch(ip: i64) -> Result<i64, InterpreterError> {
        address(ip)
    }

    /// Raw int of the parameter `offset` places after the instruction int. Past the end of the
    /// address space, the pointer wraps around to a negative address.
    fn raw_param(&self, offset: i64) -> Result<i64, InterpreterError> {
        address(self.index.wrapping_add(offset)).map(|i| self.code[i])
    }

    fn advance(&mut self, by: i64) {
        self.index = self.index.wrapping_add(by);
    }

    /// Processes the parameter `offset` places after the instruction int into a concrete value
    /// using the method appropriate for `mode`.
    pub(super) fn resolve_param(&self, mode: ParamMode, offset: i64) -> Result<i64, InterpreterError> {
        let raw = self.raw_param(offset)?;
        match mode {
            ParamMode::Positional => address(raw).map(|i| self.code[i]),
            ParamMode::Immediate => Ok(raw),
            ParamMode::Relative => address(raw.wrapping_add(self.rel_offset)).map(|i| self.code[i]),
        }
    }

    /// Turns the parameter `offset` places after the instruction int into the address it points
    /// to according to `mode`. Destinations can't be in immediate mode.
    pub(super) fn resolve_dest(&self, mode: ParamMode, offset: i64) -> Result<i64, InterpreterError> {
        let raw = self.raw_param(offset)?;
        match mode {
            ParamMode::Positional => address(raw),
            ParamMode::Relative => address(raw.wrapping_add(self.rel_offset)),
            ParamMode::Immediate => Err(InterpreterError::WriteToImmediate(raw)),
        }
    }

    /// Add the executed instruction to the trace, if one is running
    pub(super) fn record(&mut self, decoded: Decoded, params: &[(i64, i64)]) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(decoded, self.index, self.rel_offset, params);
        }
    }

    /// common logic of all 4 instructions that take 3 parameters
    pub(super) fn op3(
        &mut self,
        decoded: Decoded,
        operation: impl Fn(i64, i64) -> i64,
    ) -> Result<StepOutcome, InterpreterError> {
        let modes = decoded.2;
        let a = self.resolve_param(modes[0], 1)?;
        let b = self.resolve_param(modes[1], 2)?;
        let dest = self.resolve_dest(modes[2], 3)?;
        let val = operation(a, b);
        self.record(
            decoded,
            &[
                (self.raw_param(1)?, a),
                (self.raw_param(2)?, b),
                (self.raw_param(3)?, val),
            ],
        );
        self.code[dest] = val;
        self.advance(4);
        Ok(StepOutcome::Running)
    }

    pub(super) fn jump(
        &mut self,
        decoded: Decoded,
        func: impl Fn(i64) -> bool,
    ) -> Result<StepOutcome, InterpreterError> {
        let modes = decoded.2;
        let expr = self.resolve_param(modes[0], 1)?;
        let dest = self.resolve_param(modes[1], 2)?;
        if func(expr) && dest < 0 {
            return Err(InterpreterError::JumpToNegative(dest));
        }
        self.record(
            decoded,
            &[(self.raw_param(1)?, expr), (self.raw_param(2)?, dest)],
        );
        if func(expr) {
            self.index = dest;
        } else {
            self.advance(3);
        }
        Ok(StepOutcome::Running)
    }

    /// Stores the next input, or stops without moving if there is none
    pub(super) fn input(&mut self, decoded: Decoded) -> Result<StepOutcome, InterpreterError> {
        let Some(&input) = self.inputs.front() else {
            return Ok(StepOutcome::Stopped(State::Awaiting));
        };
        let dest = self.resolve_dest(decoded.2[0], 1)?;
        self.inputs.pop_front();
        self.record(decoded, &[(self.raw_param(1)?, input)]);
        self.code[dest] = input;
        self.advance(2);
        Ok(StepOutcome::Running)
    }

    pub(super) fn output(&mut self, decoded: Decoded) -> Result<StepOutcome, InterpreterError> {
        let val = self.resolve_param(decoded.2[0], 1)?;
        self.record(decoded, &[(self.raw_param(1)?, val)]);
        self.outputs.push_back(val);
        self.advance(2);
        Ok(StepOutcome::Stopped(State::Output(val)))
    }

    pub(super) fn adjust_base(&mut self, decoded: Decoded) -> Result<StepOutcome, InterpreterError> {
        let val = self.resolve_param(decoded.2[0], 1)?;
        self.record(decoded, &[(self.raw_param(1)?, val)]);
        self.rel_offset = self.rel_offset.wrapping_add(val);
        self.advance(2);
        Ok(StepOutcome::Running)
    }
}
