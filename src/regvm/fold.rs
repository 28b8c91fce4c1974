// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Recognition of the counting loops assembunny uses to add and multiply
//!
//! Matching happens against the current code, every time the instruction pointer reaches a
//! candidate, so loops that get toggled stop matching once they no longer have the right shape.

use super::{Instr, Op, Operand};

/// A loop that can be replaced by arithmetic on its registers
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(super) enum Fold {
    /// ```text
    /// inc acc          dec counter
    /// dec counter  or  inc acc
    /// jnz counter -2   jnz counter -2
    /// ```
    ///
    /// Adds `counter` to `acc`, leaving `counter` at 0.
    Add { acc: usize, counter: usize },
    /// ```text
    /// cpy src inner
    /// inc acc
    /// dec inner
    /// jnz inner -2
    /// dec outer
    /// jnz outer -5
    /// ```
    ///
    /// Adds `src * outer` to `acc`, leaving `inner` and `outer` at 0.
    Multiply {
        src: Operand,
        acc: usize,
        inner: usize,
        outer: usize,
    },
}

impl Fold {
    /// Number of instructions the loop spans
    pub(super) const fn len(self) -> i64 {
        match self {
            Fold::Add { .. } => 3,
            Fold::Multiply { .. } => 6,
        }
    }
}

/// Find a foldable loop starting at `at`. The multiplication is tried first, as the addition is
/// nested inside of it.
pub(super) fn detect(code: &[Instr], at: usize) -> Option<Fold> {
    multiply(code, at).or_else(|| add(code, at))
}

fn multiply(code: &[Instr], at: usize) -> Option<Fold> {
    use Operand::{Imm, Reg};
    let Some(&[cpy, inc, dec_inner, jnz_inner, dec_outer, jnz_outer]) = code.get(at..at + 6) else {
        return None;
    };
    match (
        cpy.shape(),
        inc.shape(),
        dec_inner.shape(),
        jnz_inner.shape(),
        dec_outer.shape(),
        jnz_outer.shape(),
    ) {
        (
            (Op::Cpy, &[src, Reg(inner)]),
            (Op::Inc, &[Reg(acc)]),
            (Op::Dec, &[Reg(i1)]),
            (Op::Jnz, &[Reg(i2), Imm(-2)]),
            (Op::Dec, &[Reg(outer)]),
            (Op::Jnz, &[Reg(o1), Imm(-5)]),
        ) if inner == i1
            && inner == i2
            && outer == o1
            && acc != inner
            && acc != outer
            && inner != outer
            && ![Reg(acc), Reg(inner), Reg(outer)].contains(&src) =>
        {
            Some(Fold::Multiply {
                src,
                acc,
                inner,
                outer,
            })
        }
        _ => None,
    }
}

fn add(code: &[Instr], at: usize) -> Option<Fold> {
    use Operand::{Imm, Reg};
    let Some(&[first, second, jnz]) = code.get(at..at + 3) else {
        return None;
    };
    let (acc, counter) = match (first.shape(), second.shape(), jnz.shape()) {
        ((Op::Inc, &[Reg(acc)]), (Op::Dec, &[Reg(counter)]), (Op::Jnz, &[Reg(c), Imm(-2)]))
        | ((Op::Dec, &[Reg(counter)]), (Op::Inc, &[Reg(acc)]), (Op::Jnz, &[Reg(c), Imm(-2)]))
            if counter == c =>
        {
            (acc, counter)
        }
        _ => return None,
    };
    (acc != counter).then_some(Fold::Add { acc, counter })
}
