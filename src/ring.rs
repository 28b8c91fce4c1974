// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Several machines connected in a loop
//!
//! Every value machine `i` outputs becomes input to machine `i + 1`, and the last machine feeds
//! the first. Machines take turns, each running until it suspends, so this needs nothing beyond
//! the [Machine] trait.
//!
//! # Example
//!
//! The amplifiers of [2019 Day 7], in a feedback loop:
//!
//! ```
//! use machines::prelude::*;
//! use machines::ring::{Outcome, Ring};
//!
//! let code = [
//!     3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28,
//!     1005, 28, 6, 99, 0, 0, 5,
//! ];
//! let amplifiers = [9, 8, 7, 6, 5].map(|phase| {
//!     let mut amp = Interpreter::new(code);
//!     amp.push(phase);
//!     amp
//! });
//! let mut ring = Ring::new(amplifiers);
//! ring.machine_mut(0).unwrap().push(0);
//!
//! let report = ring.run().unwrap();
//! assert_eq!(report.outcome, Outcome::Halted);
//! assert_eq!(report.last_outputs[4], Some(139629729));
//! ```
//!
//! [2019 Day 7]: https://adventofcode.com/2019/day/7

use crate::{InterpreterError, Machine, State, Status};
use log::debug;

/// Why a [Ring] stopped
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    /// Every machine halted
    Halted,
    /// Every machine still running is waiting on input that will never come
    Deadlocked,
}

/// The result of [Ring::run]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Report {
    /// Why the ring stopped
    pub outcome: Outcome,
    /// Number of values each machine output
    pub sent: Vec<usize>,
    /// The last value each machine output, if any
    pub last_outputs: Vec<Option<i64>>,
}

/// A round-robin scheduler over machines connected in a loop
#[derive(Debug, Clone)]
pub struct Ring<M> {
    machines: Vec<M>,
    sent: Vec<usize>,
    last_outputs: Vec<Option<i64>>,
}

impl<M: Machine> Ring<M> {
    /// Connect `machines` in order, with the last one feeding back into the first
    pub fn new(machines: impl IntoIterator<Item = M>) -> Self {
        let machines: Vec<M> = machines.into_iter().collect();
        Self {
            sent: vec![0; machines.len()],
            last_outputs: vec![None; machines.len()],
            machines,
        }
    }

    /// The machines, in ring order
    pub fn machines(&self) -> &[M] {
        &self.machines
    }

    /// Mutable access to the machine at `index`, to push initial input or adjust it
    pub fn machine_mut(&mut self, index: usize) -> Option<&mut M> {
        self.machines.get_mut(index)
    }

    /// Take the machines back out
    pub fn into_machines(self) -> Vec<M> {
        self.machines
    }

    /// Pass everything machine `index` has output along to the next machine
    fn forward(&mut self, index: usize) {
        let next = (index + 1) % self.machines.len();
        while let Some(value) = self.machines[index].pop() {
            self.machines[next].push(value);
            self.sent[index] += 1;
            self.last_outputs[index] = Some(value);
        }
    }

    /// Run the machines in turns until all of them halt, or until none of them can make
    /// progress. Counts and last outputs accumulate across calls.
    pub fn run(&mut self) -> Result<Report, InterpreterError> {
        if self.machines.is_empty() {
            return Ok(self.report(Outcome::Halted));
        }
        loop {
            let mut progressed = false;
            for index in 0..self.machines.len() {
                let machine = &mut self.machines[index];
                if machine.status() == Status::Halted || machine.is_blocked() {
                    continue;
                }
                progressed = true;
                let state = machine.run()?;
                if state == State::Halted {
                    debug!("ring machine {index} halted");
                }
                self.forward(index);
            }

            if self
                .machines
                .iter()
                .all(|machine| machine.status() == Status::Halted)
            {
                return Ok(self.report(Outcome::Halted));
            }
            if !progressed {
                debug!("ring deadlocked after sending {:?}", self.sent);
                return Ok(self.report(Outcome::Deadlocked));
            }
        }
    }

    fn report(&self, outcome: Outcome) -> Report {
        Report {
            outcome,
            sent: self.sent.clone(),
            last_outputs: self.last_outputs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use crate::regvm::parse;

    fn amplifiers(code: &[i64], phases: [i64; 5]) -> Ring<Interpreter> {
        let mut ring = Ring::new(phases.map(|phase| {
            let mut amp = Interpreter::new(code.iter().copied());
            amp.push(phase);
            amp
        }));
        ring.machine_mut(0).unwrap().push(0);
        ring
    }

    #[test]
    fn amplifier_chain() {
        let code = [
            3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0,
        ];
        let report = amplifiers(&code, [4, 3, 2, 1, 0]).run().unwrap();
        assert_eq!(report.outcome, Outcome::Halted);
        assert_eq!(report.sent, [1; 5]);
        assert_eq!(report.last_outputs[4], Some(43210));
    }

    #[test]
    fn duet_pair_deadlocks() {
        let config = Config::new(Dialect::Duet);
        let program = parse("snd 1\nsnd 2\nsnd p\nrcv a\nrcv b\nrcv c\nrcv d\n", &config).unwrap();
        let pair = [0, 1].map(|id| {
            let mut machine = RegisterMachine::new(program.clone(), config);
            machine.preset('p', id).unwrap();
            machine
        });
        let mut ring = Ring::new(pair);
        let report = ring.run().unwrap();
        assert_eq!(report.outcome, Outcome::Deadlocked);
        assert_eq!(report.sent, [3, 3]);
        assert_eq!(report.last_outputs, [Some(0), Some(1)]);

        let [zero, one] = <[_; 2]>::try_from(ring.into_machines()).unwrap();
        assert_eq!(zero.register('c'), Some(1));
        assert_eq!(one.register('c'), Some(0));
    }

    #[test]
    fn empty_ring() {
        let mut ring: Ring<Interpreter> = Ring::new([]);
        assert_eq!(ring.run().unwrap().outcome, Outcome::Halted);
    }
}
