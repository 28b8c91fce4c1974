// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 7 built using the `machines` library.

use itertools::Itertools;
use machines::intcode::parse_program;
use machines::prelude::*;
use machines::ring::Ring;

/// Run one amplifier per phase setting, wired in a loop, and return the last thruster signal
fn thruster_signal(template: &Interpreter, phases: &[i64]) -> i64 {
    let mut ring = Ring::new(phases.iter().map(|&phase| {
        let mut amp = template.clone();
        amp.push(phase);
        amp
    }));
    ring.machine_mut(0).expect("at least one amplifier").push(0);
    let report = ring.run().unwrap();
    report.last_outputs[phases.len() - 1].expect("last amplifier produced no signal")
}

fn best(template: &Interpreter, phases: [i64; 5]) -> i64 {
    phases
        .into_iter()
        .permutations(5)
        .map(|order| thruster_signal(template, &order))
        .max()
        .expect("permutations exist")
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let template = Interpreter::new(parse_program(&input).unwrap());
    println!("part 1: {}", best(&template, [0, 1, 2, 3, 4]));
    println!("part 2: {}", best(&template, [5, 6, 7, 8, 9]));
}
