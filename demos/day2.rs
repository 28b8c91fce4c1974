// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2019 Day 2 built using the `machines` library.

use machines::intcode::parse_program;
use machines::prelude::*;

fn run_with(base_interp: &Interpreter, noun: i64, verb: i64) -> i64 {
    let mut i = base_interp.clone();
    i[1] = noun;
    i[2] = verb;
    let (output, state) = i.run_through_inputs(empty()).unwrap();
    assert_eq!(state, State::Halted, "intcode did not run to completion");
    assert!(output.is_empty(), "intcode had unexpected output");
    i[0]
}

fn part2(base_interp: &Interpreter) -> i64 {
    for noun in 0..=99 {
        for verb in 0..=99 {
            #[allow(clippy::unreadable_literal, reason = "from Advent of Code")]
            if run_with(base_interp, noun, verb) == 19690720 {
                return 100 * noun + verb;
            }
        }
    }
    panic!("no answer found for part 2");
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let interpreter = Interpreter::new(parse_program(&input).unwrap());
    println!("part 1: {}", run_with(&interpreter, 12, 2));
    println!("part 2: {}", part2(&interpreter));
}
