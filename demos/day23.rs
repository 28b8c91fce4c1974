// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! A solution to Advent of Code 2016 Day 23 built using the `machines` library.
//!
//! Part 2 only finishes in reasonable time because the machine folds the multiplication loops.

use machines::prelude::*;
use machines::regvm::parse;

fn safe_value(template: &RegisterMachine, eggs: i64) -> i64 {
    let mut machine = template.clone();
    machine.preset('a', eggs).unwrap();
    assert_eq!(machine.run().unwrap(), State::Halted);
    log::info!("{eggs} eggs took {} steps", machine.steps());
    machine.register('a').expect("assembunny has an a register")
}

fn main() {
    use std::env::args_os;
    use std::fs::read_to_string;
    env_logger::init();
    let input =
        read_to_string(args_os().nth(1).expect("missing file name")).expect("failed to read file");

    let config = Config::new(Dialect::Assembunny);
    let program = parse(&input, &config).expect("invalid assembunny");
    let template = RegisterMachine::new(program, config);
    println!("part 1: {}", safe_value(&template, 7));
    println!("part 2: {}", safe_value(&template, 12));
}
