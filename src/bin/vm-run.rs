// SPDX-FileCopyrightText: 2025 - 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Run a program on any of the machines, using stdin and stdout for I/O

use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use log::info;
use machines::intcode::parse_program;
use machines::prelude::*;
use machines::regvm::{self, OnInvalid};
use machines::InterpreterError;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Display};
use std::fs::read_to_string;
use std::io::{self, Write, stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(PartialEq, Clone, Copy, ValueEnum)]
enum Language {
    /// comma-separated IntCode
    #[value(alias("aoc"))]
    Intcode,
    /// 2016's assembunny
    #[value(alias("bunny"))]
    Assembunny,
    /// 2017's sound card language
    Duet,
    /// 2018's wrist device language
    #[value(alias("elfcode"))]
    Wrist,
}

impl Language {
    fn dialect(self) -> Option<Dialect> {
        match self {
            Language::Intcode => None,
            Language::Assembunny => Some(Dialect::Assembunny),
            Language::Duet => Some(Dialect::Duet),
            Language::Wrist => Some(Dialect::Wrist),
        }
    }
}

const VERSION: &str = concat!(env!("CARGO_CRATE_NAME"), '-', env!("CARGO_PKG_VERSION"));

const SOURCE_HELP: &str = "File containing the program\nuses stdin if set to '-'";
const ASCII_HELP: &str = "Interactive ASCII mode\nlines from stdin become input, and output \
                          values are printed as characters";

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = VERSION)]
#[command(about = "Virtual machine runner", long_about = None)]
struct Args {
    #[arg(help = SOURCE_HELP.split_at(27).0)]
    #[arg(long_help = SOURCE_HELP)]
    source: PathBuf,
    #[arg(help = "Language the program is written in")]
    #[arg(short, long)]
    #[arg(default_value = "intcode")]
    language: Language,
    #[arg(help = "Comma-separated values to queue as input")]
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<i64>,
    #[arg(help = ASCII_HELP.split_at(22).0)]
    #[arg(long_help = ASCII_HELP)]
    #[arg(short, long)]
    ascii: bool,
    #[arg(help = "Set a register before running, as NAME=VALUE")]
    #[arg(short = 's', long = "set", value_parser = parse_preset)]
    presets: Vec<(char, i64)>,
    #[arg(help = "Give up after this many steps")]
    #[arg(short, long)]
    max_steps: Option<usize>,
    #[arg(help = "Don't fold addition and multiplication loops")]
    #[arg(long)]
    no_fold: bool,
    #[arg(help = "Number of registers, overriding the language's default")]
    #[arg(short, long)]
    registers: Option<usize>,
    #[arg(help = "Fail on invalid instructions instead of skipping them")]
    #[arg(long)]
    strict: bool,
}

fn parse_preset(s: &str) -> Result<(char, i64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let Ok(name) = name.trim().parse::<char>() else {
        return Err(format!("register names are a single character, got {name:?}"));
    };
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value {value:?}: {e}"))?;
    Ok((name, value))
}

fn report_parse_err(err: &Rich<'_, char>, file: &str, source: &str) {
    use std::fmt::Write;

    let span = err.span().into_range();
    let mut builder = Report::build(ReportKind::Error, (file, span.clone()))
        .with_message(format!("Failed to parse {}", file.fg(Color::Red)));

    if let RichReason::Custom(msg) = err.reason() {
        builder = builder.with_label(
            Label::new((file, span))
                .with_message(msg)
                .with_color(Color::Yellow),
        );
    } else {
        if let Some(found) = err.found() {
            builder = builder.with_label(
                Label::new((file, span))
                    .with_message(format!(
                        "Found token \'{}\'",
                        found.escape_default().fg(Color::Cyan)
                    ))
                    .with_color(Color::Yellow),
            );
        }

        let mut expected: Vec<_> = err.expected().collect();
        // no need to explicitly mention whitespace
        expected.retain(|pat| !matches!(pat, RichPattern::Label(s) if *s == "inline whitespace"));
        expected.sort_unstable_by(|&a, &b| {
            use std::cmp::Ordering;
            match (a, b) {
                (RichPattern::SomethingElse, _) => Ordering::Greater,
                (_, RichPattern::SomethingElse) => Ordering::Less,
                (a, b) => a.cmp(b),
            }
        });

        match &expected[..] {
            &[] => (),
            &[pat] => {
                builder = builder.with_note(format!("Expected \"{}\"", pat.fg(Color::Blue)));
            }
            pats => {
                let mut note = String::from("Expected one of the following:\n");
                for pat in pats {
                    let _ = writeln!(&mut note, "- {}", pat.fg(Color::Blue));
                }
                builder = builder.with_note(note);
            }
        }
    }

    if let Err(e) = builder.finish().eprint((file, Source::from(source))) {
        eprintln!("failed to report parse error: {e}");
    }
}

macro_rules! to_ascii_char {
    ($e: expr) => {{
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "in macro to make it explicit"
        )]
        {
            $e as u8 as char
        }
    }};
}

fn get_line() -> Result<Option<Vec<i64>>, RunError> {
    let mut buf = String::new();
    if stdin().read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    match buf.chars().find(|c| !c.is_ascii()) {
        Some(bad_char) => Err(RunError::InvalidAsciiChar(bad_char)),
        None => Ok(Some(buf.bytes().map(i64::from).collect())),
    }
}

fn emit(value: i64, ascii: bool) -> io::Result<()> {
    let mut out = stdout().lock();
    match value {
        c @ 0..128 if ascii => {
            write!(out, "{}", to_ascii_char!(c))?;
            out.flush()
        }
        _ => writeln!(out, "{value}"),
    }
}

/// Drive `machine` to completion, feeding it stdin lines in ASCII mode
fn run(machine: &mut dyn Machine, args: &Args) -> Result<(), RunError> {
    let mut budget = args.max_steps;
    loop {
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(RunError::OutOfSteps(args.max_steps.unwrap_or_default()));
            }
            *remaining -= 1;
        }
        match machine.step()? {
            StepOutcome::Running => (),
            StepOutcome::Stopped(State::Output(value)) => {
                machine.pop();
                emit(value, args.ascii)?;
            }
            StepOutcome::Stopped(State::Awaiting) if args.ascii => match get_line()? {
                Some(line) => line.into_iter().for_each(|v| machine.push(v)),
                None => return Err(RunError::EndOfInput),
            },
            StepOutcome::Stopped(State::Awaiting) => return Err(RunError::EndOfInput),
            StepOutcome::Stopped(State::Halted) => return Ok(()),
        }
    }
}

enum Loaded {
    Intcode(Interpreter),
    Registers(RegisterMachine),
}

impl Loaded {
    fn machine(&mut self) -> &mut dyn Machine {
        match self {
            Loaded::Intcode(interp) => interp,
            Loaded::Registers(machine) => machine,
        }
    }
}

fn register_list(machine: &RegisterMachine) -> String {
    let numbered = machine.config().dialect == Dialect::Wrist;
    let name = |i: usize| match u8::try_from(i).ok().filter(|&i| i < 26) {
        Some(i) if !numbered => char::from(b'a' + i).to_string(),
        _ => i.to_string(),
    };
    machine
        .registers()
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{}={v}", name(i)))
        .join(" ")
}

/// Load the program, reporting parse errors as they're found. An `Err(None)` means the errors
/// were already reported.
fn load(args: &Args, file: &str, source: &str) -> Result<Loaded, Option<String>> {
    let Some(dialect) = args.language.dialect() else {
        if !args.presets.is_empty() {
            return Err(Some("IntCode has no registers to set".into()));
        }
        let code = parse_program(source).map_err(|e| Some(format!("invalid IntCode: {e}")))?;
        return Ok(Loaded::Intcode(Interpreter::new(code)));
    };

    let mut config = Config::new(dialect);
    if args.no_fold {
        config = config.with_loop_folding(false);
    }
    if let Some(registers) = args.registers {
        config = config.with_registers(registers);
    }
    if args.strict {
        config = config.with_on_invalid(OnInvalid::Fail);
    }

    let program = regvm::parse(source, &config).map_err(|errs| {
        errs.iter().for_each(|e| report_parse_err(e, file, source));
        None
    })?;
    let mut machine = RegisterMachine::new(program, config);
    for &(name, value) in &args.presets {
        machine.preset(name, value).map_err(|e| Some(e.to_string()))?;
    }
    Ok(Loaded::Registers(machine))
}

fn main() -> ExitCode {
    env_logger::builder()
        .format(|buf, record| writeln!(buf, "> {}", record.args()))
        .init();

    let args = Args::parse();
    let (file, source) = if args.source.as_os_str() == "-" {
        (Cow::Borrowed("stdin"), io::read_to_string(stdin()))
    } else {
        (args.source.to_string_lossy(), read_to_string(&args.source))
    };
    let source = match source {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to read {file}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut loaded = match load(&args, &file, &source) {
        Ok(loaded) => loaded,
        Err(msg) => {
            if let Some(msg) = msg {
                eprintln!("{msg}");
            }
            return ExitCode::FAILURE;
        }
    };
    let machine = loaded.machine();
    args.input.iter().for_each(|&v| machine.push(v));

    let result = run(machine, &args);
    info!("stopped with status {:?}", machine.status());
    if let Loaded::Registers(machine) = &loaded {
        eprintln!("registers: {}", register_list(machine));
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum RunError {
    Io(io::Error),
    InvalidAsciiChar(char),
    Interpreter(InterpreterError),
    EndOfInput,
    OutOfSteps(usize),
}

impl Error for RunError {}
impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Io(e) => write!(f, "an I/O error occured: {e}"),
            RunError::InvalidAsciiChar(c) => write!(f, "{c:?} is not a valid ASCII character"),
            RunError::Interpreter(e) => Display::fmt(e, f),
            RunError::EndOfInput => write!(f, "the program is waiting for more input"),
            RunError::OutOfSteps(n) => write!(f, "gave up after {n} steps"),
        }
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<InterpreterError> for RunError {
    fn from(e: InterpreterError) -> Self {
        Self::Interpreter(e)
    }
}
