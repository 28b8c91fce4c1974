// SPDX-FileCopyrightText: 2026 Eli Array Minkoff
//
// SPDX-License-Identifier: 0BSD

//! Source text for the register machine dialects
//!
//! One instruction per line: a mnemonic followed by space-separated operands. Blank lines are
//! ignored, as is anything following a `;`. Wrist programs may bind the instruction pointer to a
//! register with an `#ip N` line.

use super::instr::Slot;
use super::{Config, Dialect, Instr, Op, Operand, Program};
use chumsky::prelude::*;

macro_rules! padded {
    ($inner: expr) => {{ $inner.padded_by(text::inline_whitespace()) }};
}

type RichErr<'a> = chumsky::extra::Err<Rich<'a, char>>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Int(i64),
    Name(&'a str),
}

enum Line {
    IpBinding(usize),
    Instr(Instr),
}

fn int<'a>() -> impl Parser<'a, &'a str, i64, RichErr<'a>> + Clone {
    one_of("-+")
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<i64>()
                .map_err(|e| Rich::custom(span, format!("error parsing {s} as i64: {e}")))
        })
        .labelled("integer literal")
}

fn operand<'a>() -> impl Parser<'a, &'a str, (Token<'a>, SimpleSpan), RichErr<'a>> + Clone {
    choice((
        int().map(Token::Int),
        text::ascii::ident().map(Token::Name).labelled("register"),
    ))
    .map_with(|tok, e| (tok, e.span()))
    .labelled("operand")
}

fn register_named(config: Config, name: &str) -> Option<usize> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => config.dialect.register_number(c),
        _ => None,
    }
}

/// Check a token against what the operation expects in that position
fn resolve<'a>(
    config: Config,
    slot: Slot,
    (tok, span): (Token<'_>, SimpleSpan),
) -> Result<Operand, Rich<'a, char>> {
    match (slot, tok) {
        (Slot::Value | Slot::Target, Token::Name(name)) => register_named(config, name)
            .map(Operand::Reg)
            .ok_or_else(|| Rich::custom(span, format!("unknown register {name:?}"))),
        (Slot::Value | Slot::Imm, Token::Int(n)) => Ok(Operand::Imm(n)),
        (Slot::Target, Token::Int(n)) => Err(Rich::custom(
            span,
            format!("expected a register to write to, found literal {n}"),
        )),
        (Slot::Reg, Token::Int(n)) => usize::try_from(n)
            .ok()
            .filter(|&r| r < config.registers)
            .map(Operand::Reg)
            .ok_or_else(|| Rich::custom(span, format!("no register {n}"))),
        (Slot::Reg | Slot::Imm, Token::Name(name)) => Err(Rich::custom(
            span,
            format!("expected a number, found {name:?}"),
        )),
    }
}

fn instruction<'a>(config: Config) -> impl Parser<'a, &'a str, Instr, RichErr<'a>> {
    text::ascii::ident()
        .try_map(move |name: &'a str, span| {
            Op::from_mnemonic(config.dialect, name).ok_or_else(|| {
                Rich::custom(
                    span,
                    format!("{name:?} is not a {} instruction", config.dialect),
                )
            })
        })
        .labelled("mnemonic")
        .then(
            text::inline_whitespace()
                .at_least(1)
                .ignore_then(operand())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .try_map(move |(op, tokens), span| {
            let slots = op.slots();
            if tokens.len() != slots.len() {
                return Err(Rich::custom(
                    span,
                    format!(
                        "{op} takes {} operand(s), found {}",
                        slots.len(),
                        tokens.len()
                    ),
                ));
            }
            let args = slots
                .iter()
                .zip(tokens)
                .map(|(&slot, tok)| resolve(config, slot, tok))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Instr::new(op, &args))
        })
        .labelled("instruction")
}

fn ip_binding<'a>(config: Config) -> impl Parser<'a, &'a str, usize, RichErr<'a>> {
    just("#ip")
        .ignore_then(text::inline_whitespace().at_least(1))
        .ignore_then(text::int(10))
        .try_map(move |s: &str, span| {
            if config.dialect != Dialect::Wrist {
                return Err(Rich::custom(
                    span,
                    format!("#ip is not available in {}", config.dialect),
                ));
            }
            s.parse::<usize>()
                .ok()
                .filter(|&r| r < config.registers)
                .ok_or_else(|| Rich::custom(span, format!("no register {s} to bind")))
        })
        .labelled("#ip directive")
}

fn line<'a>(config: Config) -> impl Parser<'a, &'a str, Option<(Line, SimpleSpan)>, RichErr<'a>> {
    padded!(
        choice((
            ip_binding(config).map(Line::IpBinding),
            instruction(config).map(Line::Instr),
        ))
        .map_with(|line, e| (line, e.span()))
        .or_not()
    )
    .then_ignore(
        just(';')
            .then(none_of("\r\n").repeated())
            .labelled("comment")
            .or_not(),
    )
    .labelled("line")
}

fn grammar<'a>(config: Config) -> impl Parser<'a, &'a str, Program, RichErr<'a>> {
    line(config)
        .separated_by(text::newline().labelled("newline"))
        .collect::<Vec<_>>()
        .try_map(|lines, _| {
            let mut program = Program::default();
            for (line, span) in lines.into_iter().flatten() {
                match line {
                    Line::Instr(instr) => program.instrs.push(instr),
                    Line::IpBinding(_) if program.ip_register.is_some() => {
                        return Err(Rich::custom(span, "duplicate #ip directive"));
                    }
                    Line::IpBinding(r) => program.ip_register = Some(r),
                }
            }
            Ok(program)
        })
}

/// Parse `src` as a program in the dialect of `config`.
///
/// Register names and numbers are checked against `config`'s register count, and operands that
/// get written to must be registers.
///
/// ```
/// use machines::regvm::{parse, Config, Dialect};
/// let program = parse("#ip 0\nseti 5 0 1\n", &Config::new(Dialect::Wrist)).unwrap();
/// assert_eq!(program.ip_register(), Some(0));
/// assert!(parse("cpy 1 2", &Config::new(Dialect::Assembunny)).is_err());
/// ```
pub fn parse<'a>(src: &'a str, config: &Config) -> Result<Program, Vec<Rich<'a, char>>> {
    grammar(*config).parse(src).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Operand::{Imm, Reg};

    fn bunny() -> Config {
        Config::new(Dialect::Assembunny)
    }

    #[test]
    fn assembunny_lines() {
        let program = parse("cpy 41 a\n\n  inc a ; bump\njnz c -2\ntgl c\n", &bunny()).unwrap();
        assert_eq!(
            program.instrs(),
            [
                Instr::new(Op::Cpy, &[Imm(41), Reg(0)]),
                Instr::new(Op::Inc, &[Reg(0)]),
                Instr::new(Op::Jnz, &[Reg(2), Imm(-2)]),
                Instr::new(Op::Tgl, &[Reg(2)]),
            ]
        );
        assert_eq!(program.ip_register(), None);
    }

    #[test]
    fn empty_source() {
        assert_eq!(parse("", &bunny()).unwrap(), Program::default());
        assert_eq!(parse("\n\n", &bunny()).unwrap(), Program::default());
    }

    #[test]
    fn duet_registers() {
        let config = Config::new(Dialect::Duet);
        let program = parse("set p 17\nmod x +3\nrcv z\njgz 1 p\n", &config).unwrap();
        assert_eq!(program.instrs()[0], Instr::new(Op::Set, &[Reg(15), Imm(17)]));
        assert_eq!(program.instrs()[1], Instr::new(Op::Mod, &[Reg(23), Imm(3)]));
        assert_eq!(program.instrs()[3], Instr::new(Op::Jgz, &[Imm(1), Reg(15)]));

        // assembunny programs may use letters past d
        let program = parse("cpy 5 x\nout x\n", &bunny()).unwrap();
        assert_eq!(program.instrs()[0], Instr::new(Op::Cpy, &[Imm(5), Reg(23)]));
        assert!(parse("inc A", &bunny()).is_err());
    }

    #[test]
    fn wrist_operands() {
        let config = Config::new(Dialect::Wrist);
        let program = parse("#ip 3\naddi 3 16 3\ngtir 7 1 5\n", &config).unwrap();
        assert_eq!(program.ip_register(), Some(3));
        assert_eq!(
            program.instrs(),
            [
                Instr::new(Op::Addi, &[Reg(3), Imm(16), Reg(3)]),
                Instr::new(Op::Gtir, &[Imm(7), Reg(1), Reg(5)]),
            ]
        );
        assert!(parse("addr 1 2 6", &config).is_err());
        assert!(parse("addr a b c", &config).is_err());
    }

    #[test]
    fn rejects() {
        macro_rules! rejects {
            ($config: expr, $($src: literal),+) => {
                $(assert!(parse($src, &$config).is_err(), "accepted {:?}", $src);)+
            };
        }
        rejects!(bunny(), "mul a b", "inc", "cpy a", "cpy 1 2 3", "inc 4", "cpy a 4", "inc ab");
        rejects!(Config::new(Dialect::Duet), "rcv 1", "tgl a", "#ip 1");
        rejects!(Config::new(Dialect::Wrist), "#ip 0\n#ip 1", "#ip 6", "seti 1 2");
    }
}
