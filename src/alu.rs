//! Semantics of every opcode.
//!
//! Each operation validates all of its operands before it writes anything,
//! so a failing instruction leaves the register file untouched.

use std::io::Write;

use crate::processor::{ExecErrorKind, LabelPolicy};
use crate::program::Program;
use crate::registers::{Register, RegisterFile, Word};

/// Where execution continues after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the following instruction
    Next,
    /// Continue at the given address
    Jump(usize),
    /// Stop the program
    Halt,
}

/// Predicate over the comparison flag guarding a jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Equal,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl Condition {
    pub fn holds(self, flag: Word) -> bool {
        match self {
            Condition::Always => true,
            Condition::Equal => flag == 0,
            Condition::Greater => flag > 0,
            Condition::Less => flag < 0,
            Condition::GreaterEqual => flag >= 0,
            Condition::LessEqual => flag <= 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
}

impl BinaryOp {
    /// Applies the operation with wrapping semantics
    pub fn apply(self, a: Word, b: Word) -> Result<Word, ExecErrorKind> {
        Ok(match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(ExecErrorKind::DivisionByZero);
                }
                a.wrapping_div(b)
            }
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Inc,
    Dec,
}

impl UnaryOp {
    pub fn apply(self, value: Word) -> Word {
        match self {
            UnaryOp::Not => !value,
            UnaryOp::Inc => value.wrapping_add(1),
            UnaryOp::Dec => value.wrapping_sub(1),
        }
    }
}

/// Resolves an operand to a value. Register shaped operands are read from
/// the register file, everything else must be a decimal literal.
pub fn value_of(registers: &RegisterFile, operand: &str) -> Result<Word, ExecErrorKind> {
    if Register::is_register_name(operand) {
        registers.get(operand)
    } else {
        operand
            .parse::<Word>()
            .map_err(|_| ExecErrorKind::MalformedOperand {
                operand: operand.to_string(),
            })
    }
}

/// `dst := src`
pub fn mov(registers: &mut RegisterFile, dst: &str, src: &str) -> Result<Word, ExecErrorKind> {
    if Register::is_register_name(src) {
        registers.set_from(dst, src)?;
        return registers.get(dst);
    }

    let dst: Register = dst.parse()?;
    let value = value_of(registers, src)?;
    registers.write(dst, value);

    Ok(value)
}

/// `dst := dst op src`
pub fn binary(
    registers: &mut RegisterFile,
    op: BinaryOp,
    dst: &str,
    src: &str,
) -> Result<Word, ExecErrorKind> {
    let dst: Register = dst.parse()?;
    let rhs = value_of(registers, src)?;
    let result = op.apply(registers.read(dst), rhs)?;
    registers.write(dst, result);

    Ok(result)
}

/// `dst := op dst`
pub fn unary(registers: &mut RegisterFile, op: UnaryOp, dst: &str) -> Result<Word, ExecErrorKind> {
    let dst: Register = dst.parse()?;
    let result = op.apply(registers.read(dst));
    registers.write(dst, result);

    Ok(result)
}

/// `flag := lhs - rhs`
pub fn cmp(registers: &mut RegisterFile, lhs: &str, rhs: &str) -> Result<Word, ExecErrorKind> {
    let a = value_of(registers, lhs)?;
    let b = value_of(registers, rhs)?;
    registers.flag = a.wrapping_sub(b);

    Ok(registers.flag)
}

/// Jumps to `label` if `condition` holds for `flag`.
///
/// The label is resolved before the condition is checked, so a misspelled
/// target fails (or warns, with [`LabelPolicy::Lenient`]) even when the
/// jump would not have been taken.
pub fn jump(
    condition: Condition,
    flag: Word,
    label: &str,
    program: &Program,
    policy: LabelPolicy,
) -> Result<Flow, ExecErrorKind> {
    let target = match (program.label(label), policy) {
        (Some(address), _) => address,
        (None, LabelPolicy::Strict) => {
            return Err(ExecErrorKind::UnknownLabel {
                label: label.to_string(),
            })
        }
        (None, LabelPolicy::Lenient) => {
            log::warn!("Label not found: {}", label);
            return Ok(Flow::Next);
        }
    };

    if condition.holds(flag) {
        Ok(Flow::Jump(target))
    } else {
        Ok(Flow::Next)
    }
}

/// Writes `name : value` of a register to `out`
pub fn print<W: Write>(
    registers: &RegisterFile,
    register: &str,
    out: &mut W,
) -> Result<Word, ExecErrorKind> {
    let register: Register = register.parse()?;
    let value = registers.read(register);

    writeln!(out, "{} : {}", register, value).map_err(|err| ExecErrorKind::Output {
        reason: err.to_string(),
    })?;

    Ok(value)
}
