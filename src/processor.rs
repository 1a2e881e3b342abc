use std::error;
use std::fmt;
use std::io::Write;

use crate::alu::{self, BinaryOp, Condition, Flow, UnaryOp};
use crate::program::{Instruction, Program};
use crate::registers::{RegisterFile, Word};
use log::*;
use num_enum::IntoPrimitive;

/// What to do when a jump names a label the program never declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPolicy {
    /// Fail the run with [`ExecErrorKind::UnknownLabel`]
    Strict,
    /// Skip the jump and continue with the next instruction
    Lenient,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self::Strict
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecErrorKind {
    InvalidRegister { name: String },
    MalformedOperand { operand: String },
    DivisionByZero,
    UnknownLabel { label: String },
    Output { reason: String },
}

impl fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecErrorKind::InvalidRegister { name } => write!(f, "invalid register `{}`", name),
            ExecErrorKind::MalformedOperand { operand } => {
                write!(f, "operand `{}` is neither a register nor an integer", operand)
            }
            ExecErrorKind::DivisionByZero => f.write_str("division by zero"),
            ExecErrorKind::UnknownLabel { label } => write!(f, "unknown label `{}`", label),
            ExecErrorKind::Output { reason } => write!(f, "failed to write output: {}", reason),
        }
    }
}

impl error::Error for ExecErrorKind {}

/// A runtime failure, tied to the instruction that caused it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecError {
    kind: ExecErrorKind,
    address: usize,
    instruction: String,
}

impl ExecError {
    fn new(kind: ExecErrorKind, address: usize, instruction: &Instruction) -> Self {
        Self {
            kind,
            address,
            instruction: instruction.to_string(),
        }
    }

    pub fn kind(&self) -> &ExecErrorKind {
        &self.kind
    }

    /// Address of the offending instruction
    pub fn address(&self) -> usize {
        self.address
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error [addr: {}] `{}`: {}",
            self.address, self.instruction, self.kind
        )
    }
}

impl error::Error for ExecError {}

/// Emulates a CPU
#[derive(Debug, Clone)]
pub struct Processor {
    /// The loaded program, never modified during a run
    program: Program,
    /// Registers and comparison flag
    registers: RegisterFile,
    /// Instruction pointer. Anything outside the program means halted
    ip: usize,
    label_policy: LabelPolicy,
}

impl Processor {
    /// Initializes a new CPU with all registers zeroed and the instruction
    /// pointer at the first instruction
    pub fn new(program: Program) -> Self {
        Self::with_label_policy(program, LabelPolicy::default())
    }

    pub fn with_label_policy(program: Program, label_policy: LabelPolicy) -> Self {
        Self {
            program,
            registers: RegisterFile::default(),
            ip: 0,
            label_policy,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable access to the registers, e.g. to preload inputs before a run
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn flag(&self) -> Word {
        self.registers.flag
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.ip >= self.program.len()
    }

    /// Executes a single instruction and returns where execution continues
    fn execute_instruction<W: Write>(
        program: &Program,
        registers: &mut RegisterFile,
        label_policy: LabelPolicy,
        instruction: &Instruction,
        out: &mut W,
    ) -> Result<Flow, ExecErrorKind> {
        let a = instruction.operand(0);
        let b = instruction.operand(1);

        let jump = |condition: Condition, flag: Word| {
            alu::jump(condition, flag, a, program, label_policy)
        };

        let flow = match instruction.opcode() {
            Opcode::NOP => Flow::Next,
            Opcode::HLT => Flow::Halt,
            Opcode::PRINT => {
                alu::print(registers, a, out)?;
                Flow::Next
            }
            Opcode::MOV => {
                alu::mov(registers, a, b)?;
                Flow::Next
            }
            Opcode::ADD => {
                alu::binary(registers, BinaryOp::Add, a, b)?;
                Flow::Next
            }
            Opcode::SUB => {
                alu::binary(registers, BinaryOp::Sub, a, b)?;
                Flow::Next
            }
            Opcode::MUL => {
                alu::binary(registers, BinaryOp::Mul, a, b)?;
                Flow::Next
            }
            Opcode::DIV => {
                alu::binary(registers, BinaryOp::Div, a, b)?;
                Flow::Next
            }
            Opcode::AND => {
                alu::binary(registers, BinaryOp::And, a, b)?;
                Flow::Next
            }
            Opcode::OR => {
                alu::binary(registers, BinaryOp::Or, a, b)?;
                Flow::Next
            }
            Opcode::NOT => {
                alu::unary(registers, UnaryOp::Not, a)?;
                Flow::Next
            }
            Opcode::INC => {
                alu::unary(registers, UnaryOp::Inc, a)?;
                Flow::Next
            }
            Opcode::DEC => {
                alu::unary(registers, UnaryOp::Dec, a)?;
                Flow::Next
            }
            Opcode::CMP => {
                alu::cmp(registers, a, b)?;
                Flow::Next
            }
            Opcode::JMP => jump(Condition::Always, registers.flag)?,
            Opcode::JE => jump(Condition::Equal, registers.flag)?,
            Opcode::JG => jump(Condition::Greater, registers.flag)?,
            Opcode::JL => jump(Condition::Less, registers.flag)?,
            Opcode::JGE => jump(Condition::GreaterEqual, registers.flag)?,
            Opcode::JLE => jump(Condition::LessEqual, registers.flag)?,
        };

        Ok(flow)
    }

    /// Runs one execution step. Does nothing once the processor has halted.
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<(), ExecError> {
        let ip = self.ip;
        let instruction = match self.program.fetch(ip) {
            Some(instruction) => instruction,
            None => return Ok(()),
        };

        let flow = Self::execute_instruction(
            &self.program,
            &mut self.registers,
            self.label_policy,
            instruction,
            out,
        )
        .map_err(|kind| ExecError::new(kind, ip, instruction))?;

        debug!("[{}] {} => {:?}", ip, instruction, flow);

        self.ip = match flow {
            Flow::Next => ip + 1,
            Flow::Jump(target) => target,
            Flow::Halt => self.program.len(),
        };

        Ok(())
    }

    /// Run program until the instruction pointer leaves the program
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<(), ExecError> {
        while !self.is_halted() {
            self.step(out)?;
        }

        info!(
            "Program terminated at address {}. Flag: {}",
            self.ip, self.registers.flag
        );

        Ok(())
    }

    /// Writes every register as `name : value`, followed by the flag
    pub fn write_registers<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for (register, value) in self.registers.iter() {
            writeln!(out, "{} : {}", register, value)?;
        }
        writeln!(out, "FLAG : {}", self.registers.flag)
    }
}

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident / $arity:literal = $repr:literal , )+ ) => {
        /// Defines the instruction set. Every opcode works on the register
        /// file, the comparison flag or the instruction pointer.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Number of operands the opcode takes
            pub fn arity(&self) -> usize {
                match self {
                    $( Self::$name => $arity , )+
                }
            }
        }

        impl ::std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

opcodes! {
    /// No operation
    NOP / 0 = 0x00,
    /// Stop the execution of the program
    HLT / 0 = 0x01,
    /// Writes `name : value` of a register to the output
    PRINT / 1 = 0x05,
    /// Copy a register or constant into a register
    /// @param dst Destination register
    /// @param src Register or constant
    MOV / 2 = 0x10,
    /// Add to a register
    ADD / 2 = 0x20,
    /// Subtract from a register
    SUB / 2 = 0x21,
    /// Multiply a register
    MUL / 2 = 0x22,
    /// Divide a register, truncating towards zero
    DIV / 2 = 0x23,
    /// Bitwise and
    AND / 2 = 0x28,
    /// Bitwise or
    OR / 2 = 0x29,
    /// Bitwise complement of a register
    NOT / 1 = 0x2A,
    /// Increment a register
    INC / 1 = 0x30,
    /// Decrement a register
    DEC / 1 = 0x31,
    /// Set the flag to the difference of both operands
    CMP / 2 = 0x38,
    /// Jump to a label
    /// @param label The label to jump to
    JMP / 1 = 0x40,
    /// Jump if the flag is zero
    JE / 1 = 0x41,
    /// Jump if the flag is positive
    JG / 1 = 0x42,
    /// Jump if the flag is negative
    JL / 1 = 0x43,
    /// Jump if the flag is zero or positive
    JGE / 1 = 0x44,
    /// Jump if the flag is zero or negative
    JLE / 1 = 0x45,
}
