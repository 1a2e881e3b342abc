//! MOV R1, 3
//! :loop
//!     DEC R1
//!     CMP R1, 0
//!     JG loop

use std::borrow::Cow;
use std::collections::HashMap;
use std::error;
use std::{fmt, str::Lines};

use crate::processor::Opcode;

use super::{Instruction, Program};

macro_rules! propagate {
    ( $res:expr ) => {
        match $res {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        }
    };
}

const COMMENT_PREFIX: char = '#';
const LABEL_PREFIX: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    MalformedInstruction { expected: usize, found: usize },
    UnknownOpcode { mnemonic: String },
    DuplicateLabel { label: String, address: usize },
    InvalidLabel,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::MalformedInstruction { expected, found } => write!(
                f,
                "expected {} operand(s) but found {}",
                expected, found
            ),
            ParseErrorKind::UnknownOpcode { mnemonic } => {
                write!(f, "unknown instruction `{}`", mnemonic)
            }
            ParseErrorKind::DuplicateLabel { label, address } => write!(
                f,
                "label `{}` already declared for address {}",
                label, address
            ),
            ParseErrorKind::InvalidLabel => f.write_str("invalid label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// 1 based line number of the offending line
    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for ParseError {}

/// Every error found while loading a program. Nothing of a program that
/// failed to load is ever executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    errors: Vec<ParseError>,
}

impl LoadError {
    pub(crate) fn new(errors: Vec<ParseError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load program ({} error(s))", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n  {}", err)?;
        }
        Ok(())
    }
}

impl error::Error for LoadError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for `data`.
    pub fn new(data: &'a str) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            instructions: Vec::new(),
            labels: HashMap::new(),
        }
    }

    /// Consumes `self` and tries to parse all lines into a [`Program`].
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Program, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(Program::new(self.instructions, self.labels))
        } else {
            Err(errors)
        }
    }

    /// The address the next instruction will be stored at.
    fn address(&self) -> usize {
        self.instructions.len()
    }

    /// Tries to parse the next line. Each instruction or label should be
    /// located on it's own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            // Comment or empty line; skip
            Some(Ok(()))
        } else if line.starts_with(LABEL_PREFIX) {
            // Line is a label.
            self.parse_label(line)
        } else {
            // Line is an instruction.
            self.parse_instruction(line)
        }
    }

    /// Tries to parse line as a label. The `line` should be the whole line
    /// without any modifications.
    ///
    /// # Examples
    ///
    /// - `:loop`
    /// - `:end`
    fn parse_label(&mut self, line: &str) -> Option<Result<()>> {
        // The name must follow the prefix directly.
        let label = &line[LABEL_PREFIX.len_utf8()..];

        if label.is_empty()
            || label
                .chars()
                .any(|c| c.is_whitespace() || c == ',' || c == LABEL_PREFIX)
        {
            return Some(Err(ParseError::new(
                ParseErrorKind::InvalidLabel,
                format!("`{}`", line),
                self.line_nr,
            )));
        }

        if let Some(&address) = self.labels.get(label) {
            return Some(Err(ParseError::new(
                ParseErrorKind::DuplicateLabel {
                    label: label.to_string(),
                    address,
                },
                format!("`{}`", line),
                self.line_nr,
            )));
        }

        log::debug!(
            "[{}] Found label `{}` at address {}",
            self.line_nr,
            label,
            self.address()
        );

        self.labels.insert(label.to_string(), self.address());

        Some(Ok(()))
    }

    /// Tries to parse line as an instruction. Operands may be separated by
    /// commas, whitespace or both.
    ///
    /// # Examples
    ///
    /// - `ADD R1, 5`
    /// - `MOV R2 R1`
    /// - `JMP loop`
    fn parse_instruction(&mut self, line: &str) -> Option<Result<()>> {
        let mut tokens = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());

        // The line is trimmed and not empty, but may consist of commas only.
        let mnemonic = propagate!(tokens.next().ok_or_else(|| ParseError::new(
            ParseErrorKind::MalformedInstruction {
                expected: 0,
                found: 0
            },
            format!("`{}` has no instruction", line),
            self.line_nr
        )));

        let opcode = *propagate!(Opcode::ALL
            .iter()
            .find(|opcode| mnemonic == opcode.name())
            .ok_or_else(|| ParseError::new(
                ParseErrorKind::UnknownOpcode {
                    mnemonic: mnemonic.to_string()
                },
                format!("`{}`", line),
                self.line_nr
            )));

        let operands: Vec<String> = tokens.map(str::to_string).collect();

        if operands.len() != opcode.arity() {
            return Some(Err(ParseError::new(
                ParseErrorKind::MalformedInstruction {
                    expected: opcode.arity(),
                    found: operands.len(),
                },
                format!("`{}`", line),
                self.line_nr,
            )));
        }

        log::debug!(
            "[{}] Found instruction {} at address {}",
            self.line_nr,
            opcode,
            self.address()
        );

        self.instructions.push(Instruction::new(opcode, operands));

        Some(Ok(()))
    }
}
