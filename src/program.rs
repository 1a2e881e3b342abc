use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{Result, WrapErr};

use crate::processor::Opcode;

pub mod parse;

use parse::{LoadError, Parser};

/// A decoded instruction. Operands are kept as written; their meaning
/// (register, constant or label) depends on the opcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<String>,
}

impl Instruction {
    pub(crate) fn new(opcode: Opcode, operands: Vec<String>) -> Self {
        Self { opcode, operands }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    /// Operand at `index`, empty if the opcode takes fewer operands
    pub fn operand(&self, index: usize) -> &str {
        self.operands.get(index).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

/// A loaded program: the instructions in address order and the label table
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Label name to the address of the instruction following it
    labels: HashMap<String, usize>,
}

impl Program {
    pub(crate) fn new(instructions: Vec<Instruction>, labels: HashMap<String, usize>) -> Self {
        Self {
            instructions,
            labels,
        }
    }

    /// Reads and parses a program from a source file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to open file: {}", path.display()))?;

        let program = source
            .parse::<Program>()
            .wrap_err_with(|| format!("Invalid program in file: {}", path.display()))?;

        Ok(program)
    }

    /// Instruction at `address`, `None` past the end of the program
    pub fn fetch(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Resolves a label to its address
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// All labels, ordered by address and then by name
    pub fn labels(&self) -> Vec<(&str, usize)> {
        let mut labels: Vec<_> = self
            .labels
            .iter()
            .map(|(name, address)| (name.as_str(), *address))
            .collect();
        labels.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        labels
    }

    /// Writes one `Address N: [0xCC] INSTRUCTION` line per instruction
    pub fn write_listing<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (address, instruction) in self.instructions.iter().enumerate() {
            writeln!(
                out,
                "Address {}: [0x{:02X}] {}",
                address,
                u8::from(instruction.opcode),
                instruction
            )?;
        }
        Ok(())
    }

    /// Writes one `name : address` line per label
    pub fn write_labels<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, address) in self.labels() {
            writeln!(out, "{} : {}", name, address)?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse().map_err(LoadError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    const COUNTDOWN: &str = r#"
        # count R1 down to zero
        MOV R1, 3
        :loop
        DEC R1
        CMP R1, 0
        JG loop
        :end
    "#;

    #[test]
    fn test_addresses_skip_labels() -> Result<()> {
        let program: Program = COUNTDOWN.parse()?;

        assert_eq!(program.len(), 4);
        assert_eq!(program.label("loop"), Some(1));
        assert_eq!(program.label("end"), Some(4));
        assert_eq!(program.label("missing"), None);
        assert_eq!(program.fetch(1).map(Instruction::opcode), Some(Opcode::DEC));
        assert_eq!(program.fetch(4), None);

        let opcodes: Vec<_> = program.instructions().iter().map(Instruction::opcode).collect();
        assert_eq!(opcodes, [Opcode::MOV, Opcode::DEC, Opcode::CMP, Opcode::JG]);

        Ok(())
    }

    #[test]
    fn test_listing() -> Result<()> {
        let program: Program = COUNTDOWN.parse()?;
        let mut out = Vec::<u8>::new();
        program.write_listing(&mut out)?;

        assert_eq!(
            String::from_utf8(out)?,
            "Address 0: [0x10] MOV R1, 3\n\
             Address 1: [0x31] DEC R1\n\
             Address 2: [0x38] CMP R1, 0\n\
             Address 3: [0x42] JG loop\n"
        );

        Ok(())
    }

    #[test]
    fn test_label_dump_is_sorted() -> Result<()> {
        let program: Program = ":b\n:a\nNOP\n:c\nNOP".parse()?;
        let mut out = Vec::<u8>::new();
        program.write_labels(&mut out)?;

        assert_eq!(String::from_utf8(out)?, "a : 0\nb : 0\nc : 1\n");

        Ok(())
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let path = std::env::temp_dir().join("regvm_program_from_file.asm");
        fs::write(&path, COUNTDOWN)?;

        let program = Program::from_file(&path)?;
        fs::remove_file(&path)?;

        assert_eq!(program, COUNTDOWN.parse::<Program>()?);

        Ok(())
    }

    #[test]
    fn test_from_missing_file() -> Result<()> {
        let err = Program::from_file("does/not/exist.asm").unwrap_err();

        assert!(err.to_string().contains("does/not/exist.asm"));

        Ok(())
    }
}
