use std::fmt;
use std::str::FromStr;

use crate::processor::ExecErrorKind;

pub type Word = i32; // native signed machine word

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 10;

/// A validated register reference, `R1` to `R10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    /// All registers in dump order
    pub fn all() -> impl Iterator<Item = Register> {
        (1..=REGISTER_COUNT as u8).map(Register)
    }

    /// Creates a register from its numeric suffix
    pub fn new(number: u8) -> Option<Self> {
        if (1..=REGISTER_COUNT as u8).contains(&number) {
            Some(Register(number))
        } else {
            None
        }
    }

    /// The numeric suffix of the register (1 based)
    pub fn number(self) -> u8 {
        self.0
    }

    /// Checks if `token` has the shape of a register name: `R` followed by
    /// one or more digits. Says nothing about whether the register exists.
    pub fn is_register_name(token: &str) -> bool {
        match token.strip_prefix('R') {
            Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }

    fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl FromStr for Register {
    type Err = ExecErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExecErrorKind::InvalidRegister {
            name: s.to_string(),
        };

        if !Self::is_register_name(s) {
            return Err(invalid());
        }

        // Overlong suffixes fail to parse and are out of range anyway.
        s[1..]
            .parse::<u8>()
            .ok()
            .and_then(Register::new)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Emulates the register file of the CPU
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterFile {
    /// General purpose registers, `R1` is at index 0
    data: [Word; REGISTER_COUNT],
    /// Result of the last comparison
    pub flag: Word,
}

impl RegisterFile {
    /// Reads a register
    pub fn read(&self, register: Register) -> Word {
        self.data[register.index()]
    }

    /// Writes a register
    pub fn write(&mut self, register: Register, value: Word) {
        self.data[register.index()] = value;
    }

    /// Reads a register by name
    pub fn get(&self, name: &str) -> Result<Word, ExecErrorKind> {
        Ok(self.read(name.parse()?))
    }

    /// Writes a register by name
    pub fn set(&mut self, name: &str, value: Word) -> Result<(), ExecErrorKind> {
        self.write(name.parse()?, value);
        Ok(())
    }

    /// Copies the value of register `other` into register `name`
    pub fn set_from(&mut self, name: &str, other: &str) -> Result<(), ExecErrorKind> {
        let dst: Register = name.parse()?;
        let value = self.get(other)?;
        self.write(dst, value);
        Ok(())
    }

    /// Iterates over all registers and their values
    pub fn iter(&self) -> impl Iterator<Item = (Register, Word)> + '_ {
        Register::all().map(move |register| (register, self.read(register)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_set_then_get() -> Result<()> {
        let mut regs = RegisterFile::default();

        for (n, value) in (1..=10).zip([0, 1, -1, 42, i32::MAX, i32::MIN, 7, -300, 99, 5]) {
            let name = format!("R{}", n);
            regs.set(&name, value)?;
            assert_eq!(regs.get(&name)?, value);
        }

        Ok(())
    }

    #[test]
    fn test_registers_start_zeroed() -> Result<()> {
        let regs = RegisterFile::default();

        assert!(regs.iter().all(|(_, value)| value == 0));
        assert_eq!(regs.flag, 0);
        assert_eq!(regs.iter().count(), REGISTER_COUNT);

        Ok(())
    }

    #[test]
    fn test_out_of_range_register() -> Result<()> {
        let mut regs = RegisterFile::default();

        let expected = ExecErrorKind::InvalidRegister {
            name: "R11".to_string(),
        };
        assert_eq!(regs.get("R11"), Err(expected.clone()));
        assert_eq!(regs.set("R11", 3), Err(expected));
        assert!(regs.get("R0").is_err());
        assert!(regs.get("R999999999999").is_err());
        assert_eq!(regs, RegisterFile::default());

        Ok(())
    }

    #[test]
    fn test_register_name_shape() -> Result<()> {
        assert!(Register::is_register_name("R1"));
        assert!(Register::is_register_name("R11"));
        assert!(!Register::is_register_name("R"));
        assert!(!Register::is_register_name("r1"));
        assert!(!Register::is_register_name("R1a"));
        assert!(!Register::is_register_name("-5"));

        assert_eq!("R01".parse::<Register>()?, Register::new(1).unwrap());
        assert_eq!("R10".parse::<Register>()?.to_string(), "R10");
        assert_eq!("R007".parse::<Register>()?.number(), 7);

        Ok(())
    }

    #[test]
    fn test_set_from() -> Result<()> {
        let mut regs = RegisterFile::default();
        regs.set("R2", 17)?;
        regs.set_from("R1", "R2")?;
        assert_eq!(regs.get("R1")?, 17);

        // source is validated as well, destination stays untouched
        assert!(regs.set_from("R1", "R12").is_err());
        assert_eq!(regs.get("R1")?, 17);

        Ok(())
    }
}
