use std::io::{self, Write};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::LevelFilter;
use regvm::processor::{LabelPolicy, Processor};
use regvm::program::Program;
use simple_logger::SimpleLogger;

/// Loads a register machine program, runs it and dumps the registers
#[derive(Debug, Parser)]
#[command(name = "regvm")]
struct Options {
    /// Log every executed instruction
    #[arg(short, long)]
    verbose: bool,

    /// Skip jumps to undeclared labels instead of failing
    #[arg(long)]
    lenient: bool,

    /// Print the program listing and label table before running
    #[arg(long)]
    listing: bool,

    /// Program source file
    #[arg(default_value = "code.txt")]
    program: String,
}

impl Options {
    fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    fn label_policy(&self) -> LabelPolicy {
        if self.lenient {
            LabelPolicy::Lenient
        } else {
            LabelPolicy::Strict
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling

    let options = Options::parse();
    SimpleLogger::new().with_level(options.level()).init()?; // logging

    let program = Program::from_file(&options.program)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if options.listing {
        writeln!(out, "Program:")?;
        program.write_listing(&mut out)?;
        writeln!(out, "Labels:")?;
        program.write_labels(&mut out)?;
    }

    let mut cpu = Processor::with_label_policy(program, options.label_policy());
    cpu.run(&mut out)
        .wrap_err_with(|| format!("Execution of {} failed", options.program))?;

    writeln!(out, "Register Values:")?;
    cpu.write_registers(&mut out)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        let argv = std::iter::once("regvm").chain(args.iter().copied());
        Ok(Options::try_parse_from(argv)?)
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let options = parse(&[])?;

        assert_eq!(options.program, "code.txt");
        assert_eq!(options.level(), LevelFilter::Info);
        assert_eq!(options.label_policy(), LabelPolicy::Strict);
        assert!(!options.listing);

        Ok(())
    }

    #[test]
    fn test_flags() -> Result<()> {
        let options = parse(&["--lenient", "prog.asm", "-v", "--listing"])?;

        assert_eq!(options.program, "prog.asm");
        assert_eq!(options.level(), LevelFilter::Debug);
        assert_eq!(options.label_policy(), LabelPolicy::Lenient);
        assert!(options.listing);

        assert!(parse(&["--fast"]).is_err());
        assert!(parse(&["a.asm", "b.asm"]).is_err());

        Ok(())
    }
}
